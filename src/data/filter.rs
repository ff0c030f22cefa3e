use std::collections::BTreeSet;

use super::error::{GridError, Result};
use super::model::{GridRow, GridTable, SegmentMode};

// ---------------------------------------------------------------------------
// Filter predicate: selected segments plus an inclusive score window
// ---------------------------------------------------------------------------

/// The user's current filter selection for one segmentation mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub mode: SegmentMode,
    /// Segment labels to keep. Empty means nothing passes.
    pub segments: BTreeSet<String>,
    pub score_low: f64,
    pub score_high: f64,
}

impl FilterState {
    /// Everything selected: all segments of `mode` and the full score range.
    pub fn select_all(table: &GridTable, mode: SegmentMode) -> Result<Self> {
        let (score_low, score_high) = score_bounds(table)?;
        Ok(FilterState {
            mode,
            segments: available_segments(table, mode),
            score_low,
            score_high,
        })
    }

    /// Apply this selection to `table`.
    pub fn apply(&self, table: &GridTable) -> GridTable {
        filter(table, self.mode, &self.segments, self.score_low, self.score_high)
    }
}

/// Distinct segment labels present in `mode`'s column, sorted.
pub fn available_segments(table: &GridTable, mode: SegmentMode) -> BTreeSet<String> {
    table
        .rows
        .iter()
        .map(|row| mode.segment_of(row).to_string())
        .collect()
}

/// Minimum and maximum `grid_score` over the whole table.
pub fn score_bounds(table: &GridTable) -> Result<(f64, f64)> {
    let mut scores = table.rows.iter().map(|row| row.grid_score);
    let first = scores.next().ok_or(GridError::EmptyDataset)?;
    Ok(scores.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s))))
}

fn row_matches(
    row: &GridRow,
    mode: SegmentMode,
    allowed: &BTreeSet<String>,
    score_low: f64,
    score_high: f64,
) -> bool {
    allowed.contains(mode.segment_of(row))
        && score_low <= row.grid_score
        && row.grid_score <= score_high
}

/// Rows whose segment is in `allowed` and whose score lies in
/// `[score_low, score_high]`, in their original order.
///
/// An empty `allowed` set, or `score_low > score_high`, yields no rows.
pub fn filter(
    table: &GridTable,
    mode: SegmentMode,
    allowed: &BTreeSet<String>,
    score_low: f64,
    score_high: f64,
) -> GridTable {
    let rows = table
        .rows
        .iter()
        .filter(|row| row_matches(row, mode, allowed, score_low, score_high))
        .cloned()
        .collect();
    table.derive(rows)
}

/// The first row carrying `grid_id`, searched within `table` only.
pub fn lookup_grid<'a>(table: &'a GridTable, grid_id: &str) -> Result<&'a GridRow> {
    table
        .rows
        .iter()
        .find(|row| row.grid_id == grid_id)
        .ok_or_else(|| GridError::GridNotFound(grid_id.to_string()))
}
