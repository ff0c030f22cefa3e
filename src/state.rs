use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::data::cache::DatasetCache;
use crate::data::error::GridError;
use crate::data::filter::{FilterState, available_segments, lookup_grid};
use crate::data::histogram::{ScoreHistogram, score_histogram};
use crate::data::model::{GridRow, GridTable, SegmentMode};
use crate::data::profile::{SegmentProfile, export_profile, segment_profile};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Tables loaded so far, one per path.
    pub cache: DatasetCache,

    /// The active base table and where it came from.
    pub dataset: Arc<GridTable>,
    pub source: PathBuf,

    /// Active segmentation scheme and every label its column holds.
    pub mode: SegmentMode,
    pub segments: BTreeSet<String>,

    /// Current selection; `None` when the dataset has no rows.
    pub filters: Option<FilterState>,

    /// Score range of the whole dataset, bounds for the range sliders.
    pub score_bounds: Option<(f64, f64)>,

    /// Outputs recomputed after every interaction.
    pub filtered: GridTable,
    pub profile: SegmentProfile,
    pub histogram: ScoreHistogram,

    /// Grid shown in the detail view, always drawn from `filtered`.
    pub selected_grid: Option<String>,

    /// Segment colours for the active mode.
    pub color_map: ColorMap,

    pub histogram_bins: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Build the state around an already loaded table.
    pub fn new(
        cache: DatasetCache,
        dataset: Arc<GridTable>,
        source: PathBuf,
        mode: SegmentMode,
        histogram_bins: usize,
    ) -> Self {
        let mut state = Self {
            cache,
            dataset: Arc::new(GridTable::default()),
            source: PathBuf::new(),
            mode,
            segments: BTreeSet::new(),
            filters: None,
            score_bounds: None,
            filtered: GridTable::default(),
            profile: SegmentProfile::default(),
            histogram: ScoreHistogram::default(),
            selected_grid: None,
            color_map: ColorMap::new(&Default::default()),
            histogram_bins: histogram_bins.max(1),
            status_message: None,
        };
        state.set_dataset(dataset, source);
        state
    }

    /// Ingest a dataset, select everything and recompute.
    pub fn set_dataset(&mut self, dataset: Arc<GridTable>, source: PathBuf) {
        self.dataset = dataset;
        self.source = source;
        self.selected_grid = None;
        self.status_message = None;
        self.reset_filters();
    }

    /// Open another file through the cache.  On failure the current
    /// dataset stays active and the error is shown in the status line.
    pub fn open(&mut self, path: &Path) {
        match self.cache.get_or_load(path) {
            Ok(table) => {
                log::debug!("{} dataset(s) cached", self.cache.len());
                self.set_dataset(table, path.to_path_buf());
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Switch segmentation; the segment selection resets to every label of
    /// the new column while the score window is kept.
    pub fn set_mode(&mut self, mode: SegmentMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.segments = available_segments(&self.dataset, mode);
        self.color_map = ColorMap::new(&self.segments);
        if let Some(filters) = &mut self.filters {
            filters.mode = mode;
            filters.segments = self.segments.clone();
        }
        self.refilter();
    }

    fn reset_filters(&mut self) {
        self.segments = available_segments(&self.dataset, self.mode);
        self.color_map = ColorMap::new(&self.segments);
        match FilterState::select_all(&self.dataset, self.mode) {
            Ok(filters) => {
                self.score_bounds = Some((filters.score_low, filters.score_high));
                self.filters = Some(filters);
            }
            Err(e) => {
                log::warn!("{}: {e}", self.source.display());
                self.score_bounds = None;
                self.filters = None;
                self.status_message = Some(format!("{}: {e}", self.source.display()));
            }
        }
        self.refilter();
    }

    /// Recompute the filtered view, profile, histogram and selection.
    pub fn refilter(&mut self) {
        self.filtered = match &self.filters {
            Some(filters) => filters.apply(&self.dataset),
            None => self.dataset.derive(Vec::new()),
        };
        self.profile = segment_profile(&self.filtered, self.mode);
        self.histogram = score_histogram(&self.filtered, self.mode, self.histogram_bins);
        self.revalidate_selection();
        log::debug!(
            "Refiltered: {} of {} grids visible, {} segments",
            self.filtered.len(),
            self.dataset.len(),
            self.profile.rows.len()
        );
    }

    /// Keep the selection inside the filtered view, falling back to its
    /// first grid (or to no selection when the view is empty).
    fn revalidate_selection(&mut self) {
        if let Some(id) = &self.selected_grid {
            match lookup_grid(&self.filtered, id) {
                Ok(_) => return,
                Err(e @ GridError::GridNotFound(_)) => log::debug!("{e}; resetting selection"),
                Err(e) => log::warn!("{e}"),
            }
        }
        self.selected_grid = self.filtered.rows.first().map(|r| r.grid_id.clone());
    }

    /// The row shown in the detail view, if any.
    pub fn selected_row(&self) -> Option<&GridRow> {
        let id = self.selected_grid.as_deref()?;
        lookup_grid(&self.filtered, id).ok()
    }

    pub fn select_grid(&mut self, grid_id: &str) {
        match lookup_grid(&self.filtered, grid_id) {
            Ok(row) => self.selected_grid = Some(row.grid_id.clone()),
            Err(e) => {
                log::debug!("{e}");
                self.selected_grid = None;
            }
        }
    }

    /// Toggle a single segment label in the filter.
    pub fn toggle_segment(&mut self, segment: &str) {
        if let Some(filters) = &mut self.filters {
            if !filters.segments.remove(segment) {
                filters.segments.insert(segment.to_string());
            }
            self.refilter();
        }
    }

    /// Select every segment of the active mode.
    pub fn select_all_segments(&mut self) {
        if let Some(filters) = &mut self.filters {
            filters.segments = self.segments.clone();
            self.refilter();
        }
    }

    /// Deselect all segments.
    pub fn select_no_segments(&mut self) {
        if let Some(filters) = &mut self.filters {
            filters.segments.clear();
            self.refilter();
        }
    }

    /// Set the score window, clamped to the dataset bounds with `low <= high`.
    pub fn set_score_range(&mut self, low: f64, high: f64) {
        let (Some(filters), Some((min, max))) = (&mut self.filters, self.score_bounds) else {
            return;
        };
        let low = low.clamp(min, max);
        let high = high.clamp(min, max);
        filters.score_low = low.min(high);
        filters.score_high = high.max(low);
        self.refilter();
    }

    /// Save the current profile; the outcome goes to the status line.
    pub fn export_profile_to(&mut self, path: &Path) {
        match export_profile(&self.profile, path) {
            Ok(()) => {
                log::info!("Exported segment profile to {}", path.display());
                self.status_message = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                log::error!("{e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
