use std::collections::BTreeMap;

use super::model::{GridTable, SegmentMode};

// ---------------------------------------------------------------------------
// Score histogram, split by segment
// ---------------------------------------------------------------------------

/// Equal-width score bins with one count series per segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreHistogram {
    /// Left edge of the first bin.
    pub start: f64,
    pub bin_width: f64,
    /// Segment label → count per bin; every series has the same length.
    pub counts: BTreeMap<String, Vec<usize>>,
}

impl ScoreHistogram {
    pub fn bins(&self) -> usize {
        self.counts.values().next().map_or(0, Vec::len)
    }

    /// Center of bin `i` on the score axis.
    pub fn bin_center(&self, i: usize) -> f64 {
        self.start + (i as f64 + 0.5) * self.bin_width
    }

    pub fn total(&self) -> usize {
        self.counts.values().flatten().sum()
    }
}

/// Bin every row's `grid_score` into `bins` equal-width bins spanning the
/// table's score range.  The maximum lands in the last bin; a constant score
/// gets a single bin of width 1 centered on it.
pub fn score_histogram(table: &GridTable, mode: SegmentMode, bins: usize) -> ScoreHistogram {
    let Some((lo, hi)) = table.rows.iter().map(|r| r.grid_score).fold(None, |acc, s| match acc {
        None => Some((s, s)),
        Some((lo, hi)) => Some((f64::min(lo, s), f64::max(hi, s))),
    }) else {
        return ScoreHistogram::default();
    };

    let (start, bin_width, bins) = if hi > lo {
        let bins = bins.max(1);
        (lo, (hi - lo) / bins as f64, bins)
    } else {
        (lo - 0.5, 1.0, 1)
    };

    let mut counts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for row in &table.rows {
        let idx = (((row.grid_score - start) / bin_width).floor() as usize).min(bins - 1);
        counts
            .entry(mode.segment_of(row).to_string())
            .or_insert_with(|| vec![0; bins])[idx] += 1;
    }

    ScoreHistogram {
        start,
        bin_width,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{row, scenario_table};

    #[test]
    fn test_histogram_counts_every_row() {
        let rows = (0..50)
            .map(|i| row(&i.to_string(), if i % 2 == 0 { "Even" } else { "Odd" }, i as f64 * 0.37, 0.0))
            .collect();
        let table = scenario_table().derive(rows);

        let hist = score_histogram(&table, SegmentMode::ScoreBased, 40);
        assert_eq!(hist.bins(), 40);
        assert_eq!(hist.total(), 50);
        assert_eq!(hist.counts.len(), 2);
        assert!(hist.counts.values().all(|c| c.len() == 40));
    }

    #[test]
    fn test_histogram_edges() {
        let hist = score_histogram(&scenario_table(), SegmentMode::ScoreBased, 2);
        // Range 10..30 in two bins of width 10; 20 opens the second bin.
        assert_eq!(hist.start, 10.0);
        assert_eq!(hist.bin_width, 10.0);
        assert_eq!(hist.counts["A"], vec![1, 1]);
        assert_eq!(hist.counts["B"], vec![0, 1]);
        assert_eq!(hist.bin_center(0), 15.0);
    }

    #[test]
    fn test_histogram_constant_scores() {
        let table = scenario_table().derive(vec![row("1", "A", 4.0, 0.0), row("2", "B", 4.0, 0.0)]);
        let hist = score_histogram(&table, SegmentMode::ScoreBased, 40);
        assert_eq!(hist.bins(), 1);
        assert_eq!(hist.bin_center(0), 4.0);
        assert_eq!(hist.total(), 2);
    }

    #[test]
    fn test_histogram_empty_table() {
        let hist = score_histogram(&scenario_table().derive(Vec::new()), SegmentMode::KMeans, 40);
        assert_eq!(hist.bins(), 0);
        assert_eq!(hist.total(), 0);
    }
}
