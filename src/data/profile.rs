use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::{FeatureColumn, GridTable, SegmentMode};

// ---------------------------------------------------------------------------
// Segment profile: per-segment feature means
// ---------------------------------------------------------------------------

/// Mean feature values for one segment, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    pub segment: String,
    /// Number of grids in the segment.
    pub grids: usize,
    pub building_density: f64,
    pub yellow_building_density: f64,
    pub total_road_density: f64,
    pub empty: f64,
    pub waterbody: f64,
}

impl ProfileRow {
    pub fn mean(&self, feature: FeatureColumn) -> f64 {
        match feature {
            FeatureColumn::BuildingDensity => self.building_density,
            FeatureColumn::YellowBuildingDensity => self.yellow_building_density,
            FeatureColumn::TotalRoadDensity => self.total_road_density,
            FeatureColumn::Empty => self.empty,
            FeatureColumn::Waterbody => self.waterbody,
        }
    }
}

/// The grouped summary, one row per segment present, ordered by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentProfile {
    /// Column the rows were grouped by.
    pub column: String,
    pub rows: Vec<ProfileRow>,
}

impl SegmentProfile {
    pub fn get(&self, segment: &str) -> Option<&ProfileRow> {
        self.rows.iter().find(|r| r.segment == segment)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the profile as CSV, one record per segment.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
        for row in &self.rows {
            writer.serialize(row).context("writing profile row")?;
        }
        writer.flush().context("flushing CSV file")?;
        Ok(())
    }

    /// Write the profile as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).context("creating JSON file")?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)
            .context("writing profile JSON")?;
        Ok(())
    }
}

/// Save `profile` to `path`, choosing JSON for `.json` and CSV otherwise.
pub fn export_profile(profile: &SegmentProfile, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let written = if is_json {
        profile.write_json(path)
    } else {
        profile.write_csv(path)
    };
    written.with_context(|| format!("exporting segment profile to {}", path.display()))
}

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct Accumulator {
    grids: usize,
    sums: [f64; 5],
    counts: [usize; 5],
}

impl Accumulator {
    /// NaN-skipping mean; NaN when the feature is missing on every row.
    fn mean(&self, k: usize) -> f64 {
        if self.counts[k] == 0 {
            f64::NAN
        } else {
            round2(self.sums[k] / self.counts[k] as f64)
        }
    }
}

/// Group `table` by `mode`'s segment column and average the five features.
pub fn segment_profile(table: &GridTable, mode: SegmentMode) -> SegmentProfile {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for row in &table.rows {
        let acc = groups.entry(mode.segment_of(row)).or_default();
        acc.grids += 1;
        for (k, feature) in FeatureColumn::ALL.iter().enumerate() {
            let v = feature.value(row);
            if !v.is_nan() {
                acc.sums[k] += v;
                acc.counts[k] += 1;
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|(segment, acc)| ProfileRow {
            segment: segment.to_string(),
            grids: acc.grids,
            building_density: acc.mean(0),
            yellow_building_density: acc.mean(1),
            total_road_density: acc.mean(2),
            empty: acc.mean(3),
            waterbody: acc.mean(4),
        })
        .collect();

    SegmentProfile {
        column: mode.column().to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::data::filter::filter;
    use crate::data::model::tests::{row, scenario_table};

    #[test]
    fn test_scenario_profile() {
        let table = scenario_table();
        let allowed: BTreeSet<String> = ["A".to_string()].into();
        let filtered = filter(&table, SegmentMode::ScoreBased, &allowed, 0.0, 25.0);

        let profile = segment_profile(&filtered, SegmentMode::ScoreBased);
        assert_eq!(profile.column, "grid_segment");
        assert_eq!(profile.rows.len(), 1);
        assert_eq!(profile.rows[0].segment, "A");
        assert_eq!(profile.rows[0].grids, 1);
        assert_eq!(profile.rows[0].building_density, 0.50);
    }

    #[test]
    fn test_profile_means_match_group_rows() {
        let rows: Vec<_> = (0..12)
            .map(|i| {
                let seg = if i % 3 == 0 { "Low" } else { "High" };
                row(&i.to_string(), seg, i as f64, i as f64 * 0.07)
            })
            .collect();
        let table = scenario_table().derive(rows);
        let profile = segment_profile(&table, SegmentMode::ScoreBased);

        assert_eq!(
            profile.rows.iter().map(|r| r.segment.as_str()).collect::<Vec<_>>(),
            vec!["High", "Low"]
        );
        for pr in &profile.rows {
            let members: Vec<_> = table.rows.iter().filter(|r| r.grid_segment == pr.segment).collect();
            assert_eq!(pr.grids, members.len());
            for feature in FeatureColumn::ALL {
                let mean = members.iter().map(|r| feature.value(r)).sum::<f64>() / members.len() as f64;
                assert_eq!(pr.mean(feature), round2(mean), "{} / {}", pr.segment, feature.name());
            }
        }
    }

    #[test]
    fn test_profile_groups_by_selected_mode() {
        let profile = segment_profile(&scenario_table(), SegmentMode::KMeans);
        assert_eq!(profile.column, "grid_segment_kmeans");
        assert!(profile.get("Cluster A").is_some());
        assert!(profile.get("A").is_none());
        // (0.5 + 0.8) / 2 = 0.65
        assert_eq!(profile.get("Cluster A").unwrap().building_density, 0.65);
    }

    #[test]
    fn test_profile_skips_nan_features() {
        let mut a = row("1", "A", 1.0, f64::NAN);
        a.waterbody = f64::NAN;
        let mut b = row("2", "A", 2.0, 0.4);
        b.waterbody = f64::NAN;
        let table = scenario_table().derive(vec![a, b]);

        let profile = segment_profile(&table, SegmentMode::ScoreBased);
        let pr = profile.get("A").unwrap();
        assert_eq!(pr.building_density, 0.4);
        assert!(pr.waterbody.is_nan());
    }

    #[test]
    fn test_profile_empty_table() {
        let profile = segment_profile(&scenario_table().derive(Vec::new()), SegmentMode::ScoreBased);
        assert!(profile.is_empty());
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(0.5), 0.5);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }

    #[test]
    fn test_export_profile_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let profile = segment_profile(&scenario_table(), SegmentMode::ScoreBased);

        let csv_path = dir.path().join("profile.csv");
        export_profile(&profile, &csv_path).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("segment,grids,building_density,yellow_building_density,total_road_density,empty,waterbody")
        );
        assert_eq!(lines.next(), Some("A,2,0.65,0.1,0.2,0.3,0.0"));
        assert_eq!(lines.next(), Some("B,1,0.2,0.1,0.2,0.3,0.0"));

        let json_path = dir.path().join("profile.JSON");
        export_profile(&profile, &json_path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["column"], "grid_segment");
        assert_eq!(value["rows"][1]["segment"], "B");
    }
}
