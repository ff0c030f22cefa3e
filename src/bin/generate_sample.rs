use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Lattice size; the sample holds `SIDE * SIDE` grids.
const SIDE: usize = 24;
const ORIGIN: (f64, f64) = (28.50, 77.05);
const CELL_DEG: f64 = 0.01;

/// Fixed feature-space centroids used to label the clustering segment.
const CENTROIDS: [[f64; 5]; 4] = [
    [0.70, 0.30, 0.55, 0.05, 0.00],
    [0.40, 0.10, 0.35, 0.25, 0.02],
    [0.15, 0.02, 0.15, 0.65, 0.03],
    [0.05, 0.00, 0.05, 0.30, 0.55],
];

#[derive(Debug, Serialize)]
struct SampleGrid {
    grid_id: i64,
    lat: f64,
    lon: f64,
    building_density: f64,
    yellow_building_density: f64,
    total_road_density: f64,
    empty: f64,
    waterbody: f64,
    grid_score: f64,
    grid_segment: String,
    grid_segment_kmeans: String,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn nearest_centroid(features: &[f64; 5]) -> usize {
    let dist = |c: &[f64; 5]| -> f64 { c.iter().zip(features).map(|(a, b)| (a - b).powi(2)).sum() };
    (0..CENTROIDS.len())
        .min_by(|&a, &b| dist(&CENTROIDS[a]).total_cmp(&dist(&CENTROIDS[b])))
        .unwrap_or(0)
}

fn generate(rng: &mut SimpleRng) -> Vec<SampleGrid> {
    let center = (SIDE as f64 - 1.0) / 2.0;
    let mut grids = Vec::with_capacity(SIDE * SIDE);

    for r in 0..SIDE {
        for c in 0..SIDE {
            // Density falls off away from the lattice centre; a river runs along one column band.
            let dist = (((r as f64 - center).powi(2) + (c as f64 - center).powi(2)).sqrt() / center).min(1.0);
            let urban = (1.0 - dist).max(0.0);
            let river = if c.abs_diff(SIDE / 3) <= 1 { 0.6 } else { 0.0 };

            let clamp = |v: f64| v.clamp(0.0, 1.0);
            let building = clamp(rng.gauss(0.75 * urban, 0.08));
            let yellow = clamp(rng.gauss(0.3 * urban * urban, 0.04));
            let road = clamp(rng.gauss(0.15 + 0.45 * urban, 0.06));
            let water = clamp(rng.gauss(river, 0.05));
            let empty = clamp(1.0 - building - water + rng.gauss(0.0, 0.05));

            let features = [building, yellow, road, empty, water];
            let score = 100.0 * (0.45 * building + 0.15 * yellow + 0.35 * road - 0.25 * empty - 0.2 * water)
                + rng.gauss(0.0, 2.0);

            grids.push(SampleGrid {
                grid_id: (r * SIDE + c) as i64 + 1,
                lat: round4(ORIGIN.0 + r as f64 * CELL_DEG),
                lon: round4(ORIGIN.1 + c as f64 * CELL_DEG),
                building_density: round4(building),
                yellow_building_density: round4(yellow),
                total_road_density: round4(road),
                empty: round4(empty),
                waterbody: round4(water),
                grid_score: round4(score),
                grid_segment: String::new(),
                grid_segment_kmeans: format!("Cluster {}", nearest_centroid(&features)),
            });
        }
    }

    // Business segments: score tertiles.
    let mut scores: Vec<f64> = grids.iter().map(|g| g.grid_score).collect();
    scores.sort_by(f64::total_cmp);
    let low_cut = scores[scores.len() / 3];
    let high_cut = scores[2 * scores.len() / 3];
    for g in &mut grids {
        g.grid_segment = if g.grid_score >= high_cut {
            "High Potential"
        } else if g.grid_score >= low_cut {
            "Medium Potential"
        } else {
            "Low Potential"
        }
        .to_string();
    }

    grids
}

fn write_csv(grids: &[SampleGrid], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for g in grids {
        writer.serialize(g).context("writing grid row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(grids: &[SampleGrid], path: &Path) -> Result<()> {
    let float_col = |f: fn(&SampleGrid) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(grids.iter().map(f).collect::<Vec<_>>()))
    };
    let str_col = |f: fn(&SampleGrid) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(grids.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("grid_id", DataType::Int64, false),
        Field::new("lat", DataType::Float64, false),
        Field::new("lon", DataType::Float64, false),
        Field::new("building_density", DataType::Float64, false),
        Field::new("yellow_building_density", DataType::Float64, false),
        Field::new("total_road_density", DataType::Float64, false),
        Field::new("empty", DataType::Float64, false),
        Field::new("waterbody", DataType::Float64, false),
        Field::new("grid_score", DataType::Float64, false),
        Field::new("grid_segment", DataType::Utf8, false),
        Field::new("grid_segment_kmeans", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(grids.iter().map(|g| g.grid_id).collect::<Vec<_>>())) as ArrayRef,
            float_col(|g| g.lat),
            float_col(|g| g.lon),
            float_col(|g| g.building_density),
            float_col(|g| g.yellow_building_density),
            float_col(|g| g.total_road_density),
            float_col(|g| g.empty),
            float_col(|g| g.waterbody),
            float_col(|g| g.grid_score),
            str_col(|g| g.grid_segment.as_str()),
            str_col(|g| g.grid_segment_kmeans.as_str()),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let output_path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/sample_grids.csv"));

    if let Some(dir) = output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut rng = SimpleRng::new(42);
    let grids = generate(&mut rng);

    let is_parquet = output_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "parquet" | "pq"));
    if is_parquet {
        write_parquet(&grids, &output_path)?;
    } else {
        write_csv(&grids, &output_path)?;
    }

    println!("Wrote {} grids to {}", grids.len(), output_path.display());
    Ok(())
}
