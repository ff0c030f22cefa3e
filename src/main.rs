mod app;
mod color;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::GridScopeApp;
use clap::Parser;
use data::cache::DatasetCache;
use data::model::SegmentMode;
use eframe::egui;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "gridscope")]
#[command(author, version, about = "Interactive dashboard for precomputed grid quality scores")]
struct Args {
    /// Grid table to open (.csv or .parquet)
    #[arg(default_value = "data/delhi_grids_enriched.csv")]
    data: PathBuf,

    /// Initial segmentation: score-based or kmeans
    #[arg(long, default_value = "score-based")]
    mode: SegmentMode,

    /// Number of bins in the score histogram
    #[arg(long, default_value = "40", value_parser = clap::value_parser!(u16).range(1..))]
    bins: u16,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cache = DatasetCache::new();
    let dataset = cache.get_or_load(&args.data).inspect_err(|e| log::error!("{e}"))?;
    let state = AppState::new(cache, dataset, args.data, args.mode, args.bins as usize);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "GridScope – Hyperlocal Grid Quality",
        options,
        Box::new(|_cc| Ok(Box::new(GridScopeApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the dashboard window")
}
