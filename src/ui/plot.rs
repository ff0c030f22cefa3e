use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, GridMark, Legend, Plot, Points};

use crate::data::model::{FeatureColumn, GridRow, select_segment_column};
use crate::state::AppState;

const HISTOGRAM_OPACITY: f32 = 0.7;
const SCATTER_OPACITY: f32 = 0.6;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the dashboard body: distribution, grid detail, sanity checks and
/// the segment profile table.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Hyperlocal Grid Quality Assessment");
    ui.label(RichText::new("Unsupervised spatial scoring using static map-derived features").weak());
    ui.separator();

    if state.filters.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("The dataset has no rows  (File → Open… another file)");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Grid Score Distribution");
            score_histogram(ui, state);
            ui.add_space(12.0);

            ui.strong("Grid-level Explainability");
            grid_detail(ui, state);
            ui.add_space(12.0);

            ui.strong("Validation & Sanity Checks");
            ui.columns(2, |cols: &mut [Ui]| {
                feature_scatter(&mut cols[0], state, FeatureColumn::BuildingDensity, "Grid Score vs Building Density");
                feature_scatter(&mut cols[1], state, FeatureColumn::Empty, "Grid Score vs Empty Area %");
            });
            ui.add_space(12.0);

            ui.strong("Segment Profiles");
            profile_table(ui, state);
        });
}

// ---------------------------------------------------------------------------
// Score histogram (stacked by segment)
// ---------------------------------------------------------------------------

fn score_histogram(ui: &mut Ui, state: &AppState) {
    let hist = &state.histogram;

    let mut charts: Vec<BarChart> = Vec::with_capacity(hist.counts.len());
    for (segment, counts) in &hist.counts {
        let bars: Vec<Bar> = counts
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(hist.bin_center(i), c as f64).width(hist.bin_width))
            .collect();
        let color = state.color_map.color_for(segment).gamma_multiply(HISTOGRAM_OPACITY);
        let below: Vec<&BarChart> = charts.iter().collect();
        let chart = BarChart::new(bars).name(segment).color(color).stack_on(&below);
        charts.push(chart);
    }

    Plot::new("score_histogram")
        .height(260.0)
        .legend(Legend::default())
        .x_axis_label("grid_score")
        .y_axis_label("count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Grid detail: selector, metrics and feature snapshot
// ---------------------------------------------------------------------------

fn grid_detail(ui: &mut Ui, state: &mut AppState) {
    let mut picked: Option<String> = None;
    let current = state.selected_grid.clone().unwrap_or_else(|| "–".to_string());

    egui::ComboBox::from_id_salt("grid_selector")
        .selected_text(current.as_str())
        .height(300.0)
        .show_ui(ui, |ui: &mut Ui| {
            for row in &state.filtered.rows {
                let selected = state.selected_grid.as_deref() == Some(row.grid_id.as_str());
                if ui.selectable_label(selected, row.grid_id.as_str()).clicked() {
                    picked = Some(row.grid_id.clone());
                }
            }
        });
    if let Some(id) = picked {
        state.select_grid(&id);
    }

    let Some(row) = state.selected_row() else {
        ui.label("No grid matches the current filters.");
        return;
    };

    let segment = state.mode.segment_of(row);
    let color = state.color_map.color_for(segment);
    let extra_columns: Vec<&str> = state.filtered.extra_columns().collect();

    ui.columns(2, |cols: &mut [Ui]| {
        egui::Grid::new("grid_metrics")
            .num_columns(2)
            .spacing([24.0, 8.0])
            .show(&mut cols[0], |ui: &mut Ui| {
                ui.label("Grid Score");
                ui.label(RichText::new(format!("{:.2}", row.grid_score)).heading());
                ui.end_row();
                ui.label("Segment");
                ui.label(RichText::new(segment).heading().color(color));
                ui.end_row();
                for name in extra_columns {
                    if let Some(value) = row.extra.get(name) {
                        ui.label(name);
                        ui.label(value.to_string());
                        ui.end_row();
                    }
                }
            });
        feature_snapshot(&mut cols[1], row, color);
    });
}

fn feature_snapshot(ui: &mut Ui, row: &GridRow, color: Color32) {
    let bars: Vec<Bar> = FeatureColumn::ALL
        .iter()
        .enumerate()
        .map(|(i, f)| Bar::new(i as f64, f.value(row)).name(f.name()).width(0.6))
        .collect();

    Plot::new("feature_snapshot")
        .height(200.0)
        .x_axis_label("value")
        .y_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| feature_label(mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().color(color).name("Feature Contribution Snapshot"));
        });
}

/// Axis label for the bar at `position`, blank between bars.
fn feature_label(position: f64) -> String {
    let i = position.round();
    if (position - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    FeatureColumn::ALL
        .get(i as usize)
        .map(|f| f.name().to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Scatter: score against one feature, one series per segment
// ---------------------------------------------------------------------------

fn feature_scatter(ui: &mut Ui, state: &AppState, feature: FeatureColumn, title: &str) {
    ui.label(title);
    Plot::new(("feature_scatter", feature.name()))
        .height(240.0)
        .legend(Legend::default())
        .x_axis_label(feature.name())
        .y_axis_label("grid_score")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for segment in &state.segments {
                let points: Vec<[f64; 2]> = state
                    .filtered
                    .rows
                    .iter()
                    .filter(|r| state.mode.segment_of(r) == segment)
                    .map(|r| [feature.value(r), r.grid_score])
                    .collect();
                if points.is_empty() {
                    continue;
                }
                let color = state.color_map.color_for(segment).gamma_multiply(SCATTER_OPACITY);
                plot_ui.points(Points::new(points).name(segment).color(color).radius(2.5));
            }
        });
}

// ---------------------------------------------------------------------------
// Segment profile table
// ---------------------------------------------------------------------------

fn profile_table(ui: &mut Ui, state: &AppState) {
    if state.profile.is_empty() {
        ui.label("No grids in the current selection.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(120.0))
        .column(Column::auto())
        .columns(Column::auto().at_least(90.0), FeatureColumn::ALL.len())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong(select_segment_column(state.mode));
            });
            header.col(|ui| {
                ui.strong("grids");
            });
            for feature in FeatureColumn::ALL {
                header.col(|ui| {
                    ui.strong(feature.name());
                });
            }
        })
        .body(|mut body| {
            for pr in &state.profile.rows {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(RichText::new(&pr.segment).color(state.color_map.color_for(&pr.segment)));
                    });
                    row.col(|ui| {
                        ui.label(pr.grids.to_string());
                    });
                    for feature in FeatureColumn::ALL {
                        row.col(|ui| {
                            ui.label(format!("{:.2}", pr.mean(feature)));
                        });
                    }
                });
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_label_on_bars_only() {
        assert_eq!(feature_label(0.0), "building_density");
        assert_eq!(feature_label(4.0), "waterbody");
        assert_eq!(feature_label(0.5), "");
        assert_eq!(feature_label(5.0), "");
        assert_eq!(feature_label(-1.0), "");
    }
}
