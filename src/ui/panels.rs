use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};

use crate::data::model::SegmentMode;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – segmentation and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Segmentation");
    ui.separator();

    let mut mode = state.mode;
    for m in SegmentMode::ALL {
        ui.radio_value(&mut mode, m, m.label());
    }
    if mode != state.mode {
        state.set_mode(mode);
    }

    ui.add_space(8.0);
    ui.heading("Filters");
    ui.separator();

    let (Some(filters), Some((min, max))) = (state.filters.clone(), state.score_bounds) else {
        ui.label("Dataset has no rows.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Segment selection ----
            let header_text = format!(
                "Grid Segment  ({}/{})",
                filters.segments.len(),
                state.segments.len()
            );
            let mut toggled: Option<String> = None;
            let mut select_all = false;
            let mut select_none = false;

            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt(state.mode.column())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        select_all = ui.small_button("All").clicked();
                        select_none = ui.small_button("None").clicked();
                    });

                    for segment in &state.segments {
                        let mut checked = filters.segments.contains(segment);
                        let text = RichText::new(segment).color(state.color_map.color_for(segment));
                        if ui.checkbox(&mut checked, text).changed() {
                            toggled = Some(segment.clone());
                        }
                    }
                });

            if select_all {
                state.select_all_segments();
            } else if select_none {
                state.select_no_segments();
            } else if let Some(segment) = toggled {
                state.toggle_segment(&segment);
            }

            ui.separator();

            // ---- Score window ----
            ui.strong("Grid Score Range");
            let mut low = filters.score_low;
            let mut high = filters.score_high;
            let low_changed = ui.add(Slider::new(&mut low, min..=max).text("min")).changed();
            let high_changed = ui.add(Slider::new(&mut high, min..=max).text("max")).changed();
            if low_changed || high_changed {
                state.set_score_range(low, high);
            }
            if ui.small_button("Reset range").clicked() {
                state.set_score_range(min, max);
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(!state.profile.is_empty(), egui::Button::new("Export profile…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let name = state
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ui.label(format!(
            "{name}: {} grids loaded, {} visible",
            state.dataset.len(),
            state.filtered.len()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open grid data")
        .add_filter("Supported files", &["csv", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export segment profile")
        .set_file_name("segment_profile.csv")
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        state.export_profile_to(&path);
    }
}
