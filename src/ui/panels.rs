use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::{MAX_BINS, MIN_BINS};
use crate::data::filter::DurationRange;
use crate::data::model::NumericColumn;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(bounds) = state.bounds else {
        match &state.table {
            Some(table) => {
                ui.label(format!(
                    "{} holds no records ({} rows read, {} duplicates dropped).",
                    table.source.display(),
                    table.report.rows_read,
                    table.report.duplicates_dropped
                ));
            }
            None => {
                ui.label("No dataset loaded.");
            }
        }
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            duration_filter(ui, state, bounds);
            ui.separator();

            ui.strong("Histogram bins");
            let mut bins = state.selection.bins;
            ui.add(egui::Slider::new(&mut bins, MIN_BINS..=MAX_BINS));
            state.set_bins(bins);
            ui.separator();

            column_select(ui, state);
            ui.separator();

            dataset_info(ui, state);
        });
}

/// From/To sliders bound to the live min/max of `duration_minutes`.
fn duration_filter(ui: &mut Ui, state: &mut AppState, bounds: DurationRange) {
    ui.strong("Processing time (minutes)");

    let DurationRange { mut lo, mut hi } = state.selection.range;
    ui.add(egui::Slider::new(&mut lo, bounds.lo..=bounds.hi).text("from"));
    ui.add(egui::Slider::new(&mut hi, bounds.lo..=bounds.hi).text("to"));

    if lo > hi {
        ui.label(RichText::new("'from' is above 'to': nothing matches").color(Color32::YELLOW));
    }

    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("Full range").clicked() {
            lo = bounds.lo;
            hi = bounds.hi;
        }
        ui.label(format!("{}..={} available", bounds.lo, bounds.hi));
    });

    state.set_range(DurationRange::new(lo, hi));
}

/// Multi-select over the fixed candidate column list.
fn column_select(ui: &mut Ui, state: &mut AppState) {
    let n_selected = state.selection.columns.len();
    let header_text = format!("Columns  ({n_selected}/{})", NumericColumn::ALL.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("columns")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_columns();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_columns();
                }
            });

            for col in NumericColumn::ALL {
                let mut checked = state.selection.columns.contains(&col);
                let text = RichText::new(col.name()).color(state.colors.color_for(&col));
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_column(col);
                }
            }
        });
}

fn dataset_info(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        return;
    };

    egui::CollapsingHeader::new(RichText::new("Dataset").strong())
        .id_salt("dataset")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            let report = &table.report;
            ui.label(format!("Rows read: {}", report.rows_read));
            ui.label(format!("Duplicates dropped: {}", report.duplicates_dropped));
            ui.label(format!("Records: {}", table.len()));
            ui.label(format!("Source columns: {}", table.columns.len()));
            if report.negative_durations > 0 {
                ui.label(
                    RichText::new(format!(
                        "End before start: {} ({} adjusted)",
                        report.negative_durations, report.negative_adjusted
                    ))
                    .color(Color32::YELLOW),
                );
            }
            if !table.steel_categories.is_empty() {
                ui.label(format!(
                    "Steel categories ({}): {}",
                    table.steel_categories.len(),
                    table.steel_categories.labels().join(", ")
                ));
            }
            let groups: Vec<&str> = table.work_groups.iter().map(|g| g.as_str()).collect();
            ui.label(format!("Work groups: {}", groups.join(", ")));
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
            let has_table = state.table.is_some();
            if ui.add_enabled(has_table, egui::Button::new("Reload")).clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} records loaded, {} visible",
                table.len(),
                state.view.rows.len()
            ));
            ui.separator();
            ui.label(
                RichText::new(table.source.display().to_string())
                    .small()
                    .weak(),
            );
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open process records")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
