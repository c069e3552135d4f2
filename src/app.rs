use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::ViewerConfig;
use crate::state::AppState;
use crate::ui::{metrics, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RoughcutApp {
    pub state: AppState,
}

impl RoughcutApp {
    /// Build the app and open the configured data file if it exists.
    pub fn new(config: ViewerConfig) -> Self {
        let data_path = config.data_path.clone();
        let mut state = AppState::new(config);
        if data_path.is_file() {
            state.load_path(&data_path);
        } else {
            log::info!(
                "{} not found; waiting for File → Open…",
                data_path.display()
            );
        }
        Self { state }
    }
}

impl eframe::App for RoughcutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: metrics and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            dashboard(ui, &self.state);
        });
    }
}

fn dashboard(ui: &mut Ui, state: &AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a record file to start  (File → Open…)");
        });
        return;
    }

    if state.table.as_ref().is_some_and(|t| t.is_empty()) {
        ui.label("The file holds no records.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Rough-machining process records");
            ui.add_space(4.0);

            for warning in &state.view.warnings {
                ui.label(RichText::new(warning.message()).color(Color32::YELLOW));
            }

            if !state.view.summaries.is_empty() {
                metrics::metric_cards(ui, state);
                ui.separator();
                metrics::summary_grid(ui, &state.view.summaries);
                ui.separator();

                ui.strong("Over time");
                plot::time_series(ui, state);
                ui.separator();
            }

            ui.columns(2, |cols: &mut [Ui]| {
                cols[0].strong("Steel categories");
                plot::distribution(
                    &mut cols[0],
                    "steel_category_counts",
                    "STEEL_CATEGORY",
                    &state.view.category_counts,
                );
                cols[1].strong("Work groups");
                plot::distribution(
                    &mut cols[1],
                    "work_group_counts",
                    "WORK_SHAPE",
                    &state.view.work_group_counts,
                );
            });
            ui.separator();

            ui.strong("Processing time distribution");
            plot::duration_histogram(ui, state);
            ui.separator();

            egui::CollapsingHeader::new(RichText::new("Records").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    metrics::record_table(ui, state);
                });
        });
}
