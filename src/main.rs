mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;
mod view;

use app::RoughcutApp;
use config::ViewerConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::load_or_default();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Roughcut Viewer – Rough-Machining Records",
        options,
        Box::new(|_cc| Ok(Box::new(RoughcutApp::new(config)))),
    )
}
