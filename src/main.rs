mod app;
mod chart;
mod color;
mod data;
mod error;
mod state;
mod ui;

use app::ReportApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 750.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Tabula Report – Data Analysis",
        options,
        Box::new(|_cc| Ok(Box::new(ReportApp::default()))),
    )
}
