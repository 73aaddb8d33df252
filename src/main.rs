mod app;
mod color;
mod config;
mod data;
mod error;
mod features;
mod state;
mod ui;
mod view;

use std::path::Path;

use app::ForecastViewerApp;
use config::{CONFIG_FILE, ViewerConfig};
use data::cache::TableCache;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Missing or malformed inputs are fatal: there is nothing to show without them.
    let app = match ViewerConfig::load_or_default(Path::new(CONFIG_FILE)).and_then(|config| {
        let window = config.window.clone();
        ForecastViewerApp::new(TableCache::new(config.data)).map(|app| (app, window))
    }) {
        Ok(loaded) => loaded,
        Err(e) => {
            let e = anyhow::Error::from(e);
            log::error!("Startup failed: {e:#}");
            eprintln!("forecast-viewer: {e:#}");
            std::process::exit(1);
        }
    };
    let (app, window) = app;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([window.width, window.height])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Forecast Viewer – Sales Predictions & SHAP",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
