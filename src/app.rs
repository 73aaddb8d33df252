use eframe::egui;

use crate::data::cache::TableCache;
use crate::state::AppState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ForecastViewerApp {
    /// Keeps the loaded tables alive for the process lifetime.
    pub cache: TableCache,
    pub state: AppState,
}

impl ForecastViewerApp {
    /// Build the app from a cache that has already loaded successfully.
    pub fn new(cache: TableCache) -> Result<Self, crate::error::LoadError> {
        let tables = cache.load()?;
        Ok(Self {
            state: AppState::new(tables),
            cache,
        })
    }
}

impl eframe::App for ForecastViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state, self.cache.sources());
        });

        // ---- Left side panel: selection ----
        egui::SidePanel::left("selection_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: report ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::report(ui, &mut self.state);
        });
    }
}
