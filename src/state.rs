use std::path::Path;
use std::sync::Arc;

use crate::color::FamilyColors;
use crate::data::model::{CellValue, Family, ForecastTables};
use crate::data::selection::{Selection, SelectionOptions};
use crate::view::ForecastView;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded tables, shared with the cache.
    pub tables: Arc<ForecastTables>,

    /// Current store / date / family choice.
    pub selection: Selection,

    /// Stores, dates and families offered for `selection` (cached).
    pub options: SelectionOptions,

    /// Every report section for `selection` (cached).
    pub view: ForecastView,

    /// Colour per product family.
    pub colors: FamilyColors,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Start from the initial selection of freshly loaded tables.
    pub fn new(tables: Arc<ForecastTables>) -> Self {
        let selection = Selection::initial(&tables.predictions);
        let options = SelectionOptions::new(&tables.predictions, &selection);
        let view = ForecastView::build(&tables, &selection);
        let colors = FamilyColors::new(&tables.families);
        Self {
            tables,
            selection,
            options,
            view,
            colors,
            status_message: None,
        }
    }

    /// Recompute `options` and `view` after a selection change.
    pub fn refresh(&mut self) {
        log::debug!("Selection changed: {:?}", self.selection);
        self.options.update(&self.tables.predictions, &self.selection);
        self.view = ForecastView::build(&self.tables, &self.selection);
    }

    pub fn select_store(&mut self, store: CellValue) {
        self.selection.set_store(&self.tables.predictions, store);
        self.refresh();
    }

    pub fn select_date(&mut self, date: String) {
        self.selection.set_date(&self.tables.predictions, date);
        self.refresh();
    }

    /// Toggle a single family in the multi-select.
    pub fn toggle_family(&mut self, family: &Family) {
        self.selection.toggle_family(family);
        self.refresh();
    }

    /// Select every family offered at the current (store, date).
    pub fn select_all(&mut self) {
        self.selection.select_all_families(&self.tables.predictions);
        self.refresh();
    }

    /// Deselect all families.
    pub fn select_none(&mut self) {
        self.selection.clear_families();
        self.refresh();
    }

    /// Write the current force plot as HTML.
    pub fn export_force_plot(&mut self, path: &Path) {
        let Some(plot) = &self.view.force_plot else {
            return;
        };
        match std::fs::write(path, plot.to_html()) {
            Ok(()) => {
                log::info!("Saved force plot to {}", path.display());
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to save force plot: {e:#}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
