use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::DataSources;
use crate::state::AppState;
use crate::ui::{plot, tables};

// ---------------------------------------------------------------------------
// Left side panel – selection widgets
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Selection");
    ui.separator();

    let current_store = state.selection.store.clone();
    let mut picked_store = None;
    let mut picked_date = None;
    let mut toggled = None;

    // ---- Store ----
    ui.strong("Store");
    let store_text = current_store
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_default();
    egui::ComboBox::from_id_salt("store")
        .selected_text(store_text)
        .show_ui(ui, |ui: &mut Ui| {
            for store in &state.options.stores {
                if ui
                    .selectable_label(current_store.as_ref() == Some(store), store.to_string())
                    .clicked()
                {
                    picked_store = Some(store.clone());
                }
            }
        });
    ui.add_space(6.0);

    // ---- Date (options depend on the store) ----
    ui.strong("Date");
    let current_date = state.selection.date.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("date")
        .selected_text(&current_date)
        .show_ui(ui, |ui: &mut Ui| {
            for date in &state.options.dates {
                if ui.selectable_label(current_date == *date, date).clicked() {
                    picked_date = Some(date.clone());
                }
            }
        });
    ui.add_space(6.0);

    // ---- Product families (options depend on store + date) ----
    let n_selected = state.selection.families.len();
    ui.strong(format!(
        "Product families  ({n_selected}/{})",
        state.options.families.len()
    ));
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all();
        }
        if ui.small_button("None").clicked() {
            state.select_none();
        }
    });

    ScrollArea::vertical()
        .id_salt("families")
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for family in &state.options.families {
                let mut checked = state.selection.families.contains(family);
                let text = RichText::new(family.as_str())
                    .color(state.colors.color_for(Some(family)));
                if ui.checkbox(&mut checked, text).changed() {
                    toggled = Some(family.clone());
                }
            }
        });

    if let Some(store) = picked_store {
        state.select_store(store);
    } else if let Some(date) = picked_date {
        state.select_date(date);
    } else if let Some(family) = toggled {
        state.toggle_family(&family);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, sources: &DataSources) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            let can_export = state.view.force_plot.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export force plot…"))
                .clicked()
            {
                save_force_plot_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!("Data: {}", sources.data_dir.display()));
        ui.separator();

        let tables = &state.tables;
        ui.label(format!(
            "{} prediction rows, {} matching",
            tables.predictions.len(),
            state.view.prediction_rows.len()
        ));

        let dropped = tables.report.total_dropped_dates();
        if dropped > 0 {
            ui.separator();
            let text = format!("{dropped} rows without a valid date");
            ui.label(RichText::new(text).color(Color32::YELLOW))
                .on_hover_text(
                    tables
                        .report
                        .tables
                        .iter()
                        .filter(|t| t.dropped_dates > 0)
                        .map(|t| format!("{}: {}", t.name, t.dropped_dates))
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central report
// ---------------------------------------------------------------------------

/// Render every report section for the current selection.
pub fn report(ui: &mut Ui, state: &mut AppState) {
    let view = &state.view;
    let colors = &state.colors;
    let mut export = false;

    ScrollArea::vertical()
        .id_salt("report")
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("📊 Rows for the selected store, date and families");
            match view.predictions_advisory() {
                Some(msg) => advisory(ui, msg),
                None => tables::table(ui, "raw_rows", &view.raw, colors),
            }
            ui.add_space(12.0);

            ui.heading("📊 Predicted sales (mean of 3 models)");
            match view.predictions_advisory() {
                Some(msg) => advisory(ui, msg),
                None => tables::table(ui, "prediction_summary", &view.summary, colors),
            }
            ui.add_space(12.0);

            ui.heading("🌎 Mean |SHAP| – validation data");
            plot::importance_chart(ui, "val_importance", &view.val_importance);
            ui.add_space(12.0);

            ui.heading("🌎 Mean |SHAP| – test data");
            plot::importance_chart(ui, "test_importance", &view.test_importance);
            ui.add_space(12.0);

            ui.heading("🔍 SHAP values (feature contributions of these rows)");
            match view.shap_advisory() {
                Some(msg) => advisory(ui, msg),
                None => tables::table(ui, "shap_rows", &view.shap, colors),
            }
            ui.add_space(12.0);

            ui.heading("🌎 Test data force plot (first matching row)");
            match (&view.force_plot, view.force_plot_advisory()) {
                (Some(force), _) => {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label(&force.label);
                        if ui.small_button("Export HTML…").clicked() {
                            export = true;
                        }
                    });
                    plot::force_plot(ui, force);
                }
                (None, Some(msg)) => advisory(ui, msg),
                (None, None) => {}
            }
        });

    if export {
        save_force_plot_dialog(state);
    }
}

fn advisory(ui: &mut Ui, msg: &str) {
    ui.label(RichText::new(format!("⚠ {msg}")).color(Color32::from_rgb(230, 160, 0)));
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn save_force_plot_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export force plot")
        .set_file_name("force_plot.html")
        .add_filter("HTML", &["html", "htm"])
        .save_file();

    if let Some(path) = file {
        state.export_force_plot(&path);
    }
}
