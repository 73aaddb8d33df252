use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::FamilyColors;
use crate::view::TableView;

const ROW_HEIGHT: f32 = 18.0;
/// Index of the family cell in every [`TableView`] row.
const FAMILY_CELL: usize = 2;

/// Render a pre-formatted table, scrolling horizontally when wide.
pub fn table(ui: &mut Ui, id: &str, view: &TableView, colors: &FamilyColors) {
    if view.is_empty() {
        ui.weak("(no rows)");
        return;
    }
    ui.push_id(id, |ui: &mut Ui| {
        egui::ScrollArea::horizontal()
            .id_salt(id)
            .show(ui, |ui: &mut Ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .resizable(true)
                    .max_scroll_height(260.0)
                    .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                    .columns(Column::auto().at_least(60.0), view.columns.len())
                    .header(ROW_HEIGHT + 2.0, |mut header| {
                        for name in &view.columns {
                            header.col(|ui: &mut Ui| {
                                ui.strong(name);
                            });
                        }
                    })
                    .body(|body| {
                        body.rows(ROW_HEIGHT, view.rows.len(), |mut row| {
                            let r = &view.rows[row.index()];
                            for (i, cell) in r.cells.iter().enumerate() {
                                row.col(|ui: &mut Ui| {
                                    if i == FAMILY_CELL {
                                        ui.label(
                                            RichText::new(cell)
                                                .color(colors.color_for(r.family.as_ref())),
                                        );
                                    } else {
                                        ui.label(cell);
                                    }
                                });
                            }
                        });
                    });
            });
    });
}
