use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Plot, VLine};

use crate::color::{HIGHER, LOWER};
use crate::data::model::FeatureImportance;
use crate::view::force::ForcePlot;

// ---------------------------------------------------------------------------
// Mean |SHAP| bar chart
// ---------------------------------------------------------------------------

/// Horizontal bars, one per feature, top to bottom in the given order.
///
/// `features` arrives sorted descending; the axis keeps that order instead of
/// sorting labels.
pub fn importance_chart(ui: &mut Ui, id: &str, features: &[FeatureImportance]) {
    let n = features.len();
    // Row k from the top sits at y = n - 1 - k.
    let position = move |k: usize| (n - 1 - k) as f64;

    let bars: Vec<Bar> = features
        .iter()
        .enumerate()
        .map(|(k, f)| {
            Bar::new(position(k), f.mean_abs_shap)
                .name(&f.feature)
                .width(0.7)
                .fill(Color32::from_rgb(76, 120, 168))
        })
        .collect();

    let labels: Vec<String> = features.iter().map(|f| f.feature.clone()).collect();

    Plot::new(id)
        .height((n as f32 * 22.0).clamp(120.0, 420.0))
        .x_axis_label("mean |SHAP|")
        .y_axis_formatter(move |mark, _range| {
            let v = mark.value;
            if v < 0.0 || (v - v.round()).abs() > 1e-6 {
                return String::new();
            }
            let k = n as i64 - 1 - v.round() as i64;
            usize::try_from(k)
                .ok()
                .and_then(|k| labels.get(k).cloned())
                .unwrap_or_default()
        })
        .y_axis_min_width(140.0)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

// ---------------------------------------------------------------------------
// Force plot
// ---------------------------------------------------------------------------

/// One row's contributions laid out along the model-output axis.
pub fn force_plot(ui: &mut Ui, force: &ForcePlot) {
    let bars: Vec<Bar> = force
        .segments()
        .into_iter()
        .map(|s| {
            let (lo, hi) = if s.start <= s.end { (s.start, s.end) } else { (s.end, s.start) };
            Bar::new(0.0, hi - lo)
                .base_offset(lo)
                .width(0.6)
                .name(format!("{} ({:+.4})", s.feature, if s.higher { hi - lo } else { lo - hi }))
                .fill(if s.higher { HIGHER } else { LOWER })
                .stroke((1.0, Color32::WHITE))
        })
        .collect();

    let base = force.base_value;
    let output = force.output_value();

    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("base value {base:.3}"));
        ui.separator();
        ui.strong(format!("f(x) = {output:.3}"));
        ui.separator();
        ui.colored_label(HIGHER, "■ higher");
        ui.colored_label(LOWER, "■ lower");
    });

    Plot::new("force_plot")
        .height(160.0)
        .show_y(false)
        .y_axis_formatter(|_, _| String::new())
        .x_axis_label("model output")
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
            plot_ui.vline(VLine::new(base).color(Color32::GRAY).name("base value"));
            plot_ui.vline(VLine::new(output).color(Color32::BLACK).name("f(x)"));
        });

    // Top contributions on each side, like the labels under a SHAP force plot.
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for c in force.pushing_higher().iter().take(5) {
            ui.colored_label(HIGHER, format!("{} = {}", c.feature, c.value));
        }
        for c in force.pushing_lower().iter().take(5) {
            ui.colored_label(LOWER, format!("{} = {}", c.feature, c.value));
        }
    });
}
