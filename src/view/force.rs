use std::fmt::Write as _;

use crate::data::model::{CellValue, KeyedTable};

/// Fill of contributions that push the prediction higher.
pub const HIGHER_RGB: (u8, u8, u8) = (255, 0, 81);
/// Fill of contributions that push the prediction lower.
pub const LOWER_RGB: (u8, u8, u8) = (0, 139, 251);

/// One feature's push on a single prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub feature: String,
    pub shap: f64,
    /// Cell shown next to the feature name.
    pub value: CellValue,
}

/// A horizontal span of the force plot, in model-output units.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub feature: String,
    pub start: f64,
    pub end: f64,
    pub higher: bool,
}

/// Additive explanation of one row: `base_value + Σ shap = output_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcePlot {
    pub label: String,
    pub base_value: f64,
    pub contributions: Vec<Contribution>,
}

impl ForcePlot {
    /// Build the plot for `row` of `table` from the listed feature columns.
    /// Non-numeric SHAP cells are skipped.
    pub fn from_row(
        table: &KeyedTable,
        row: usize,
        features: &[&str],
        base_value: f64,
    ) -> Option<Self> {
        let source = table.rows.get(row)?;
        let contributions = features
            .iter()
            .filter_map(|&feature| -> Option<Contribution> {
                let cell = table.value(row, feature)?;
                let Some(shap) = cell.as_f64() else {
                    log::debug!("{feature}: non-numeric SHAP value '{cell}' skipped");
                    return None;
                };
                Some(Contribution {
                    feature: feature.to_string(),
                    shap,
                    value: cell.clone(),
                })
            })
            .collect();

        let label = format!(
            "store {} · {} · {}",
            source.store,
            source.date_string().unwrap_or_default(),
            source
                .family
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_default()
        );

        Some(ForcePlot {
            label,
            base_value,
            contributions,
        })
    }

    pub fn output_value(&self) -> f64 {
        self.base_value + self.contributions.iter().map(|c| c.shap).sum::<f64>()
    }

    /// Positive contributions, largest first.
    pub fn pushing_higher(&self) -> Vec<&Contribution> {
        self.sorted_by_magnitude(|c| c.shap > 0.0)
    }

    /// Negative contributions, largest magnitude first.
    pub fn pushing_lower(&self) -> Vec<&Contribution> {
        self.sorted_by_magnitude(|c| c.shap < 0.0)
    }

    fn sorted_by_magnitude(&self, keep: impl Fn(&Contribution) -> bool) -> Vec<&Contribution> {
        let mut out: Vec<&Contribution> = self.contributions.iter().filter(|c| keep(c)).collect();
        out.sort_by(|a, b| b.shap.abs().total_cmp(&a.shap.abs()));
        out
    }

    /// Spans laid out outward from the output value: higher-pushing features
    /// to its left, lower-pushing ones to its right, biggest ones adjacent.
    pub fn segments(&self) -> Vec<Segment> {
        let output = self.output_value();
        let mut segments = Vec::with_capacity(self.contributions.len());

        let mut cursor = output;
        for c in self.pushing_higher() {
            segments.push(Segment {
                feature: c.feature.clone(),
                start: cursor - c.shap,
                end: cursor,
                higher: true,
            });
            cursor -= c.shap;
        }

        let mut cursor = output;
        for c in self.pushing_lower() {
            segments.push(Segment {
                feature: c.feature.clone(),
                start: cursor,
                end: cursor - c.shap,
                higher: false,
            });
            cursor -= c.shap;
        }

        segments
    }

    /// A standalone HTML document drawing the plot as inline SVG.
    pub fn to_html(&self) -> String {
        const WIDTH: f64 = 1000.0;
        const MARGIN: f64 = 40.0;
        const BAR_Y: f64 = 60.0;
        const BAR_H: f64 = 36.0;

        let segments = self.segments();
        let output = self.output_value();
        let (lo, hi) = segments.iter().fold(
            (self.base_value.min(output), self.base_value.max(output)),
            |(lo, hi), s| (lo.min(s.start), hi.max(s.end)),
        );
        let span = if (hi - lo).abs() < f64::EPSILON { 1.0 } else { hi - lo };
        let x = |v: f64| MARGIN + (v - lo) / span * (WIDTH - 2.0 * MARGIN);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" viewBox="0 0 {WIDTH} 200">"#
        );
        for s in &segments {
            let (r, g, b) = if s.higher { HIGHER_RGB } else { LOWER_RGB };
            let _ = writeln!(
                svg,
                r#"  <rect x="{:.1}" y="{BAR_Y}" width="{:.1}" height="{BAR_H}" fill="rgb({r},{g},{b})" stroke="white"><title>{} = {:.4}</title></rect>"#,
                x(s.start),
                (x(s.end) - x(s.start)).max(0.5),
                escape(&s.feature),
                if s.higher { s.end - s.start } else { s.start - s.end },
            );
        }
        for c in self.pushing_higher().iter().chain(self.pushing_lower().iter()).take(8) {
            let Some(s) = segments.iter().find(|s| s.feature == c.feature) else {
                continue;
            };
            let _ = writeln!(
                svg,
                r#"  <text x="{:.1}" y="{}" font-size="11" text-anchor="middle">{} = {}</text>"#,
                (x(s.start) + x(s.end)) / 2.0,
                BAR_Y + BAR_H + 18.0,
                escape(&c.feature),
                escape(&c.value.to_string()),
            );
        }
        for (value, name) in [(self.base_value, "base value"), (output, "f(x)")] {
            let _ = writeln!(
                svg,
                r#"  <line x1="{x:.1}" x2="{x:.1}" y1="{}" y2="{}" stroke="black"/><text x="{x:.1}" y="{}" font-size="12" text-anchor="middle">{name} {value:.2}</text>"#,
                BAR_Y - 20.0,
                BAR_Y + BAR_H + 4.0,
                BAR_Y - 26.0,
                x = x(value),
            );
        }
        svg.push_str("</svg>\n");

        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Force plot: {label}</title></head>\n\
             <body style=\"width:100%; font-family: sans-serif;\">\n<h3>{label}</h3>\n{svg}</body>\n</html>\n",
            label = escape(&self.label),
        )
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(shaps: &[(&str, f64)]) -> ForcePlot {
        ForcePlot {
            label: "store 1 · 2017-08-15 · DAIRY".into(),
            base_value: 5.0,
            contributions: shaps
                .iter()
                .map(|&(feature, shap)| Contribution {
                    feature: feature.into(),
                    shap,
                    value: CellValue::Float(shap),
                })
                .collect(),
        }
    }

    #[test]
    fn output_is_base_plus_contributions() {
        let p = plot(&[("a", 1.5), ("b", -0.5), ("c", 0.25)]);
        assert!((p.output_value() - 6.25).abs() < 1e-12);
    }

    #[test]
    fn sides_are_ordered_by_magnitude() {
        let p = plot(&[("a", 0.5), ("b", -2.0), ("c", 1.5), ("d", -0.1), ("z", 0.0)]);
        let up: Vec<&str> = p.pushing_higher().iter().map(|c| c.feature.as_str()).collect();
        let down: Vec<&str> = p.pushing_lower().iter().map(|c| c.feature.as_str()).collect();
        assert_eq!(up, vec!["c", "a"]);
        assert_eq!(down, vec!["b", "d"]);
    }

    #[test]
    fn segments_tile_from_output_outwards() {
        let p = plot(&[("a", 1.0), ("b", -0.5), ("c", 2.0)]);
        let output = p.output_value(); // 7.5
        let segs = p.segments();

        assert_eq!(segs[0].feature, "c");
        assert_eq!((segs[0].start, segs[0].end), (output - 2.0, output));
        assert_eq!((segs[1].start, segs[1].end), (output - 3.0, output - 2.0));
        // Left edge of the higher side is base + Σ negatives.
        assert!((segs[1].start - (p.base_value - 0.5)).abs() < 1e-12);

        assert_eq!(segs[2].feature, "b");
        assert!(!segs[2].higher);
        assert_eq!((segs[2].start, segs[2].end), (output, output + 0.5));
    }

    #[test]
    fn html_is_standalone_and_escaped() {
        let mut p = plot(&[("a<b", 1.0), ("c", -1.0)]);
        p.label = "store 1 · 2017-08-15 · BREAD/BAKERY & more".into();
        let html = p.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<svg"));
        assert!(html.contains("a&lt;b"));
        assert!(html.contains("BREAD/BAKERY &amp; more"));
        assert!(html.contains("base value 5.00"));
    }
}
