use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Family;
use crate::view::force::{HIGHER_RGB, LOWER_RGB};

/// Bars of contributions that raise the prediction.
pub const HIGHER: Color32 = Color32::from_rgb(HIGHER_RGB.0, HIGHER_RGB.1, HIGHER_RGB.2);
/// Bars of contributions that lower the prediction.
pub const LOWER: Color32 = Color32::from_rgb(LOWER_RGB.0, LOWER_RGB.1, LOWER_RGB.2);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Family → Color32
// ---------------------------------------------------------------------------

/// Gives every product family of the vocabulary a stable colour.
#[derive(Debug, Clone)]
pub struct FamilyColors {
    mapping: BTreeMap<Family, Color32>,
    default_color: Color32,
}

impl FamilyColors {
    pub fn new(families: &BTreeSet<Family>) -> Self {
        let mapping = families
            .iter()
            .cloned()
            .zip(generate_palette(families.len()))
            .collect();

        FamilyColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, family: Option<&Family>) -> Color32 {
        family
            .and_then(|f| self.mapping.get(f))
            .copied()
            .unwrap_or(self.default_color)
    }
}
