use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};

#[path = "../features.rs"]
mod features;

use features::FORCE_PLOT_FEATURES as SHAP_FEATURES;

const FAMILIES: &[&str] = &[
    "BEVERAGES",
    "BREAD/BAKERY",
    "CLEANING",
    "DAIRY",
    "GROCERY I",
    "PRODUCE",
];

const EXPECTED_VALUE: f64 = 5.234;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Per-feature spread of the synthetic SHAP values; earlier features matter more.
fn shap_scale(feature_idx: usize) -> f64 {
    0.8 / (1.0 + feature_idx as f64 * 0.35)
}

struct ShapRows {
    rows: Vec<Vec<String>>,
    abs_sums: Vec<f64>,
}

impl ShapRows {
    fn new() -> Self {
        ShapRows {
            rows: Vec::new(),
            abs_sums: vec![0.0; SHAP_FEATURES.len()],
        }
    }

    fn push(&mut self, key: [String; 3], rng: &mut SimpleRng) -> f64 {
        let mut row: Vec<String> = key.into_iter().collect();
        let mut total = 0.0;
        for (i, sum) in self.abs_sums.iter_mut().enumerate() {
            let v = rng.gauss(0.0, shap_scale(i));
            *sum += v.abs();
            total += v;
            row.push(format!("{v:.6}"));
        }
        self.rows.push(row);
        total
    }

    fn mean_abs(&self) -> Vec<(String, f64)> {
        let n = self.rows.len().max(1) as f64;
        SHAP_FEATURES
            .iter()
            .zip(&self.abs_sums)
            .map(|(f, s)| (f.to_string(), s / n))
            .collect()
    }
}

fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn shap_header() -> Vec<&'static str> {
    ["store_nbr", "date", "family"]
        .into_iter()
        .chain(SHAP_FEATURES.iter().copied())
        .collect()
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let out = Path::new("sample_data");
    fs::create_dir_all(out).context("creating sample_data/")?;

    let test_start = NaiveDate::from_ymd_opt(2017, 8, 16).context("invalid start date")?;
    let val_start = test_start - Duration::days(14);
    let stores = 1..=4_i64;

    // ---- Validation split: SHAP rows only ----
    let mut val_shap = ShapRows::new();
    for store in stores.clone() {
        for d in 0..14 {
            let date = val_start + Duration::days(d);
            for family in FAMILIES {
                let key = [store.to_string(), date.to_string(), family.to_string()];
                val_shap.push(key, &mut rng);
            }
        }
    }

    // ---- Test split: predictions + SHAP rows ----
    let mut predictions = Vec::new();
    let mut test_shap = ShapRows::new();
    for store in stores.clone() {
        for d in 0..16 {
            let date = test_start + Duration::days(d);
            for (fi, family) in FAMILIES.iter().enumerate() {
                let key = [store.to_string(), date.to_string(), family.to_string()];
                // Store 4 has no SHAP rows for its last day.
                let total = if store == 4 && d == 15 {
                    rng.gauss(0.0, 0.5)
                } else {
                    test_shap.push(key.clone(), &mut rng)
                };
                let onpromotion = (rng.next_f64() * 10.0) as i64;
                let rolling_mean_7 = 20.0 * (fi + 1) as f64 + rng.gauss(0.0, 3.0);
                let dcoilwtico = 47.0 + rng.gauss(0.0, 1.0);
                let pred_mean = (EXPECTED_VALUE + total).exp();

                let mut row: Vec<String> = key.into_iter().collect();
                row.extend([
                    onpromotion.to_string(),
                    date.year().to_string(),
                    date.month().to_string(),
                    date.day().to_string(),
                    date.weekday().num_days_from_monday().to_string(),
                    format!("{rolling_mean_7:.3}"),
                    format!("{dcoilwtico:.2}"),
                    format!("{pred_mean:.3}"),
                ]);
                predictions.push(row);
            }
        }
    }

    write_csv(
        &out.join("predictions.csv"),
        &[
            "store_nbr",
            "date",
            "family",
            "onpromotion",
            "year",
            "month",
            "day",
            "weekday",
            "rolling_mean_7",
            "dcoilwtico",
            "pred_mean",
        ],
        &predictions,
    )?;
    write_csv(&out.join("val_shap_values.csv"), &shap_header(), &val_shap.rows)?;
    write_csv(&out.join("shap_values_test_avg.csv"), &shap_header(), &test_shap.rows)?;

    for (file, shap) in [("val_mean_shap.csv", &val_shap), ("test_mean_shap.csv", &test_shap)] {
        let rows: Vec<Vec<String>> = shap
            .mean_abs()
            .into_iter()
            .map(|(f, v)| vec![f, format!("{v:.6}")])
            .collect();
        write_csv(&out.join(file), &["feature", "mean_abs_shap"], &rows)?;
    }
    write_csv(
        &out.join("expected_value.csv"),
        &["expected_value"],
        &[vec![EXPECTED_VALUE.to_string()]],
    )?;

    println!(
        "Wrote {} predictions, {} validation and {} test SHAP rows to {}/",
        predictions.len(),
        val_shap.rows.len(),
        test_shap.rows.len(),
        out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shap_header_is_keys_then_force_plot_features() {
        let header = shap_header();
        assert_eq!(&header[..3], &["store_nbr", "date", "family"]);
        assert_eq!(&header[3..], SHAP_FEATURES);
    }

    #[test]
    fn mean_abs_covers_every_feature() {
        let mut rng = SimpleRng::new(7);
        let mut shap = ShapRows::new();
        shap.push(["1".into(), "2017-08-16".into(), "DAIRY".into()], &mut rng);
        let names: Vec<String> = shap.mean_abs().into_iter().map(|(f, _)| f).collect();
        assert_eq!(names, SHAP_FEATURES);
        assert_eq!(shap.rows[0].len(), 3 + SHAP_FEATURES.len());
    }
}
