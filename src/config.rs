use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::LoadError;

/// Optional config file looked up in the working directory.
pub const CONFIG_FILE: &str = "forecast_viewer.json";

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// Where the six forecast tables live. File names may end in `.csv`,
/// `.parquet` or `.pq`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataSources {
    pub data_dir: PathBuf,
    pub predictions: String,
    pub val_shap: String,
    pub val_mean_shap: String,
    pub test_shap: String,
    pub test_mean_shap: String,
    pub expected_value: String,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            predictions: "predictions.csv".into(),
            val_shap: "val_shap_values.csv".into(),
            val_mean_shap: "val_mean_shap.csv".into(),
            test_shap: "shap_values_test_avg.csv".into(),
            test_mean_shap: "test_mean_shap.csv".into(),
            expected_value: "expected_value.csv".into(),
        }
    }
}

impl DataSources {
    /// Sources with default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

// ---------------------------------------------------------------------------
// Viewer config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub data: DataSources,
    pub window: WindowConfig,
}

impl ViewerConfig {
    /// Read `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            log::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path).map_err(|source| LoadError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).context("reading config file")?;
        let config: ViewerConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
