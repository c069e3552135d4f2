use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::model::NumericColumn;
use crate::data::normalize::{NegativeDurationPolicy, NormalizeOptions};

/// Optional viewer settings file, looked up in the working directory.
pub const CONFIG_FILE: &str = "roughcut.json";

pub const MIN_BINS: usize = 10;
pub const MAX_BINS: usize = 100;

// ---------------------------------------------------------------------------
// ViewerConfig
// ---------------------------------------------------------------------------

/// Read-only start-up settings. Every field has a default, so a partial
/// `roughcut.json` is fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Record file opened at start-up when it exists.
    pub data_path: PathBuf,
    pub max_categories: usize,
    pub negative_durations: NegativeDurationPolicy,
    /// Column names selected in the multi-select at start-up.
    pub default_columns: Vec<String>,
    pub histogram_bins: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/steel_ai_01_on.csv"),
            max_categories: NormalizeOptions::default().max_categories,
            negative_durations: NegativeDurationPolicy::default(),
            default_columns: NumericColumn::ALL
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            histogram_bins: 20,
        }
    }
}

impl ViewerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: ViewerConfig =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load `roughcut.json` if present; fall back to defaults otherwise.
    pub fn load_or_default() -> Self {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                log::info!("Using settings from {}", path.display());
                config
            }
            Err(e) => {
                log::error!("Ignoring settings file: {e:#}");
                Self::default()
            }
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            max_categories: self.max_categories.max(1),
            negative_durations: self.negative_durations,
        }
    }

    /// Configured default columns that name a known numeric column.
    pub fn initial_columns(&self) -> Vec<NumericColumn> {
        let mut columns: Vec<NumericColumn> = self
            .default_columns
            .iter()
            .filter_map(|name| {
                let col = NumericColumn::from_name(name);
                if col.is_none() {
                    log::warn!("Unknown default column '{name}' ignored");
                }
                col
            })
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }

    pub fn bins(&self) -> usize {
        self.histogram_bins.clamp(MIN_BINS, MAX_BINS)
    }
}
