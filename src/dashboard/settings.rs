//! Dashboard Settings
//! Input files and selector values for one render pass.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CSV_PATH: &str = "data/fr-en-college-effectifs-niveau-sexe-lv.csv";
pub const DEFAULT_GEOJSON_PATH: &str = "data/departements.geojson";

/// User settings for a dashboard render.
///
/// `year` and `region` mirror the two selectors; when unset, the first
/// available value is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub csv_path: PathBuf,
    pub geojson_path: PathBuf,
    pub year: Option<String>,
    pub region: Option<String>,
    pub output_path: Option<PathBuf>,
    pub top_n: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            geojson_path: PathBuf::from(DEFAULT_GEOJSON_PATH),
            year: None,
            region: None,
            output_path: None,
            top_n: 10,
        }
    }
}

impl DashboardSettings {
    /// Read settings from a JSON file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: DashboardSettings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(settings)
    }
}
