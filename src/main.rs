//! College Dashboard - Enrollment analysis for French middle schools
//!
//! Usage: `college-dashboard [settings.json]`. Writes the dashboard report as
//! JSON to the configured output path, or stdout.

use anyhow::{Context, Result};
use college_dashboard::dashboard::{Dashboard, DashboardSettings};
use log::info;
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => DashboardSettings::from_file(Path::new(&path))?,
        None => DashboardSettings::default(),
    };
    info!("settings: {:?}", settings);

    let report = Dashboard::build(&settings);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    match &settings.output_path {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
