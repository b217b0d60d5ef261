use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::config::SimulationConfig;
use crate::dataset::{DatasetSummary, Observation};
use crate::RddError;

pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, RddError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

fn fmt_option_f64(value: Option<f64>) -> String {
    value.map(fmt_f64).unwrap_or_default()
}

/// Observations as CSV; the absent fitted side is an empty cell.
pub fn write_observations_csv(path: &Path, observations: &[Observation]) -> Result<(), RddError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "id",
        "x",
        "y",
        "is_treated",
        "fitted_control",
        "fitted_treatment",
    ])?;

    for obs in observations {
        writer.write_record([
            obs.id.to_string(),
            fmt_f64(obs.x),
            fmt_f64(obs.y),
            obs.is_treated.to_string(),
            fmt_option_f64(obs.fitted_control),
            fmt_option_f64(obs.fitted_treatment),
        ])?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = observations.len(), "wrote observations");
    Ok(())
}

#[derive(Debug, Serialize)]
struct SummaryDocument<'a> {
    config: &'a SimulationConfig,
    seed: u64,
    #[serde(flatten)]
    summary: &'a DatasetSummary,
}

pub fn write_summary_json(
    path: &Path,
    config: &SimulationConfig,
    seed: u64,
    summary: &DatasetSummary,
) -> Result<(), RddError> {
    let doc = SummaryDocument {
        config,
        seed,
        summary,
    };
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "wrote summary");
    Ok(())
}
