//! RDD-SIM - Regression Discontinuity Design simulator
//!
//! Generates synthetic observations scattered around a cutoff on a running
//! variable, adds a treatment jump on the treated side, and fits one OLS line
//! per side so the discontinuity shows up as a break between the two lines.

pub mod config;
pub mod dataset;
pub mod explain;
pub mod output;
pub mod regression;
pub mod synth;

use thiserror::Error;

// Re-export main types
pub use config::{Param, ParamRange, RunConfig, SimulationConfig};
pub use dataset::{annotate, derive_dataset, Dataset, DatasetSummary, Observation};
pub use explain::{ExplanationService, Explainer};
pub use regression::{fit_group, fit_piecewise, LinearFit, PiecewiseFit};
pub use synth::{generate, seeded_rng, NoiseModel, Sample, Synthesizer, UnitSource};

#[derive(Debug, Error)]
pub enum RddError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
