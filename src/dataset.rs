//! Derived dataset for the rendering layer
//!
//! `derive_dataset` is the whole pipeline: generate, partition, fit both
//! sides, then annotate every observation with the prediction of its own
//! side only. The opposite side's value stays absent so a line renderer
//! breaks at the cutoff instead of bridging it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimulationConfig;
use crate::regression::{fit_piecewise, LinearFit, PiecewiseFit};
use crate::synth::{NoiseModel, Sample, Synthesizer, UnitSource};

/// A generated unit annotated with its side's fitted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub is_treated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitted_control: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitted_treatment: Option<f64>,
}

impl Observation {
    /// The fitted value present on this observation.
    pub fn fitted(&self) -> Option<f64> {
        self.fitted_control.or(self.fitted_treatment)
    }
}

/// Attach exactly one fitted value per sample, chosen by `x < cutoff`.
pub fn annotate(samples: &[Sample], cutoff: f64, fit: &PiecewiseFit) -> Vec<Observation> {
    samples
        .iter()
        .map(|s| {
            let mut obs = Observation {
                id: s.id,
                x: s.x,
                y: s.y,
                is_treated: s.is_treated,
                fitted_control: None,
                fitted_treatment: None,
            };
            if s.x < cutoff {
                obs.fitted_control = Some(fit.control.predict(s.x));
            } else {
                obs.fitted_treatment = Some(fit.treated.predict(s.x));
            }
            obs
        })
        .collect()
}

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub config: SimulationConfig,
    /// Sorted ascending by `x`
    pub observations: Vec<Observation>,
    pub fit: PiecewiseFit,
}

/// Headline numbers of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub sample_size: usize,
    pub control_count: usize,
    pub treated_count: usize,
    pub control_fit: LinearFit,
    pub treated_fit: LinearFit,
    /// Gap between the two fitted lines at the cutoff
    pub estimated_jump: f64,
    /// Configured effect size
    pub true_effect: f64,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn treated_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_treated).count()
    }

    pub fn summary(&self) -> DatasetSummary {
        let treated_count = self.treated_count();
        DatasetSummary {
            sample_size: self.len(),
            control_count: self.len() - treated_count,
            treated_count,
            control_fit: self.fit.control,
            treated_fit: self.fit.treated,
            estimated_jump: self.fit.discontinuity(self.config.cutoff),
            true_effect: self.config.effect_size,
        }
    }
}

/// Generate and fit a fresh dataset; nothing carries over between calls.
pub fn derive_dataset(
    config: &SimulationConfig,
    source: &mut (impl UnitSource + ?Sized),
    noise_model: NoiseModel,
) -> Dataset {
    let samples = Synthesizer::new(noise_model).generate(config, source);
    let fit = fit_piecewise(&samples);
    let observations = annotate(&samples, config.cutoff, &fit);

    debug!(
        n = observations.len(),
        control_slope = fit.control.slope,
        control_intercept = fit.control.intercept,
        treated_slope = fit.treated.slope,
        treated_intercept = fit.treated.intercept,
        "derived dataset"
    );

    Dataset {
        config: *config,
        observations,
        fit,
    }
}
