//! Simulation configuration
//!
//! The six knobs of the simulator plus the file-level run configuration used
//! by the `rdd-sim` binary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::explain::ExplainConfig;
use crate::synth::NoiseModel;
use crate::RddError;

/// Sample-size preset used by default.
pub const SMALL_SAMPLE: usize = 200;
/// Sample-size preset for the dense view.
pub const LARGE_SAMPLE: usize = 500;
/// Largest sample size a config may request.
pub const MAX_SAMPLE_SIZE: usize = 1_000_000;

/// Parameters of one synthetic data generation call.
///
/// Values are immutable per call; every change produces a new config and a
/// fully recomputed dataset.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Threshold c on the running variable
    #[serde_as(as = "DefaultOnNull")]
    pub cutoff: f64,
    /// Causal jump added to treated outcomes
    #[serde_as(as = "DefaultOnNull")]
    #[serde(alias = "effectSize")]
    pub effect_size: f64,
    /// Width scale of the additive noise (>= 0)
    #[serde_as(as = "DefaultOnNull")]
    #[serde(alias = "noiseLevel")]
    pub noise_level: f64,
    /// Number of observations to generate
    #[serde_as(as = "DefaultOnNull")]
    #[serde(alias = "sampleSize")]
    pub sample_size: usize,
    /// Linear coefficient of the underlying response
    #[serde_as(as = "DefaultOnNull")]
    pub slope: f64,
    /// Quadratic coefficient of the underlying response
    #[serde_as(as = "DefaultOnNull")]
    pub curvature: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cutoff: 50.0,
            effect_size: 15.0,
            noise_level: 5.0,
            sample_size: SMALL_SAMPLE,
            slope: 0.5,
            curvature: 0.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), RddError> {
        for param in Param::ALL {
            let value = self.get(param);
            if !value.is_finite() {
                return Err(RddError::InvalidConfig(format!(
                    "{} must be finite, got {value}",
                    param.key()
                )));
            }
        }

        if self.sample_size > MAX_SAMPLE_SIZE {
            return Err(RddError::InvalidConfig(format!(
                "sample_size must be <= {MAX_SAMPLE_SIZE}, got {}",
                self.sample_size
            )));
        }

        if self.noise_level < 0.0 {
            return Err(RddError::InvalidConfig(format!(
                "noise_level must be >= 0, got {}",
                self.noise_level
            )));
        }

        Ok(())
    }

    /// Current value of a continuous control.
    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::Cutoff => self.cutoff,
            Param::EffectSize => self.effect_size,
            Param::NoiseLevel => self.noise_level,
            Param::Slope => self.slope,
            Param::Curvature => self.curvature,
        }
    }

    /// Copy of this config with one control moved, clamped into its range.
    ///
    /// A non-finite `value` leaves the control where it was.
    pub fn with_param(&self, param: Param, value: f64) -> Self {
        let mut next = *self;
        if !value.is_finite() {
            return next;
        }

        let value = param.range().clamp(value);
        match param {
            Param::Cutoff => next.cutoff = value,
            Param::EffectSize => next.effect_size = value,
            Param::NoiseLevel => next.noise_level = value,
            Param::Slope => next.slope = value,
            Param::Curvature => next.curvature = value,
        }
        next
    }

    /// Flip between the two sample-size presets.
    pub fn toggle_sample_size(&self) -> Self {
        let sample_size = if self.sample_size == SMALL_SAMPLE {
            LARGE_SAMPLE
        } else {
            SMALL_SAMPLE
        };
        Self {
            sample_size,
            ..*self
        }
    }
}

/// Continuous controls exposed to an interactive front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Cutoff,
    EffectSize,
    NoiseLevel,
    Slope,
    Curvature,
}

/// Inclusive bounds and slider increment of a control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Param {
    pub const ALL: [Param; 5] = [
        Param::Cutoff,
        Param::EffectSize,
        Param::NoiseLevel,
        Param::Slope,
        Param::Curvature,
    ];

    pub fn range(&self) -> ParamRange {
        match self {
            Param::Cutoff => ParamRange::new(10.0, 90.0, 1.0),
            Param::EffectSize => ParamRange::new(-30.0, 50.0, 1.0),
            Param::NoiseLevel => ParamRange::new(0.0, 20.0, 0.5),
            Param::Slope => ParamRange::new(-2.0, 2.0, 0.1),
            Param::Curvature => ParamRange::new(-5.0, 5.0, 0.5),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Param::Cutoff => "Cutoff Threshold (c)",
            Param::EffectSize => "Treatment Effect (rho)",
            Param::NoiseLevel => "Noise / Variance (epsilon)",
            Param::Slope => "Underlying Slope",
            Param::Curvature => "Non-Linearity (Curvature)",
        }
    }

    /// Field name as it appears in config files.
    pub fn key(&self) -> &'static str {
        match self {
            Param::Cutoff => "cutoff",
            Param::EffectSize => "effect_size",
            Param::NoiseLevel => "noise_level",
            Param::Slope => "slope",
            Param::Curvature => "curvature",
        }
    }
}

pub const DEFAULT_SEED: u64 = 0x0DD5_2026_0050;

/// Everything the binary needs for one run.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    #[serde_as(as = "DefaultOnNull")]
    pub seed: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub noise_model: NoiseModel,
    pub explain: ExplainConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            seed: DEFAULT_SEED,
            noise_model: NoiseModel::default(),
            explain: ExplainConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load a run config; `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, RddError> {
        let raw = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            toml::from_str(&raw)?
        } else {
            serde_json::from_str(&raw)?
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RddError> {
        self.simulation.validate()?;

        if self.explain.timeout_secs == 0 {
            return Err(RddError::InvalidConfig(
                "explain.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_size, 200);
        assert_eq!(config.cutoff, 50.0);
    }

    #[test]
    fn test_validate_rejects_negative_noise() {
        let config = SimulationConfig {
            noise_level: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RddError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let config = SimulationConfig {
            slope: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            cutoff: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sample_size_is_valid() {
        let config = SimulationConfig {
            sample_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_sample_size() {
        let config = SimulationConfig {
            sample_size: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RddError::InvalidConfig(_))));

        let config = SimulationConfig {
            sample_size: MAX_SAMPLE_SIZE,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_param_clamps_and_copies() {
        let config = SimulationConfig::default();
        let moved = config.with_param(Param::Cutoff, 120.0);
        assert_eq!(moved.cutoff, 90.0);
        assert_eq!(config.cutoff, 50.0);

        let moved = config.with_param(Param::NoiseLevel, -3.0);
        assert_eq!(moved.noise_level, 0.0);

        let moved = config.with_param(Param::Slope, f64::NAN);
        assert_eq!(moved, config);
    }

    #[test]
    fn test_toggle_sample_size() {
        let config = SimulationConfig::default();
        let large = config.toggle_sample_size();
        assert_eq!(large.sample_size, LARGE_SAMPLE);
        assert_eq!(large.toggle_sample_size().sample_size, SMALL_SAMPLE);

        let odd = SimulationConfig {
            sample_size: 37,
            ..Default::default()
        };
        assert_eq!(odd.toggle_sample_size().sample_size, SMALL_SAMPLE);
    }

    #[test]
    fn test_defaults_sit_inside_ranges() {
        let config = SimulationConfig::default();
        for param in Param::ALL {
            assert!(param.range().contains(config.get(param)), "{}", param.label());
        }
    }

    #[test]
    fn test_deserialize_camel_case_and_nulls() {
        let raw = r#"{"cutoff": 40, "effectSize": 10, "noiseLevel": null, "sampleSize": 4}"#;
        let config: SimulationConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.cutoff, 40.0);
        assert_eq!(config.effect_size, 10.0);
        assert_eq!(config.noise_level, 5.0);
        assert_eq!(config.sample_size, 4);
        assert_eq!(config.slope, 0.5);
    }

    #[test]
    fn test_run_config_toml() {
        let raw = r#"
            seed = 7
            noise_model = "gaussian"

            [simulation]
            cutoff = 30.0
            effect_size = -5.0
        "#;
        let config: RunConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.noise_model, NoiseModel::Gaussian);
        assert_eq!(config.simulation.cutoff, 30.0);
        assert_eq!(config.simulation.sample_size, SMALL_SAMPLE);
        assert!(config.validate().is_ok());
    }
}
