//! Synthetic data generation
//!
//! Scatters observations uniformly over `[cutoff - 50, cutoff + 50)`, runs
//! them through the underlying response curve, adds the treatment jump on
//! the treated side and finishes with additive noise.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::config::{SimulationConfig, MAX_SAMPLE_SIZE};

/// Half-width of the running-variable window around the cutoff.
pub const HALF_WINDOW: f64 = 50.0;
/// Outcome level of the underlying curve at the cutoff.
pub const BASELINE: f64 = 50.0;
/// Multiplier applied to `noise_level` for the width of the uniform noise.
pub const NOISE_SCALE: f64 = 5.0;

/// Source of the random draws consumed by the synthesizer.
pub trait UnitSource {
    /// Uniform draw on [0, 1).
    fn next_unit(&mut self) -> f64;

    /// Standard normal draw (Box-Muller over two unit draws).
    fn next_standard_normal(&mut self) -> f64 {
        let u1 = self.next_unit();
        let u2 = self.next_unit();
        // 1 - u keeps the log argument in (0, 1]
        let radius = (-2.0 * (1.0 - u1).ln()).sqrt();
        radius * (std::f64::consts::TAU * u2).cos()
    }
}

/// Adapter from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> UnitSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn next_standard_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.0)
    }
}

/// Replays a fixed list of unit draws, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }
}

impl UnitSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.5;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}

/// Shape of the additive noise term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    /// `(U - 0.5) * noise_level * 5`
    #[default]
    Uniform,
    /// Zero-mean normal with the same variance as `Uniform`
    Gaussian,
}

impl NoiseModel {
    pub fn draw(&self, noise_level: f64, source: &mut (impl UnitSource + ?Sized)) -> f64 {
        let width = noise_level * NOISE_SCALE;
        match self {
            NoiseModel::Uniform => (source.next_unit() - 0.5) * width,
            NoiseModel::Gaussian => source.next_standard_normal() * width / 12f64.sqrt(),
        }
    }
}

/// One generated unit before any fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Generation order, stable only within one call
    pub id: usize,
    /// Running variable
    pub x: f64,
    /// Outcome
    pub y: f64,
    pub is_treated: bool,
}

/// Noise-free, pre-jump response at `x`.
pub fn underlying(config: &SimulationConfig, x: f64) -> f64 {
    let rel_x = x - config.cutoff;
    BASELINE + config.slope * rel_x + config.curvature * 0.01 * rel_x * rel_x
}

/// Synthetic data generator
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesizer {
    noise_model: NoiseModel,
}

impl Synthesizer {
    pub fn new(noise_model: NoiseModel) -> Self {
        Self { noise_model }
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise_model
    }

    /// Generate `sample_size` samples sorted ascending by `x`.
    ///
    /// Each iteration draws `x` first, then the noise.
    pub fn generate(
        &self,
        config: &SimulationConfig,
        source: &mut (impl UnitSource + ?Sized),
    ) -> Vec<Sample> {
        // unvalidated sizes grow the vector on demand instead of preallocating
        let mut samples = Vec::with_capacity(config.sample_size.min(MAX_SAMPLE_SIZE));

        for id in 0..config.sample_size {
            let x = config.cutoff + (source.next_unit() * 2.0 * HALF_WINDOW - HALF_WINDOW);
            let is_treated = x >= config.cutoff;

            let mut y = underlying(config, x);
            if is_treated {
                y += config.effect_size;
            }
            y += self.noise_model.draw(config.noise_level, &mut *source);

            samples.push(Sample {
                id,
                x,
                y,
                is_treated,
            });
        }

        // stable, so equal x keep generation order
        samples.sort_by(|a, b| a.x.total_cmp(&b.x));
        samples
    }
}

/// Uniform-noise generation from any `rand` generator.
pub fn generate<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Vec<Sample> {
    Synthesizer::default().generate(config, &mut RngSource(rng))
}

/// Reproducible generator for seeded runs.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
