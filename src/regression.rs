//! Piecewise ordinary least squares
//!
//! One independent straight-line fit per side of the cutoff.

use serde::{Deserialize, Serialize};

use crate::synth::Sample;

/// Straight line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Neutral fit returned for degenerate groups.
    pub const FLAT: LinearFit = LinearFit {
        slope: 0.0,
        intercept: 0.0,
    };

    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

impl Default for LinearFit {
    fn default() -> Self {
        Self::FLAT
    }
}

/// OLS fit of `(x, y)` pairs.
///
/// Sums are taken around the means so the fit does not depend on where the
/// running variable sits on the axis. Returns [`LinearFit::FLAT`] for fewer
/// than two points, for zero variance in `x` (spread within rounding of the
/// mean), and whenever a coefficient would not be finite.
pub fn fit_group<I>(points: I) -> LinearFit
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let points: Vec<(f64, f64)> = points.into_iter().collect();
    let n = points.len();
    if n < 2 {
        return LinearFit::FLAT;
    }

    let n_f = n as f64;
    let x_mean = points.iter().map(|&(x, _)| x).sum::<f64>() / n_f;
    let y_mean = points.iter().map(|&(_, y)| y).sum::<f64>() / n_f;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &(x, y) in &points {
        let dx = x - x_mean;
        sxx += dx * dx;
        sxy += dx * (y - y_mean);
    }

    // identical x leave only a few ulps of the mean as residue
    let residue = 4.0 * f64::EPSILON * x_mean.abs();
    let tolerance = n_f * residue * residue;
    if !sxx.is_finite() || sxx <= tolerance {
        return LinearFit::FLAT;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    if !slope.is_finite() || !intercept.is_finite() {
        return LinearFit::FLAT;
    }

    LinearFit { slope, intercept }
}

/// The two per-side fits of one dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseFit {
    pub control: LinearFit,
    pub treated: LinearFit,
}

impl PiecewiseFit {
    /// Gap between the treated and control lines evaluated at `cutoff`.
    pub fn discontinuity(&self, cutoff: f64) -> f64 {
        self.treated.predict(cutoff) - self.control.predict(cutoff)
    }

    /// Fit that applies on the side of `x`.
    pub fn side(&self, is_treated: bool) -> &LinearFit {
        if is_treated {
            &self.treated
        } else {
            &self.control
        }
    }
}

/// Partition by treatment status and fit each side on its own points only.
pub fn fit_piecewise(samples: &[Sample]) -> PiecewiseFit {
    let side = |treated: bool| {
        fit_group(
            samples
                .iter()
                .filter(|s| s.is_treated == treated)
                .map(|s| (s.x, s.y)),
        )
    };

    PiecewiseFit {
        control: side(false),
        treated: side(true),
    }
}
