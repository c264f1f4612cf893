//! Mutation of one chromosome in place, clamped to the problem bounds.

use std::f64::consts::TAU;

use rand::Rng;

/// Gaussian step as a fraction of the bounds' width.
const GAUSSIAN_SIGMA_FRACTION: f64 = 0.1;

/// Mutation operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mutation {
    /// Add zero-mean Gaussian noise.
    #[default]
    Gaussian,
    /// Redraw the gene uniformly within bounds.
    UniformReset,
}

impl Mutation {
    /// Every operator, in display order.
    pub const ALL: [Self; 2] = [Self::Gaussian, Self::UniformReset];

    /// Setting value naming this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::UniformReset => "uniform-reset",
        }
    }

    /// Inverse of [`Self::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Mutate each gene with probability `1 / len`.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply<R: Rng + ?Sized>(self, rng: &mut R, genes: &mut [f64], bounds: (f64, f64)) {
        if genes.is_empty() {
            return;
        }
        let (lo, hi) = bounds;
        let indpb = 1.0 / genes.len() as f64;
        let sigma = (hi - lo) * GAUSSIAN_SIGMA_FRACTION;
        for gene in genes.iter_mut() {
            if !rng.random_bool(indpb) {
                continue;
            }
            *gene = match self {
                Self::Gaussian => (*gene + sigma * standard_normal(rng)).clamp(lo, hi),
                Self::UniformReset => rng.random_range(lo..=hi),
            };
        }
    }
}

/// Box-Muller sample from N(0, 1).
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // u1 in (0, 1] keeps ln finite
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
