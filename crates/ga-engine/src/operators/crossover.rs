//! Recombination of two parents in place.

use rand::Rng;

/// `alpha` for blend crossover.
const BLEND_ALPHA: f64 = 0.5;
/// Per-gene swap probability for uniform crossover.
const UNIFORM_SWAP: f64 = 0.5;

/// Crossover operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Crossover {
    /// Per-gene random blend, may step outside the parents.
    #[default]
    Blend,
    /// Swap the tails after one random cut.
    OnePoint,
    /// Swap each gene with probability one half.
    Uniform,
}

impl Crossover {
    /// Every operator, in display order.
    pub const ALL: [Self; 3] = [Self::Blend, Self::OnePoint, Self::Uniform];

    /// Setting value naming this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blend => "blend",
            Self::OnePoint => "one-point",
            Self::Uniform => "uniform",
        }
    }

    /// Inverse of [`Self::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Recombine `a` and `b` in place. Both must have the same length.
    pub fn apply<R: Rng + ?Sized>(self, rng: &mut R, a: &mut [f64], b: &mut [f64]) {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Self::Blend => {
                for (x, y) in a.iter_mut().zip(b.iter_mut()) {
                    let gamma = (1.0 + 2.0 * BLEND_ALPHA) * rng.random::<f64>() - BLEND_ALPHA;
                    let (x0, y0) = (*x, *y);
                    *x = (1.0 - gamma) * x0 + gamma * y0;
                    *y = gamma * x0 + (1.0 - gamma) * y0;
                }
            }
            Self::OnePoint => {
                let len = a.len().min(b.len());
                if len < 2 {
                    return;
                }
                let cut = rng.random_range(1..len);
                a[cut..len].swap_with_slice(&mut b[cut..len]);
            }
            Self::Uniform => {
                for (x, y) in a.iter_mut().zip(b.iter_mut()) {
                    if rng.random_bool(UNIFORM_SWAP) {
                        std::mem::swap(x, y);
                    }
                }
            }
        }
    }
}
