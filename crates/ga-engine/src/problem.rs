//! Objective functions. All problems are minimized.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::EngineError;

/// A real-valued minimization problem over a box.
pub trait Problem: fmt::Debug + Send + Sync + 'static {
    /// Short identifier, e.g. `"sphere"`.
    fn name(&self) -> &'static str;
    /// Genes per individual.
    fn dimensions(&self) -> usize;
    /// Inclusive gene bounds, shared by every dimension.
    fn bounds(&self) -> (f64, f64);
    /// Objective value; lower is better.
    fn evaluate(&self, genes: &[f64]) -> f64;
}

/// `f(x) = Σ xᵢ²`, minimum 0 at the origin.
#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    dimensions: usize,
}

impl Sphere {
    /// Sphere over `dimensions` genes in `[-5.12, 5.12]`.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Problem for Sphere {
    fn name(&self) -> &'static str {
        "sphere"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.12, 5.12)
    }

    fn evaluate(&self, genes: &[f64]) -> f64 {
        genes.iter().map(|x| x * x).sum()
    }
}

/// `f(x) = 10n + Σ (xᵢ² − 10 cos 2πxᵢ)`, minimum 0 at the origin.
#[derive(Clone, Copy, Debug)]
pub struct Rastrigin {
    dimensions: usize,
}

impl Rastrigin {
    /// Rastrigin over `dimensions` genes in `[-5.12, 5.12]`.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Problem for Rastrigin {
    fn name(&self) -> &'static str {
        "rastrigin"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.12, 5.12)
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, genes: &[f64]) -> f64 {
        10.0 * genes.len() as f64
            + genes
                .iter()
                .map(|x| x * x - 10.0 * (2.0 * PI * x).cos())
                .sum::<f64>()
    }
}

/// Problems selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProblemKind {
    /// [`Sphere`].
    #[default]
    Sphere,
    /// [`Rastrigin`].
    Rastrigin,
}

impl ProblemKind {
    /// Instantiate with `dimensions` genes.
    pub fn build(self, dimensions: usize) -> Result<Arc<dyn Problem>, EngineError> {
        if dimensions == 0 {
            return Err(EngineError::NoDimensions);
        }
        Ok(match self {
            Self::Sphere => Arc::new(Sphere::new(dimensions)),
            Self::Rastrigin => Arc::new(Rastrigin::new(dimensions)),
        })
    }

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Rastrigin => "rastrigin",
        }
    }
}

impl FromStr for ProblemKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sphere" => Ok(Self::Sphere),
            "rastrigin" => Ok(Self::Rastrigin),
            _ => Err(EngineError::UnknownProblem(s.to_owned())),
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn sphere_values() {
        let p = Sphere::new(3);
        assert!(p.evaluate(&[0.0, 0.0, 0.0]).abs() < f64::EPSILON);
        assert!((p.evaluate(&[1.0, 2.0, -2.0]) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn rastrigin_values() {
        let p = Rastrigin::new(2);
        assert!(p.evaluate(&[0.0, 0.0]).abs() < 1e-12);
        // integer points: cos term is 1, so f = Σ x²
        assert!((p.evaluate(&[1.0, -2.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Sphere".parse::<ProblemKind>().unwrap(), ProblemKind::Sphere);
        assert_eq!("rastrigin".parse::<ProblemKind>().unwrap(), ProblemKind::Rastrigin);
        assert_matches!("tsp".parse::<ProblemKind>(), Err(EngineError::UnknownProblem(name)) if name == "tsp");
    }

    #[test]
    fn build_checks_dimensions() {
        assert_matches!(ProblemKind::Sphere.build(0), Err(EngineError::NoDimensions));
        let p = ProblemKind::Rastrigin.build(4).unwrap();
        assert_eq!(p.name(), "rastrigin");
        assert_eq!(p.dimensions(), 4);
    }

    #[test]
    fn trait_objects_are_debuggable() {
        let p = ProblemKind::Sphere.build(2).unwrap();
        assert_eq!(format!("{p:?}"), "Sphere { dimensions: 2 }");
    }
}
