//! Engine construction errors.

use thiserror::Error;

/// Failure to build an engine from user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No problem is known under this name.
    #[error("unknown problem '{0}' (expected sphere or rastrigin)")]
    UnknownProblem(String),

    /// A problem needs at least one dimension.
    #[error("dimensions must be at least 1")]
    NoDimensions,

    /// A population needs at least two individuals to mate.
    #[error("population size {0} out of range 2..=1000")]
    PopulationSize(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            EngineError::UnknownProblem("tsp".into()).to_string(),
            "unknown problem 'tsp' (expected sphere or rastrigin)"
        );
        assert_eq!(
            EngineError::PopulationSize(1).to_string(),
            "population size 1 out of range 2..=1000"
        );
    }
}
