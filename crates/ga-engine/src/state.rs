//! Session state and the factory that builds it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::errors::EngineError;
use crate::evolution::{DEFAULT_HISTORY_LIMIT, Evolution};
use crate::problem::Problem;
use crate::settings::{GaParams, POPULATION_RANGE};

/// Per-session GA state, shared by every connection in the session.
pub struct GaState {
    evolution: Mutex<Evolution>,
    /// Commands currently marked as work in progress.
    working: AtomicUsize,
}

impl GaState {
    /// Wrap an evolution.
    pub fn new(evolution: Evolution) -> Self {
        Self {
            evolution: Mutex::new(evolution),
            working: AtomicUsize::new(0),
        }
    }

    /// Run `f` with exclusive access to the evolution.
    pub fn with<R>(&self, f: impl FnOnce(&mut Evolution) -> R) -> R {
        f(&mut self.evolution.lock())
    }

    /// `"working"` while a long command runs, else `"idle"`.
    pub fn status(&self) -> &'static str {
        if self.is_working() { "working" } else { "idle" }
    }

    /// Whether any long command is in flight.
    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::Acquire) > 0
    }

    /// Mark work in progress until the guard drops.
    pub fn begin_work(&self) -> WorkGuard<'_> {
        let _ = self.working.fetch_add(1, Ordering::AcqRel);
        WorkGuard { state: self }
    }
}

/// Clears one unit of work on drop, including on unwind.
pub struct WorkGuard<'a> {
    state: &'a GaState,
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        let _ = self.state.working.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Builds an independent [`GaState`] for each new session.
#[derive(Debug)]
pub struct GaFactory {
    problem: Arc<dyn Problem>,
    params: GaParams,
    seed: Option<u64>,
    history_limit: usize,
    built: AtomicU64,
}

impl GaFactory {
    /// Factory for `problem` starting every session at `params`.
    pub fn new(problem: Arc<dyn Problem>, params: GaParams) -> Result<Self, EngineError> {
        let (lo, hi) = POPULATION_RANGE;
        if !(lo..=hi).contains(&params.population_size) {
            return Err(EngineError::PopulationSize(params.population_size));
        }
        Ok(Self {
            problem,
            params,
            seed: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            built: AtomicU64::new(0),
        })
    }

    /// Derive every session's RNG from `seed`, for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Populations each session keeps for `info`.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Build a fresh session state.
    pub fn build(&self) -> GaState {
        let n = self.built.fetch_add(1, Ordering::Relaxed);
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(n)),
            None => StdRng::from_os_rng(),
        };
        debug!(problem = self.problem.name(), session_seq = n, "building GA state");
        let evolution = Evolution::new(Arc::clone(&self.problem), self.params.clone(), rng)
            .with_history_limit(self.history_limit);
        GaState::new(evolution)
    }

    /// Sessions built so far.
    pub fn built(&self) -> u64 {
        self.built.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Sphere;
    use assert_matches::assert_matches;

    fn factory() -> GaFactory {
        GaFactory::new(Arc::new(Sphere::new(2)), GaParams::default()).unwrap()
    }

    #[test]
    fn rejects_bad_population() {
        let params = GaParams { population_size: 1, ..GaParams::default() };
        assert_matches!(
            GaFactory::new(Arc::new(Sphere::new(2)), params),
            Err(EngineError::PopulationSize(1))
        );
    }

    #[test]
    fn debug_names_the_problem() {
        let rendered = format!("{:?}", factory().with_seed(Some(3)));
        assert!(rendered.contains("Sphere"));
        assert!(rendered.contains("seed: Some(3)"));
    }

    #[test]
    fn sessions_are_independent() {
        let f = factory().with_seed(Some(1));
        let a = f.build();
        let b = f.build();
        let _ = a.with(Evolution::run_one_gen);
        assert_eq!(a.with(|e| e.generation()), 1);
        assert_eq!(b.with(|e| e.generation()), 0);
        assert_eq!(f.built(), 2);
    }

    #[test]
    fn seeded_factory_is_reproducible() {
        let one = factory().with_seed(Some(7)).build();
        let two = factory().with_seed(Some(7)).build();
        let pop = |s: &GaState| s.with(|e| e.population().to_vec());
        assert_eq!(pop(&one), pop(&two));
    }

    #[test]
    fn work_guard_tracks_status() {
        let state = factory().build();
        assert_eq!(state.status(), "idle");
        {
            let _outer = state.begin_work();
            let inner = state.begin_work();
            drop(inner);
            assert_eq!(state.status(), "working");
        }
        assert_eq!(state.status(), "idle");
    }

    #[test]
    fn work_guard_clears_on_panic() {
        let state = factory().build();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = state.begin_work();
            panic!("generation failed");
        }));
        assert!(result.is_err());
        assert!(!state.is_working());
    }
}
