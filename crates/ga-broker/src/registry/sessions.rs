//! Named sessions, each holding one opaque state instance.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge};
use parking_lot::RwLock;
use tracing::info;

use crate::metrics::{SESSIONS_ACTIVE, SESSIONS_CREATED_TOTAL, SESSIONS_DELETED_TOTAL};

/// Builds the state for a newly created session.
pub type StateFactory<S> = Arc<dyn Fn() -> S + Send + Sync>;

/// A named, shared state instance.
pub struct Session<S> {
    name: String,
    state: S,
    /// When the session was created.
    pub created_at: Instant,
}

impl<S> Session<S> {
    /// Session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The application state. The broker never looks inside it.
    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Concurrent map from session name to [`Session`].
///
/// Names iterate in sorted order.
pub struct SessionRegistry<S> {
    sessions: RwLock<BTreeMap<String, Arc<Session<S>>>>,
    factory: StateFactory<S>,
}

impl<S> SessionRegistry<S> {
    /// Create an empty registry that builds state with `factory`.
    pub fn new(factory: StateFactory<S>) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            factory,
        }
    }

    /// Return the session called `name`, creating it if absent.
    ///
    /// The factory runs while the write lock is held, so racing callers
    /// trigger at most one invocation per name and all observe the same
    /// session. The flag is `true` for the caller that created it.
    pub fn get_or_create(&self, name: &str) -> (Arc<Session<S>>, bool) {
        if let Some(existing) = self.sessions.read().get(name) {
            return (Arc::clone(existing), false);
        }

        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(name) {
            return (Arc::clone(existing), false);
        }
        let session = Arc::new(Session {
            name: name.to_owned(),
            state: (self.factory)(),
            created_at: Instant::now(),
        });
        let _ = sessions.insert(name.to_owned(), Arc::clone(&session));
        let live = sessions.len();
        drop(sessions);

        counter!(SESSIONS_CREATED_TOTAL).increment(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(SESSIONS_ACTIVE).set(live as f64);
        info!(session = name, "session created");
        (session, true)
    }

    /// Look up a session.
    pub fn get(&self, name: &str) -> Option<Arc<Session<S>>> {
        self.sessions.read().get(name).cloned()
    }

    /// Remove a session. Handlers already holding it run to completion.
    pub fn delete(&self, name: &str) -> Option<Arc<Session<S>>> {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(name);
        let live = sessions.len();
        drop(sessions);

        if removed.is_some() {
            counter!(SESSIONS_DELETED_TOTAL).increment(1);
            #[allow(clippy::cast_precision_loss)]
            gauge!(SESSIONS_ACTIVE).set(live as f64);
            info!(session = name, "session deleted");
        }
        removed
    }

    /// Snapshot of all session names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry() -> (SessionRegistry<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factory: StateFactory<usize> =
            Arc::new(move || counter.fetch_add(1, Ordering::SeqCst));
        (SessionRegistry::new(factory), calls)
    }

    #[test]
    fn creates_once_then_returns_existing() {
        let (reg, calls) = counting_registry();
        let (first, created) = reg.get_or_create("s1");
        assert!(created);
        let (second, created) = reg.get_or_create("s1");
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.name(), "s1");
    }

    #[test]
    fn each_name_gets_independent_state() {
        let (reg, calls) = counting_registry();
        let (a, _) = reg.get_or_create("a");
        let (b, _) = reg.get_or_create("b");
        assert_ne!(a.state(), b.state());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_create_invokes_factory_once() {
        let (reg, calls) = counting_registry();
        let reg = Arc::new(reg);
        let barrier = Arc::new(std::sync::Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let _ = barrier.wait();
                    reg.get_or_create("shared")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        let first = &results[0].0;
        assert!(results.iter().all(|(s, _)| Arc::ptr_eq(s, first)));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let (reg, _) = counting_registry();
        let _ = reg.get_or_create("s1");
        assert!(reg.delete("s1").is_some());
        assert!(reg.get("s1").is_none());
        assert!(reg.delete("s1").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn recreate_after_delete_runs_factory_again() {
        let (reg, calls) = counting_registry();
        let _ = reg.get_or_create("s1");
        let _ = reg.delete("s1");
        let (_, created) = reg.get_or_create("s1");
        assert!(created);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn list_names_is_sorted_snapshot() {
        let (reg, _) = counting_registry();
        for name in ["zeta", "alpha", "mid"] {
            let _ = reg.get_or_create(name);
        }
        assert_eq!(reg.list_names(), ["alpha", "mid", "zeta"]);
        assert_eq!(reg.len(), 3);
    }
}
