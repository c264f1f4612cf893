//! The two shared registries: live connections and named sessions.

pub mod connections;
pub mod sessions;

pub use connections::ConnectionRegistry;
pub use sessions::{Session, SessionRegistry, StateFactory};
