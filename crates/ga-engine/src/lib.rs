//! # ga-engine
//!
//! A real-valued genetic algorithm packaged as broker session state.
//!
//! Each session owns one [`GaState`]: a population evolving against a
//! [`Problem`], the tunable [`GaParams`], per-generation statistics and a
//! changelog of settings edits. [`register_commands`] installs the four
//! commands GA front ends speak (`info`, `run-one-gen`, `settings`,
//! `set-setting`) into a broker command table.

#![deny(unsafe_code)]

pub mod commands;
pub mod errors;
pub mod evolution;
pub mod individual;
pub mod operators;
pub mod problem;
pub mod settings;
pub mod state;

pub use commands::{WorkingStatus, register_commands};
pub use errors::EngineError;
pub use evolution::{ChangelogEntry, Evolution, GenStats};
pub use individual::Individual;
pub use problem::{Problem, ProblemKind, Rastrigin, Sphere};
pub use settings::GaParams;
pub use state::{GaFactory, GaState};
