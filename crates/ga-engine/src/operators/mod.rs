//! Variation and selection operators, selectable by name at runtime.

pub mod crossover;
pub mod mutation;
pub mod selection;

pub use crossover::Crossover;
pub use mutation::Mutation;
pub use selection::Selection;
