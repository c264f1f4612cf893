//! Tunable GA parameters and their front-end descriptors.
//!
//! Front ends edit settings by display name. An update naming several
//! settings is validated as a whole against a copy and committed only if
//! every value is acceptable.

use ga_core::CommandError;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::operators::{Crossover, Mutation, Selection};

/// Display name of the crossover probability.
pub const CROSSOVER_PROBABILITY: &str = "Crossover probability";
/// Display name of the mutation probability.
pub const MUTATION_PROBABILITY: &str = "Mutation probability";
/// Display name of the population size.
pub const POPULATION_SIZE: &str = "Population size";
/// Display name of the crossover operator.
pub const CROSSOVER: &str = "Crossover";
/// Display name of the mutation operator.
pub const MUTATION: &str = "Mutation";
/// Display name of the selection operator.
pub const SELECTION: &str = "Selection";

/// Every setting, in changelog order.
pub const SETTING_NAMES: [&str; 6] = [
    CROSSOVER_PROBABILITY,
    MUTATION_PROBABILITY,
    POPULATION_SIZE,
    CROSSOVER,
    MUTATION,
    SELECTION,
];

/// Smallest and largest population.
pub const POPULATION_RANGE: (usize, usize) = (2, 1000);

/// Parameters of one evolution.
#[derive(Clone, Debug, PartialEq)]
pub struct GaParams {
    /// Probability that a pair of offspring is recombined.
    pub cxpb: f64,
    /// Probability that an offspring is mutated.
    pub mutpb: f64,
    /// Offspring selected per generation.
    pub population_size: usize,
    /// Recombination operator.
    pub crossover: Crossover,
    /// Mutation operator.
    pub mutation: Mutation,
    /// Parent selection operator.
    pub selection: Selection,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            cxpb: 0.7,
            mutpb: 0.2,
            population_size: 100,
            crossover: Crossover::default(),
            mutation: Mutation::default(),
            selection: Selection::default(),
        }
    }
}

impl GaParams {
    /// Current value of the setting called `name`.
    pub fn value_of(&self, name: &str) -> Option<Value> {
        Some(match name {
            CROSSOVER_PROBABILITY => json!(self.cxpb),
            MUTATION_PROBABILITY => json!(self.mutpb),
            POPULATION_SIZE => json!(self.population_size),
            CROSSOVER => json!(self.crossover.as_str()),
            MUTATION => json!(self.mutation.as_str()),
            SELECTION => json!(self.selection.as_str()),
            _ => return None,
        })
    }

    /// Descriptor map sent by the `settings` command.
    pub fn describe(&self) -> Value {
        let probability = |value: f64| {
            json!({"type": "number", "value": value, "range": [0.0, 1.0], "min_increment": 0.1})
        };
        let choice = |value: &str, values: Vec<&str>| {
            json!({"type": "string", "value": value, "values": values})
        };

        let mut out = Map::new();
        let _ = out.insert(CROSSOVER_PROBABILITY.into(), probability(self.cxpb));
        let _ = out.insert(MUTATION_PROBABILITY.into(), probability(self.mutpb));
        let _ = out.insert(
            POPULATION_SIZE.into(),
            json!({
                "type": "number",
                "value": self.population_size,
                "range": [POPULATION_RANGE.0, POPULATION_RANGE.1],
                "min_increment": 1
            }),
        );
        let _ = out.insert(
            CROSSOVER.into(),
            choice(self.crossover.as_str(), Crossover::ALL.map(Crossover::as_str).to_vec()),
        );
        let _ = out.insert(
            MUTATION.into(),
            choice(self.mutation.as_str(), Mutation::ALL.map(Mutation::as_str).to_vec()),
        );
        let _ = out.insert(
            SELECTION.into(),
            choice(self.selection.as_str(), Selection::ALL.map(Selection::as_str).to_vec()),
        );
        Value::Object(out)
    }

    /// Apply `updates` all-or-nothing.
    ///
    /// Returns the names that were applied, in request order. Unknown names
    /// are skipped; any invalid value rejects the whole update and leaves
    /// `self` untouched.
    pub fn apply(&mut self, updates: &Map<String, Value>) -> Result<Vec<&'static str>, CommandError> {
        let mut next = self.clone();
        let mut applied = Vec::with_capacity(updates.len());

        for (name, value) in updates {
            let Some(&known) = SETTING_NAMES.iter().find(|n| **n == name.as_str()) else {
                debug!(setting = %name, "unknown setting skipped");
                continue;
            };
            match known {
                CROSSOVER_PROBABILITY => next.cxpb = probability(known, value)?,
                MUTATION_PROBABILITY => next.mutpb = probability(known, value)?,
                POPULATION_SIZE => next.population_size = population_size(value)?,
                CROSSOVER => next.crossover = choice(known, value, Crossover::parse)?,
                MUTATION => next.mutation = choice(known, value, Mutation::parse)?,
                SELECTION => next.selection = choice(known, value, Selection::parse)?,
                _ => continue,
            }
            applied.push(known);
        }

        *self = next;
        Ok(applied)
    }
}

fn probability(name: &str, value: &Value) -> Result<f64, CommandError> {
    match value.as_f64() {
        Some(p) if (0.0..=1.0).contains(&p) => Ok(p),
        _ => Err(CommandError::Rejected(format!("{name} must be a number in 0..1, got {value}"))),
    }
}

fn population_size(value: &Value) -> Result<usize, CommandError> {
    let (lo, hi) = POPULATION_RANGE;
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| (lo..=hi).contains(n))
        .ok_or_else(|| {
            CommandError::Rejected(format!(
                "{POPULATION_SIZE} must be an integer in {lo}..{hi}, got {value}"
            ))
        })
}

fn choice<T>(name: &str, value: &Value, parse: fn(&str) -> Option<T>) -> Result<T, CommandError> {
    value
        .as_str()
        .and_then(parse)
        .ok_or_else(|| CommandError::Rejected(format!("{name} does not accept {value}")))
}
