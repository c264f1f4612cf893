//! One session's evolution: population, parameters and history.

use std::collections::VecDeque;
use std::sync::Arc;

use ga_core::CommandError;
use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::individual::{IdAllocator, Individual};
use crate::problem::Problem;
use crate::settings::{GaParams, SETTING_NAMES};

/// Populations kept for `info` by default, oldest dropped first.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Fitness summary of one generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GenStats {
    /// Lowest fitness.
    pub min: f64,
    /// Highest fitness.
    pub max: f64,
    /// Mean fitness.
    pub avg: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl GenStats {
    /// Summarize `population`; evaluated individuals only.
    #[allow(clippy::cast_precision_loss)]
    pub fn compile(population: &[Individual]) -> Self {
        let values: Vec<f64> = population.iter().filter_map(|i| i.fitness).collect();
        if values.is_empty() {
            return Self { min: 0.0, max: 0.0, avg: 0.0, std: 0.0 };
        }
        let n = values.len() as f64;
        let avg = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
        Self {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg,
            std: var.sqrt(),
        }
    }
}

/// A settings change, as reported to front ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChangelogEntry {
    /// Generation at which the change took effect; `-1` for initial values.
    pub generation: i64,
    /// Setting display name.
    pub setting: String,
    /// Value after the change.
    pub value: Value,
}

/// Evolution state owned by one session.
pub struct Evolution {
    problem: Arc<dyn Problem>,
    rng: StdRng,
    ids: IdAllocator,
    params: GaParams,
    population: Vec<Individual>,
    generation: u64,
    records: Vec<GenStats>,
    hall_of_fame: Option<Individual>,
    changelog: Vec<ChangelogEntry>,
    history: VecDeque<Vec<Individual>>,
    history_limit: usize,
}

impl Evolution {
    /// Seed a random, evaluated population of `params.population_size`.
    pub fn new(problem: Arc<dyn Problem>, params: GaParams, mut rng: StdRng) -> Self {
        let mut ids = IdAllocator::new();
        let (lo, hi) = problem.bounds();
        let population: Vec<Individual> = (0..params.population_size)
            .map(|_| {
                let genes = (0..problem.dimensions())
                    .map(|_| rng.random_range(lo..=hi))
                    .collect();
                let mut ind = Individual::new(ids.next_id(), genes);
                ind.fitness = Some(problem.evaluate(&ind.chromosome));
                ind
            })
            .collect();

        let changelog = SETTING_NAMES
            .iter()
            .filter_map(|&name| {
                params.value_of(name).map(|value| ChangelogEntry {
                    generation: -1,
                    setting: name.to_owned(),
                    value,
                })
            })
            .collect();

        let mut evolution = Self {
            problem,
            rng,
            ids,
            params,
            population,
            generation: 0,
            records: Vec::new(),
            hall_of_fame: None,
            changelog,
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        };
        evolution.update_hall_of_fame();
        evolution.remember_population();
        evolution
    }

    /// Keep at most `limit` populations for `info` (at least one).
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        while self.history.len() > self.history_limit {
            let _ = self.history.pop_front();
        }
        self
    }

    /// Advance one generation: age, select, vary, evaluate, replace.
    pub fn run_one_gen(&mut self) -> GenStats {
        for ind in &mut self.population {
            ind.age += 1;
        }

        let picked = self
            .params
            .selection
            .select(&mut self.rng, &self.population, self.params.population_size);
        let mut offspring: Vec<Individual> =
            picked.into_iter().map(|i| self.population[i].clone()).collect();

        let bounds = self.problem.bounds();
        for pair in offspring.chunks_exact_mut(2) {
            if !self.rng.random_bool(self.params.cxpb) {
                continue;
            }
            let parents = (pair[0].id, pair[1].id);
            let (left, right) = pair.split_at_mut(1);
            self.params
                .crossover
                .apply(&mut self.rng, &mut left[0].chromosome, &mut right[0].chromosome);
            for child in pair.iter_mut() {
                child.set_parents(self.ids.next_id(), parents);
            }
        }
        for ind in &mut offspring {
            if self.rng.random_bool(self.params.mutpb) {
                self.params
                    .mutation
                    .apply(&mut self.rng, &mut ind.chromosome, bounds);
                ind.set_mutated(self.ids.next_id());
            }
        }
        for ind in offspring.iter_mut().filter(|i| i.fitness.is_none()) {
            ind.fitness = Some(self.problem.evaluate(&ind.chromosome));
        }

        self.population = offspring;
        self.update_hall_of_fame();
        self.remember_population();

        let stats = GenStats::compile(&self.population);
        self.records.push(stats);
        self.generation += 1;
        debug!(
            generation = self.generation,
            min = stats.min,
            avg = stats.avg,
            "generation complete"
        );
        stats
    }

    /// Validate and apply a settings update, logging each change.
    pub fn apply_settings(&mut self, updates: &Map<String, Value>) -> Result<usize, CommandError> {
        let applied = self.params.apply(updates)?;
        let generation = i64::try_from(self.generation).unwrap_or(i64::MAX);
        for name in &applied {
            if let Some(value) = self.params.value_of(name) {
                self.changelog.push(ChangelogEntry {
                    generation,
                    setting: (*name).to_owned(),
                    value,
                });
            }
        }
        Ok(applied.len())
    }

    /// Headline figures shown above every view.
    pub fn general_stats(&self) -> Value {
        let mut stats = Map::new();
        let _ = stats.insert("Generation".into(), json!(self.generation.to_string()));
        let _ = stats.insert("Problem".into(), json!(self.problem.name()));
        if let Some(best) = self.hall_of_fame.as_ref().and_then(|b| b.fitness) {
            let _ = stats.insert("Best fitness".into(), json!(format!("{best:.6}")));
        }
        Value::Object(stats)
    }

    /// Everything a front end needs to draw the session.
    pub fn info(&self, status: &str) -> Value {
        let (lo, hi) = self.problem.bounds();
        json!({
            "general_stats": self.general_stats(),
            "all_stats": self.records,
            "status": status,
            "populations": self.history,
            "settings": self.params.describe(),
            "individual_encoding": {"encoding_type": "range", "range": [lo, hi]},
            "settings_changelog": self.changelog,
        })
    }

    /// Settings descriptor map.
    pub fn settings(&self) -> Value {
        self.params.describe()
    }

    /// Generations run so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current parameters.
    pub fn params(&self) -> &GaParams {
        &self.params
    }

    /// Current population.
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Fittest individual seen so far.
    pub fn hall_of_fame(&self) -> Option<&Individual> {
        self.hall_of_fame.as_ref()
    }

    /// Settings changes so far, initial values first.
    pub fn changelog(&self) -> &[ChangelogEntry] {
        &self.changelog
    }

    fn update_hall_of_fame(&mut self) {
        let best = self
            .population
            .iter()
            .min_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
        if let Some(best) = best {
            let improved = self
                .hall_of_fame
                .as_ref()
                .is_none_or(|hof| best.sort_key() < hof.sort_key());
            if improved {
                self.hall_of_fame = Some(best.clone());
            }
        }
    }

    fn remember_population(&mut self) {
        self.history.push_back(self.population.clone());
        while self.history.len() > self.history_limit {
            let _ = self.history.pop_front();
        }
    }
}
