//! Individuals and their lineage.

use serde::Serialize;

/// One candidate solution, as shown to front ends.
///
/// Lineage fields describe how the individual came to be: crossover
/// children carry both parent ids, mutants carry `mutated = true`, and
/// initial individuals carry neither. `age` counts generations survived.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Individual {
    /// Per-session unique id.
    pub id: u64,
    /// Genes.
    pub chromosome: Vec<f64>,
    /// Objective value; `None` until evaluated.
    pub fitness: Option<f64>,
    /// Generations survived.
    pub age: u32,
    /// First parent when produced by crossover.
    pub parent1_id: Option<u64>,
    /// Second parent when produced by crossover.
    pub parent2_id: Option<u64>,
    /// Whether the last variation applied was a mutation.
    pub mutated: bool,
}

impl Individual {
    /// A fresh, unevaluated individual with no lineage.
    pub fn new(id: u64, chromosome: Vec<f64>) -> Self {
        Self {
            id,
            chromosome,
            fitness: None,
            age: 0,
            parent1_id: None,
            parent2_id: None,
            mutated: false,
        }
    }

    /// Rebrand as a crossover child of `parents`.
    pub fn set_parents(&mut self, id: u64, parents: (u64, u64)) {
        self.id = id;
        self.age = 0;
        self.parent1_id = Some(parents.0);
        self.parent2_id = Some(parents.1);
        self.mutated = false;
        self.fitness = None;
    }

    /// Rebrand as a mutant.
    pub fn set_mutated(&mut self, id: u64) {
        self.id = id;
        self.age = 0;
        self.parent1_id = None;
        self.parent2_id = None;
        self.mutated = true;
        self.fitness = None;
    }

    /// Fitness for ordering, unevaluated last.
    pub fn sort_key(&self) -> f64 {
        self.fitness.unwrap_or(f64::INFINITY)
    }
}

/// Hands out lineage ids, starting at 1.
#[derive(Debug)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Allocator whose first id is 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Take the next id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
