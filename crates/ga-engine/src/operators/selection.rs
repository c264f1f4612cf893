//! Parent selection. Returns indices into the population, repeats allowed.

use rand::Rng;

use crate::individual::Individual;

/// Contestants per tournament.
const TOURNAMENT_SIZE: usize = 3;

/// Selection operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Selection {
    /// Best of a few random contestants, `k` times.
    #[default]
    Tournament,
    /// The `k` fittest, cycling when `k` exceeds the population.
    Best,
    /// Uniform with replacement.
    Random,
}

impl Selection {
    /// Every operator, in display order.
    pub const ALL: [Self; 3] = [Self::Tournament, Self::Best, Self::Random];

    /// Setting value naming this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tournament => "tournament",
            Self::Best => "best",
            Self::Random => "random",
        }
    }

    /// Inverse of [`Self::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Pick `k` indices from `population`; empty when it is empty.
    pub fn select<R: Rng + ?Sized>(self, rng: &mut R, population: &[Individual], k: usize) -> Vec<usize> {
        let n = population.len();
        if n == 0 {
            return Vec::new();
        }
        match self {
            Self::Tournament => (0..k)
                .map(|_| {
                    (0..TOURNAMENT_SIZE)
                        .map(|_| rng.random_range(0..n))
                        .min_by(|&a, &b| population[a].sort_key().total_cmp(&population[b].sort_key()))
                        .unwrap_or(0)
                })
                .collect(),
            Self::Best => {
                let mut ranked: Vec<usize> = (0..n).collect();
                ranked.sort_by(|&a, &b| population[a].sort_key().total_cmp(&population[b].sort_key()));
                ranked.into_iter().cycle().take(k).collect()
            }
            Self::Random => (0..k).map(|_| rng.random_range(0..n)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn population(fitness: &[f64]) -> Vec<Individual> {
        fitness
            .iter()
            .zip(1..)
            .map(|(&f, id)| {
                let mut ind = Individual::new(id, vec![f]);
                ind.fitness = Some(f);
                ind
            })
            .collect()
    }

    #[test]
    fn best_ranks_lowest_first_and_cycles() {
        let pop = population(&[3.0, 1.0, 2.0]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Selection::Best.select(&mut rng, &pop, 2), [1, 2]);
        assert_eq!(Selection::Best.select(&mut rng, &pop, 5), [1, 2, 0, 1, 2]);
    }

    #[test]
    fn every_operator_returns_k_valid_indices() {
        let pop = population(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        let mut rng = StdRng::seed_from_u64(9);
        for op in Selection::ALL {
            let picked = op.select(&mut rng, &pop, 12);
            assert_eq!(picked.len(), 12, "{}", op.as_str());
            assert!(picked.iter().all(|&i| i < pop.len()));
        }
    }

    #[test]
    fn tournament_favours_the_fittest() {
        let pop = population(&[9.0, 8.0, 7.0, 6.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(5);
        let picked = Selection::Tournament.select(&mut rng, &pop, 1000);
        let best = picked.iter().filter(|&&i| i == 4).count();
        // P(best in a 3-way tournament of 5) is about 0.49
        assert!(best > 350, "best picked {best} times");
    }

    #[test]
    fn empty_population_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Selection::Random.select(&mut rng, &[], 4).is_empty());
    }
}
