//! Generational GA loop.
//!
//! # Algorithm
//!
//! 1. Create and evaluate a random population.
//! 2. Each generation: sort by fitness (descending), copy the elite
//!    unchanged, then fill the rest with tournament-selected parents,
//!    crossover (with probability `crossover_rate`) and mutation (with
//!    probability `mutation_rate`).
//! 3. Stop after the configured number of generations, or earlier when
//!    cancelled, and return the best individual of the last population.
//!
//! Because elites survive unchanged, the best fitness never decreases
//! from one generation to the next.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::GaConfig;
use crate::strategy::CancelToken;

/// A member of the population.
pub trait Individual: Clone {
    /// Current fitness (higher = better).
    fn fitness(&self) -> f64;

    /// Stores an evaluated fitness.
    fn set_fitness(&mut self, fitness: f64);
}

/// Problem definition driven by [`GaRunner`].
pub trait GaProblem {
    type Individual: Individual;

    /// Creates a random individual.
    fn create_individual<R: Rng>(&self, rng: &mut R) -> Self::Individual;

    /// Fitness of an individual (higher = better).
    fn evaluate(&self, individual: &Self::Individual) -> f64;

    /// Produces offspring from two parents.
    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        parent2: &Self::Individual,
        rng: &mut R,
    ) -> Vec<Self::Individual>;

    /// Mutates an individual in place.
    fn mutate<R: Rng>(&self, individual: &mut Self::Individual, rng: &mut R);
}

/// Outcome of a GA run.
#[derive(Debug, Clone)]
pub struct GaOutcome<I> {
    /// Best individual of the final population.
    pub best: I,
    /// Its fitness.
    pub best_fitness: f64,
    /// Best fitness of the initial population and after every generation.
    pub history: Vec<f64>,
    /// Generations completed.
    pub generations: usize,
    /// Whether the run stopped on cancellation.
    pub cancelled: bool,
}

/// Runs a [`GaProblem`] under a [`GaConfig`].
pub struct GaRunner;

impl GaRunner {
    /// Runs to completion (or cancellation).
    ///
    /// Seeds its random source from `config.seed` when set.
    pub fn run<P: GaProblem>(problem: &P, config: &GaConfig, cancel: &CancelToken) -> GaOutcome<P::Individual> {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self::run_with_rng(problem, config, cancel, &mut rng)
    }

    /// Runs with a caller-supplied random source.
    pub fn run_with_rng<P: GaProblem, R: Rng>(
        problem: &P,
        config: &GaConfig,
        cancel: &CancelToken,
        rng: &mut R,
    ) -> GaOutcome<P::Individual> {
        let size = config.population_size.max(1);
        let elite_count = ((size as f64 * config.elitism_rate).round() as usize).clamp(1, size);

        let mut population: Vec<P::Individual> = (0..size)
            .map(|_| {
                let mut ind = problem.create_individual(rng);
                ind.set_fitness(problem.evaluate(&ind));
                ind
            })
            .collect();
        sort_descending(&mut population);

        let mut history = vec![population[0].fitness()];
        let mut generations = 0;
        let mut cancelled = false;

        for generation in 0..config.generations {
            if cancel.is_cancelled() {
                warn!(generation, "genetic search cancelled, returning best so far");
                cancelled = true;
                break;
            }

            let mut next: Vec<P::Individual> = population[..elite_count].to_vec();
            while next.len() < size {
                let p1 = tournament(&population, config.tournament_size, rng);
                let p2 = tournament(&population, config.tournament_size, rng);

                let children = if rng.random_bool(config.crossover_rate) {
                    problem.crossover(p1, p2, rng)
                } else {
                    vec![p1.clone(), p2.clone()]
                };

                for mut child in children {
                    if next.len() >= size {
                        break;
                    }
                    if rng.random_bool(config.mutation_rate) {
                        problem.mutate(&mut child, rng);
                    }
                    child.set_fitness(problem.evaluate(&child));
                    next.push(child);
                }
            }

            sort_descending(&mut next);
            population = next;
            generations = generation + 1;
            history.push(population[0].fitness());

            if generation % 50 == 0 {
                debug!(generation, best = population[0].fitness(), "generation complete");
            }
        }

        let best = population[0].clone();
        GaOutcome {
            best_fitness: best.fitness(),
            best,
            history,
            generations,
            cancelled,
        }
    }
}

fn sort_descending<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
}

/// Samples `k` random individuals (with replacement) and returns the fittest.
fn tournament<'a, I: Individual, R: Rng>(population: &'a [I], k: usize, rng: &mut R) -> &'a I {
    let mut best = &population[rng.random_range(0..population.len())];
    for _ in 1..k.max(1) {
        let candidate = &population[rng.random_range(0..population.len())];
        if candidate.fitness() > best.fitness() {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maximize the number of set bits in a fixed-width vector.
    #[derive(Debug, Clone)]
    struct Bits {
        bits: Vec<bool>,
        fitness: f64,
    }

    impl Individual for Bits {
        fn fitness(&self) -> f64 {
            self.fitness
        }
        fn set_fitness(&mut self, fitness: f64) {
            self.fitness = fitness;
        }
    }

    struct OneMax;

    impl GaProblem for OneMax {
        type Individual = Bits;

        fn create_individual<R: Rng>(&self, rng: &mut R) -> Bits {
            Bits {
                bits: (0..16).map(|_| rng.random_bool(0.5)).collect(),
                fitness: f64::NEG_INFINITY,
            }
        }

        fn evaluate(&self, individual: &Bits) -> f64 {
            individual.bits.iter().filter(|&&b| b).count() as f64
        }

        fn crossover<R: Rng>(&self, a: &Bits, b: &Bits, rng: &mut R) -> Vec<Bits> {
            let cut = rng.random_range(0..a.bits.len());
            let mut c = a.clone();
            c.bits[cut..].copy_from_slice(&b.bits[cut..]);
            vec![c]
        }

        fn mutate<R: Rng>(&self, individual: &mut Bits, rng: &mut R) {
            let i = rng.random_range(0..individual.bits.len());
            individual.bits[i] = !individual.bits[i];
        }
    }

    fn config() -> GaConfig {
        GaConfig::default()
            .with_population_size(20)
            .with_generations(40)
            .with_seed(42)
    }

    #[test]
    fn test_history_is_monotonic() {
        let outcome = GaRunner::run(&OneMax, &config(), &CancelToken::new());
        assert_eq!(outcome.history.len(), 41);
        assert!(outcome.history.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(outcome.best_fitness, *outcome.history.last().unwrap());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let a = GaRunner::run(&OneMax, &config(), &CancelToken::new());
        let b = GaRunner::run(&OneMax, &config(), &CancelToken::new());
        assert_eq!(a.best.bits, b.best.bits);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_cancelled_returns_initial_best() {
        let token = CancelToken::new();
        token.cancel();
        let outcome = GaRunner::run(&OneMax, &config(), &token);
        assert!(outcome.cancelled);
        assert_eq!(outcome.generations, 0);
        assert_eq!(outcome.history.len(), 1);
        assert!(outcome.best_fitness.is_finite());
    }

    #[test]
    fn test_improves_on_onemax() {
        let outcome = GaRunner::run(&OneMax, &config(), &CancelToken::new());
        assert!(outcome.best_fitness >= outcome.history[0]);
        assert!(outcome.best_fitness >= 11.0);
    }
}
