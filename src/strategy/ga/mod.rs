//! Genetic search over production orderings.
//!
//! # Encoding
//!
//! Permutation chromosome: `genes[k]` is the work item produced k-th.
//! Every permutation is a valid ordering, so operators never need repair.
//!
//! # Fitness
//!
//! The day-accumulation score of [`ga_fitness`](crate::evaluate::ga_fitness),
//! which is cheap but blind to machine contention. The winning ordering is
//! realized by the same bucketer or allocator the exhaustive search uses.
//!
//! # Reference
//! Cheng, Gen & Tsujimura (1996), "A tutorial survey of job-shop scheduling
//! problems using genetic algorithms"

mod chromosome;
pub mod operators;
mod problem;
mod runner;

pub use chromosome::SequenceChromosome;
pub use operators::{CrossoverType, GeneticOperators, MutationType};
pub use problem::SequencingProblem;
pub use runner::{GaOutcome, GaProblem, GaRunner, Individual};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Plan, PlanningContext};
use crate::error::Result;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Genetic search tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generations to run.
    pub generations: usize,
    /// Probability of mutating a child.
    pub mutation_rate: f64,
    /// Probability of recombining a parent pair.
    pub crossover_rate: f64,
    /// Share of the population copied unchanged.
    pub elitism_rate: f64,
    /// Contestants per tournament.
    pub tournament_size: usize,
    /// Random seed; `None` draws from the OS.
    pub seed: Option<u64>,
    /// Crossover operator.
    pub crossover: CrossoverType,
    /// Mutation operator.
    pub mutation: MutationType,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 200,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            elitism_rate: 0.1,
            tournament_size: 5,
            seed: None,
            crossover: CrossoverType::default(),
            mutation: MutationType::default(),
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate;
        self
    }

    pub fn with_elitism_rate(mut self, rate: f64) -> Self {
        self.elitism_rate = rate;
        self
    }

    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_crossover(mut self, crossover: CrossoverType) -> Self {
        self.crossover = crossover;
        self
    }

    pub fn with_mutation(mut self, mutation: MutationType) -> Self {
        self.mutation = mutation;
        self
    }

    /// Operators selected by this configuration.
    pub fn operators(&self) -> GeneticOperators {
        GeneticOperators {
            crossover_type: self.crossover,
            mutation_type: self.mutation,
        }
    }

    pub(crate) fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut invalid = |message: String| {
            errors.push(ValidationError::new(ValidationErrorKind::InvalidParameter, message));
        };

        if self.population_size < 2 {
            invalid(format!("Population size must be at least 2, got {}", self.population_size));
        }
        if self.tournament_size == 0 {
            invalid("Tournament size must be at least 1".to_string());
        }
        for (name, rate) in [
            ("Mutation rate", self.mutation_rate),
            ("Crossover rate", self.crossover_rate),
            ("Elitism rate", self.elitism_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                invalid(format!("{name} must be within [0, 1], got {rate}"));
            }
        }
        errors
    }
}

pub(crate) fn search(ctx: &PlanningContext<'_>, config: &GaConfig) -> Result<Plan> {
    let problem = SequencingProblem::new(ctx.metrics(), ctx.capacity()).with_operators(config.operators());
    let outcome = GaRunner::run(&problem, config, ctx.cancel);

    debug!(
        generations = outcome.generations,
        initial = outcome.history.first().copied().unwrap_or_default(),
        best = outcome.best_fitness,
        cancelled = outcome.cancelled,
        "genetic search complete"
    );

    let realized = ctx.realize(&outcome.best.genes)?;
    Ok(Plan::Ordering(realized))
}
