//! Production sequencing as a GA problem.
//!
//! Fitness is the day-accumulation score from
//! [`ga_fitness`](crate::evaluate::ga_fitness): it ignores machine
//! contention, so the winner is realized afterwards by the run's own
//! bucketer or allocator.

use rand::Rng;

use super::chromosome::SequenceChromosome;
use super::operators::GeneticOperators;
use super::runner::GaProblem;
use crate::evaluate::ga_fitness;
use crate::normalize::OrderMetrics;

/// Orders work items to maximize on-time delivery.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_production::models::{FactoryConfig, WorkItem};
/// use u_production::normalize::normalize;
/// use u_production::strategy::ga::{GaConfig, GaRunner, SequencingProblem};
/// use u_production::strategy::CancelToken;
///
/// let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// let items = vec![
///     WorkItem::per_unit("A", 16, NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(), 1.0),
///     WorkItem::per_unit("B", 8, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(), 1.0),
/// ];
/// let work = normalize(&items, &FactoryConfig::new(8.0), today).unwrap();
///
/// let problem = SequencingProblem::new(&work.metrics, 8.0);
/// let config = GaConfig::default().with_population_size(20).with_generations(10).with_seed(1);
/// let outcome = GaRunner::run(&problem, &config, &CancelToken::new());
/// assert_eq!(outcome.best.genes, vec![1, 0]);
/// ```
#[derive(Debug, Clone)]
pub struct SequencingProblem<'a> {
    metrics: &'a [OrderMetrics],
    capacity: f64,
    operators: GeneticOperators,
}

impl<'a> SequencingProblem<'a> {
    /// Creates a problem over normalized work and a daily capacity (hours).
    pub fn new(metrics: &'a [OrderMetrics], capacity: f64) -> Self {
        Self {
            metrics,
            capacity,
            operators: GeneticOperators::default(),
        }
    }

    /// Sets the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// Fitness of an ordering.
    pub fn fitness_of(&self, genes: &[usize]) -> f64 {
        ga_fitness(self.metrics, genes, self.capacity)
    }
}

impl GaProblem for SequencingProblem<'_> {
    type Individual = SequenceChromosome;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> SequenceChromosome {
        SequenceChromosome::random(self.metrics.len(), rng)
    }

    fn evaluate(&self, individual: &SequenceChromosome) -> f64 {
        self.fitness_of(&individual.genes)
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &SequenceChromosome,
        parent2: &SequenceChromosome,
        rng: &mut R,
    ) -> Vec<SequenceChromosome> {
        let (c1, c2) = self.operators.crossover(parent1, parent2, rng);
        vec![c1, c2]
    }

    fn mutate<R: Rng>(&self, individual: &mut SequenceChromosome, rng: &mut R) {
        self.operators.mutate(individual, rng);
    }
}
