//! Configurable genetic operators for sequencing.
//!
//! # Usage
//!
//! ```
//! use u_production::strategy::ga::operators::{CrossoverType, GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::Order);
//! assert_eq!(ops.mutation_type, MutationType::Swap);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::{
    insert_mutation, invert_mutation, order_crossover, precedence_crossover, swap_mutation,
    SequenceChromosome,
};

/// Crossover strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverType {
    /// Segment-preserving order crossover.
    #[default]
    Order,
    /// Subset-preserving precedence crossover (POX).
    Precedence,
}

/// Mutation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// Swap two random positions.
    #[default]
    Swap,
    /// Remove and reinsert at a random position.
    Insert,
    /// Reverse a random segment.
    Invert,
}

/// Runtime-selectable genetic operators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Mutation strategy.
    pub mutation_type: MutationType,
}

impl GeneticOperators {
    /// Performs crossover using the configured strategy.
    pub fn crossover<R: Rng>(
        &self,
        p1: &SequenceChromosome,
        p2: &SequenceChromosome,
        rng: &mut R,
    ) -> (SequenceChromosome, SequenceChromosome) {
        match self.crossover_type {
            CrossoverType::Order => order_crossover(p1, p2, rng),
            CrossoverType::Precedence => precedence_crossover(p1, p2, rng),
        }
    }

    /// Performs mutation using the configured strategy.
    pub fn mutate<R: Rng>(&self, chromosome: &mut SequenceChromosome, rng: &mut R) {
        match self.mutation_type {
            MutationType::Swap => swap_mutation(chromosome, rng),
            MutationType::Insert => insert_mutation(chromosome, rng),
            MutationType::Invert => invert_mutation(chromosome, rng),
        }
    }
}
