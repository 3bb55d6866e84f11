//! Permutation chromosome over work items.
//!
//! # Encoding
//!
//! `genes[k]` is the index of the work item produced k-th. Every index in
//! `0..n` appears exactly once.
//!
//! # Reference
//! Bierwirth (1995), "A generalized permutation approach to JSSP"

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::runner::Individual;

/// Production-order chromosome.
///
/// Higher fitness = better ordering (maximization convention).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceChromosome {
    /// Work-item indices in production order.
    pub genes: Vec<usize>,
    /// Fitness value (higher = better).
    pub fitness: f64,
}

impl Individual for SequenceChromosome {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

impl SequenceChromosome {
    /// Wraps an ordering; fitness is unevaluated.
    pub fn new(genes: Vec<usize>) -> Self {
        Self {
            genes,
            fitness: f64::NEG_INFINITY,
        }
    }

    /// Creates a random permutation of `0..n`.
    pub fn random<R: Rng>(n: usize, rng: &mut R) -> Self {
        let mut genes: Vec<usize> = (0..n).collect();
        genes.shuffle(rng);
        Self::new(genes)
    }

    /// Whether the genes are a permutation of `0..n`.
    pub fn is_valid(&self, n: usize) -> bool {
        if self.genes.len() != n {
            return false;
        }
        let mut seen = vec![false; n];
        for &g in &self.genes {
            if g >= n || seen[g] {
                return false;
            }
            seen[g] = true;
        }
        true
    }
}

// ======================== Crossover operators ========================

/// Order crossover (segment preserving).
///
/// Copies a random contiguous slice from one parent into the same
/// positions of the child, then fills the remaining positions with the
/// other parent's genes in their order, skipping duplicates.
///
/// # Reference
/// Davis (1985), "Applying Adaptive Algorithms to Epistatic Domains"
pub fn order_crossover<R: Rng>(
    p1: &SequenceChromosome,
    p2: &SequenceChromosome,
    rng: &mut R,
) -> (SequenceChromosome, SequenceChromosome) {
    let len = p1.genes.len();
    if len < 2 {
        return (
            SequenceChromosome::new(p1.genes.clone()),
            SequenceChromosome::new(p2.genes.clone()),
        );
    }
    let mut start = rng.random_range(0..len);
    let mut end = rng.random_range(0..len);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }

    let c1 = segment_child(&p1.genes, &p2.genes, start, end);
    let c2 = segment_child(&p2.genes, &p1.genes, start, end);
    (SequenceChromosome::new(c1), SequenceChromosome::new(c2))
}

fn segment_child(template: &[usize], donor: &[usize], start: usize, end: usize) -> Vec<usize> {
    let kept: HashSet<usize> = template[start..=end].iter().copied().collect();
    let mut fill = donor.iter().filter(|g| !kept.contains(g));

    template
        .iter()
        .enumerate()
        .map(|(i, &g)| {
            if (start..=end).contains(&i) {
                g
            } else {
                fill.next().copied().unwrap_or(g)
            }
        })
        .collect()
}

/// Precedence-preserving crossover (POX).
///
/// Selects a random subset of items, keeps their positions from one
/// parent, fills the rest from the other parent in order.
///
/// # Reference
/// Bierwirth et al. (1996)
pub fn precedence_crossover<R: Rng>(
    p1: &SequenceChromosome,
    p2: &SequenceChromosome,
    rng: &mut R,
) -> (SequenceChromosome, SequenceChromosome) {
    let len = p1.genes.len();
    if len == 0 {
        return (p1.clone(), p2.clone());
    }
    let set_size = rng.random_range(1..=len);
    let mut pool: Vec<usize> = (0..len).collect();
    pool.shuffle(rng);
    let selected: HashSet<usize> = pool.into_iter().take(set_size).collect();

    let c1 = subset_child(&p1.genes, &p2.genes, &selected);
    let c2 = subset_child(&p2.genes, &p1.genes, &selected);
    (SequenceChromosome::new(c1), SequenceChromosome::new(c2))
}

fn subset_child(template: &[usize], donor: &[usize], selected: &HashSet<usize>) -> Vec<usize> {
    let mut fill = donor.iter().filter(|g| !selected.contains(g));
    template
        .iter()
        .map(|&g| {
            if selected.contains(&g) {
                g
            } else {
                fill.next().copied().unwrap_or(g)
            }
        })
        .collect()
}

// ======================== Mutation operators ========================

/// Swap mutation: exchanges two random positions.
pub fn swap_mutation<R: Rng>(chromosome: &mut SequenceChromosome, rng: &mut R) {
    let len = chromosome.genes.len();
    if len < 2 {
        return;
    }
    let i = rng.random_range(0..len);
    let j = rng.random_range(0..len);
    chromosome.genes.swap(i, j);
}

/// Insert mutation: removes an element and reinserts at a random position.
pub fn insert_mutation<R: Rng>(chromosome: &mut SequenceChromosome, rng: &mut R) {
    let len = chromosome.genes.len();
    if len < 2 {
        return;
    }
    let from = rng.random_range(0..len);
    let to = rng.random_range(0..len);
    let gene = chromosome.genes.remove(from);
    chromosome.genes.insert(to, gene);
}

/// Invert mutation: reverses a random segment.
pub fn invert_mutation<R: Rng>(chromosome: &mut SequenceChromosome, rng: &mut R) {
    let len = chromosome.genes.len();
    if len < 2 {
        return;
    }
    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }
    chromosome.genes[i..=j].reverse();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_chromosome() {
        let mut rng = SmallRng::seed_from_u64(42);
        let ch = SequenceChromosome::random(6, &mut rng);
        assert!(ch.is_valid(6));
        assert_eq!(ch.fitness, f64::NEG_INFINITY);
    }

    #[test]
    fn test_is_valid_rejects_duplicates() {
        assert!(!SequenceChromosome::new(vec![0, 0, 2]).is_valid(3));
        assert!(!SequenceChromosome::new(vec![0, 1]).is_valid(3));
        assert!(!SequenceChromosome::new(vec![0, 1, 3]).is_valid(3));
    }

    #[test]
    fn test_segment_child_fills_in_donor_order() {
        // keep positions 2..=3 from template
        let child = segment_child(&[0, 1, 2, 3, 4], &[4, 3, 2, 1, 0], 2, 3);
        assert_eq!(child, vec![4, 1, 2, 3, 0]);
    }

    #[test]
    fn test_subset_child_keeps_selected_positions() {
        let selected: HashSet<usize> = [1, 3].into_iter().collect();
        let child = subset_child(&[0, 1, 2, 3], &[3, 2, 1, 0], &selected);
        assert_eq!(child, vec![2, 1, 0, 3]);
    }

    #[test]
    fn test_crossovers_produce_permutations() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let p1 = SequenceChromosome::random(7, &mut rng);
            let p2 = SequenceChromosome::random(7, &mut rng);
            let (a, b) = order_crossover(&p1, &p2, &mut rng);
            assert!(a.is_valid(7) && b.is_valid(7));
            let (c, d) = precedence_crossover(&p1, &p2, &mut rng);
            assert!(c.is_valid(7) && d.is_valid(7));
        }
    }

    #[test]
    fn test_mutations_preserve_permutation() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut ch = SequenceChromosome::random(5, &mut rng);
        for _ in 0..30 {
            swap_mutation(&mut ch, &mut rng);
            insert_mutation(&mut ch, &mut rng);
            invert_mutation(&mut ch, &mut rng);
            assert!(ch.is_valid(5));
        }
    }

    #[test]
    fn test_single_gene_untouched() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ch = SequenceChromosome::new(vec![0]);
        swap_mutation(&mut ch, &mut rng);
        invert_mutation(&mut ch, &mut rng);
        assert_eq!(ch.genes, vec![0]);
        let (a, _) = order_crossover(&ch, &ch, &mut rng);
        assert_eq!(a.genes, vec![0]);
    }
}
