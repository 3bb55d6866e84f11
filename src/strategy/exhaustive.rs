//! Exhaustive permutation search.
//!
//! Visits all N! orderings in lexicographic order and keeps the one with
//! the lowest composite score; the first ordering reaching the minimum wins.
//! The only exact strategy, viable for small N.
//!
//! # Complexity
//! O(N! * realize(N))

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Plan, PlanningContext};
use crate::error::{Result, ScheduleError};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Default upper bound on the number of items.
pub const DEFAULT_MAX_ITEMS: usize = 8;

/// Exhaustive search limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveConfig {
    /// Largest item count accepted.
    pub max_items: usize,
}

impl Default for ExhaustiveConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl ExhaustiveConfig {
    /// Sets the item limit.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub(crate) fn validate(&self, item_count: usize) -> Vec<ValidationError> {
        if item_count > self.max_items {
            vec![ValidationError::new(
                ValidationErrorKind::TooManyItems,
                format!(
                    "Exhaustive search supports at most {} work items, got {item_count}",
                    self.max_items
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Rearranges `perm` into the next lexicographic permutation.
///
/// Returns `false` (leaving `perm` sorted ascending) after the last one.
pub fn next_permutation(perm: &mut [usize]) -> bool {
    let n = perm.len();
    if n < 2 {
        return false;
    }
    let mut i = n - 1;
    while i > 0 && perm[i - 1] >= perm[i] {
        i -= 1;
    }
    if i == 0 {
        perm.reverse();
        return false;
    }
    let mut j = n - 1;
    while perm[j] <= perm[i - 1] {
        j -= 1;
    }
    perm.swap(i - 1, j);
    perm[i..].reverse();
    true
}

pub(crate) fn search(ctx: &PlanningContext<'_>, config: &ExhaustiveConfig) -> Result<Plan> {
    let n = ctx.work.len();
    let errors = config.validate(n);
    if !errors.is_empty() {
        return Err(ScheduleError::InvalidInput(errors));
    }

    let mut perm: Vec<usize> = (0..n).collect();
    let mut best_order = perm.clone();
    let mut best_score = f64::INFINITY;
    let mut visited: u64 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            warn!(visited, "exhaustive search cancelled");
            return Err(ScheduleError::Cancelled);
        }

        let cost = ctx.cost_of(&perm);
        visited += 1;
        if cost.score < best_score {
            debug!(visited, score = cost.score, late = cost.late_count, "new incumbent");
            best_score = cost.score;
            best_order.clone_from(&perm);
        }

        if !next_permutation(&mut perm) {
            break;
        }
    }

    debug!(visited, best_score, "exhaustive search complete");
    let realized = ctx.realize(&best_order)?;
    Ok(Plan::Ordering(realized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_permutation_lexicographic() {
        let mut p = vec![0, 1, 2];
        let mut seen = vec![p.clone()];
        while next_permutation(&mut p) {
            seen.push(p.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert_eq!(p, vec![0, 1, 2]);
    }

    #[test]
    fn test_next_permutation_trivial() {
        let mut empty: Vec<usize> = Vec::new();
        assert!(!next_permutation(&mut empty));
        let mut one = vec![0];
        assert!(!next_permutation(&mut one));
    }

    #[test]
    fn test_limit_validation() {
        let config = ExhaustiveConfig::default().with_max_items(3);
        assert!(config.validate(3).is_empty());
        let errors = config.validate(4);
        assert_eq!(errors[0].kind, ValidationErrorKind::TooManyItems);
    }
}
