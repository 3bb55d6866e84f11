//! Dispatching rules for order sequencing.
//!
//! A rule scores each work item; [`rank`] orders items by ascending score.
//! The earliest-deadline strategy is a ranking followed by a bin-packer.
//!
//! # Usage
//!
//! ```
//! use u_production::dispatching::{rank, rules};
//!
//! assert!(rank(&[], &rules::Urgency).is_empty());
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Jackson (1955), "Scheduling a Production Line to Minimize Maximum Tardiness"

pub mod rules;

use crate::normalize::OrderMetrics;
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (scheduled first).
pub type RuleScore = f64;

/// A dispatching rule that evaluates the priority of a work item.
///
/// # Score Convention
/// **Lower score = higher priority.**
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "EDD").
    fn name(&self) -> &'static str;

    /// Evaluates a work item; lower = scheduled earlier.
    fn evaluate(&self, order: &OrderMetrics) -> RuleScore;
}

/// Indices of `orders`, best score first.
///
/// Each item is scored once. The sort is stable: equal scores keep the
/// order in which the items were received.
pub fn rank(orders: &[OrderMetrics], rule: &dyn DispatchingRule) -> Vec<usize> {
    let scores: Vec<RuleScore> = orders.iter().map(|o| rule.evaluate(o)).collect();
    let mut indices: Vec<usize> = (0..orders.len()).collect();
    indices.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactoryConfig, Priority, WorkItem};
    use crate::normalize::normalize;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn orders(items: Vec<WorkItem>) -> Vec<OrderMetrics> {
        normalize(&items, &FactoryConfig::new(8.0), date(1)).unwrap().metrics
    }

    fn ids(orders: &[OrderMetrics], indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| orders[i].item_id.clone()).collect()
    }

    #[test]
    fn test_edd_ties_keep_input_order() {
        let o = orders(vec![
            WorkItem::per_unit("late", 1, date(20), 1.0),
            WorkItem::per_unit("X", 4, date(5), 1.0),
            WorkItem::per_unit("Y", 1, date(5), 1.0),
        ]);
        assert_eq!(ids(&o, &rank(&o, &rules::Edd)), ["X", "Y", "late"]);
    }

    #[test]
    fn test_urgency_priority_dominates_deadline() {
        let o = orders(vec![
            WorkItem::per_unit("soon_low", 1, date(9), 1.0).with_priority(Priority::Low),
            WorkItem::per_unit("later_high", 1, date(15), 1.0).with_priority(Priority::High),
        ]);
        assert_eq!(ids(&o, &rank(&o, &rules::Urgency)), ["later_high", "soon_low"]);
    }

    #[test]
    fn test_urgency_ties_keep_input_order() {
        let o = orders(vec![
            WorkItem::per_unit("B", 1, date(9), 1.0).with_priority(Priority::Medium),
            WorkItem::per_unit("A", 7, date(9), 1.0).with_priority(Priority::Medium),
        ]);
        assert_eq!(rank(&o, &rules::Urgency), vec![0, 1]);
    }
}
