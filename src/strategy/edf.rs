//! Earliest-deadline-first bin-packing.
//!
//! # Algorithm
//!
//! 1. Rank items with a dispatching rule (urgency or raw deadline; the
//!    sort is stable, so ties keep the order received).
//! 2. For each item in rank order, put each batch on the first open day
//!    with enough remaining capacity; open a new day when none has room.
//!
//! A batch longer than a whole day fits nowhere and lands alone on a fresh
//! day, which then shows overtime. Never fails.
//!
//! # Complexity
//! O(items × batches × days)

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Plan, PlanningContext};
use crate::bucket::BatchAssignment;
use crate::dispatching::{rank, rules, DispatchingRule};
use crate::models::TIME_EPSILON;
use crate::normalize::OrderMetrics;

/// Ranking used before packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdfSortKey {
    /// Highest urgency score first.
    #[default]
    Urgency,
    /// Earliest deadline first.
    Deadline,
}

/// Earliest-deadline tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdfConfig {
    /// Ranking used before packing.
    pub sort_key: EdfSortKey,
}

impl EdfConfig {
    /// Sets the ranking.
    pub fn with_sort_key(mut self, sort_key: EdfSortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    fn rule(&self) -> &'static dyn DispatchingRule {
        match self.sort_key {
            EdfSortKey::Urgency => &rules::Urgency,
            EdfSortKey::Deadline => &rules::Edd,
        }
    }
}

pub(crate) fn plan(ctx: &PlanningContext<'_>, config: &EdfConfig) -> Plan {
    let (sequence, assignments) = first_fit(ctx.metrics(), ctx.capacity(), config);
    Plan::Assignment { sequence, assignments }
}

/// Ranks the items and packs their batches first-fit.
///
/// Returns the production sequence and the batch-to-day assignments,
/// sorted by day, then sequence position, then batch.
pub fn first_fit(
    metrics: &[OrderMetrics],
    capacity: f64,
    config: &EdfConfig,
) -> (Vec<usize>, Vec<BatchAssignment>) {
    let sequence = rank(metrics, config.rule());

    let mut loads: Vec<f64> = Vec::new();
    let mut assignments = Vec::with_capacity(metrics.iter().map(|m| m.batches_needed as usize).sum());

    for &item in &sequence {
        let hours = metrics[item].hours_per_batch;
        for batch in 1..=metrics[item].batches_needed {
            let open = loads.iter().position(|&used| used + hours <= capacity + TIME_EPSILON);
            let day = match open {
                Some(i) => i,
                None => {
                    loads.push(0.0);
                    loads.len() - 1
                }
            };
            loads[day] += hours;
            assignments.push(BatchAssignment {
                item,
                batch,
                day: day as u32 + 1,
            });
        }
    }

    let rank = rank_of(&sequence, metrics.len());
    assignments.sort_by_key(|a| (a.day, rank[a.item], a.batch));

    debug!(items = sequence.len(), days = loads.len(), "earliest-deadline packing complete");
    (sequence, assignments)
}

/// Position of every item in `sequence`.
pub(crate) fn rank_of(sequence: &[usize], len: usize) -> Vec<usize> {
    let mut rank = vec![usize::MAX; len];
    for (position, &item) in sequence.iter().enumerate() {
        rank[item] = position;
    }
    rank
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

    fn metrics(items: Vec<WorkItem>) -> Vec<OrderMetrics> {
        normalize(&items, &FactoryConfig::new(8.0), date(1)).unwrap().metrics
    }

    #[test]
    fn test_single_item_fills_days() {
        let m = metrics(vec![WorkItem::per_unit("A", 10, date(9), 1.0)]);
        let (sequence, assignments) = first_fit(&m, 8.0, &EdfConfig::default());

        assert_eq!(sequence, vec![0]);
        assert_eq!(assignments.len(), 10);
        assert_eq!(assignments.iter().filter(|a| a.day == 1).count(), 8);
        assert_eq!(assignments.iter().filter(|a| a.day == 2).count(), 2);
    }

    #[test]
    fn test_urgency_ranks_first() {
        let m = metrics(vec![
            WorkItem::per_unit("late", 4, date(30), 1.0),
            WorkItem::per_unit("soon", 4, date(2), 1.0),
        ]);
        let (sequence, _) = first_fit(&m, 8.0, &EdfConfig::default());
        assert_eq!(sequence, vec![1, 0]);
    }

    #[test]
    fn test_deadline_ties_keep_input_order() {
        let m = metrics(vec![
            WorkItem::per_unit("X", 2, date(5), 1.0).with_priority(Priority::Low),
            WorkItem::per_unit("Y", 2, date(5), 1.0).with_priority(Priority::High),
        ]);
        let config = EdfConfig::default().with_sort_key(EdfSortKey::Deadline);
        let (sequence, _) = first_fit(&m, 8.0, &config);
        assert_eq!(sequence, vec![0, 1]);
    }

    #[test]
    fn test_first_fit_reuses_earlier_gap() {
        // A: 3 batches of 3h -> days 1,1,2 ; B: 1 batch of 2h fits day 1 (6h used)
        let m = metrics(vec![
            WorkItem::per_unit("A", 3, date(2), 3.0),
            WorkItem::per_unit("B", 1, date(20), 2.0),
        ]);
        let (_, assignments) = first_fit(&m, 8.0, &EdfConfig::default());
        let b = assignments.iter().find(|a| a.item == 1).unwrap();
        assert_eq!(b.day, 1);
        assert_eq!(assignments.iter().filter(|a| a.item == 0 && a.day == 2).count(), 1);
    }

    #[test]
    fn test_oversize_batch_gets_own_day() {
        let m = metrics(vec![
            WorkItem::per_unit("small", 1, date(2), 1.0),
            WorkItem::per_unit("huge", 1, date(20), 10.0),
        ]);
        let (_, assignments) = first_fit(&m, 8.0, &EdfConfig::default());
        let huge = assignments.iter().find(|a| a.item == 1).unwrap();
        assert_eq!(huge.day, 2);
    }

    #[test]
    fn test_rank_of() {
        assert_eq!(rank_of(&[2, 0, 1], 3), vec![1, 2, 0]);
    }
}
