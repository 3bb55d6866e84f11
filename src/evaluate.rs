//! Cost and fitness evaluation.
//!
//! # Composite score (lower is better)
//!
//! `late_count × 10 000 + total_completion_time × 100 + total_idle_time`
//!
//! The weights make the terms lexicographic: one extra late item outweighs
//! any realistic gain in completion or idle time.
//!
//! # Genetic fitness (higher is better)
//!
//! A single-resource simulation that ignores machine contention: items are
//! laid end to end in whole days, and each one subtracts its delay and its
//! completion day from a base of 10 000, earning a bonus when on time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bucket::day_of;
use crate::models::DaySchedule;
use crate::normalize::OrderMetrics;
use crate::timeline::Allocation;

/// Weight of one late item in the composite score.
pub const LATE_WEIGHT: f64 = 10_000.0;
/// Weight of one hour of completion time in the composite score.
pub const COMPLETION_WEIGHT: f64 = 100.0;
/// Weight of one idle hour in the composite score.
pub const IDLE_WEIGHT: f64 = 1.0;

const FITNESS_BASE: f64 = 10_000.0;
const FITNESS_DELAY_PENALTY: f64 = 100.0;
const FITNESS_COMPLETION_PENALTY: f64 = 2.0;
const FITNESS_ON_TIME_BONUS: f64 = 50.0;

/// Quality of a realized schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCost {
    /// Items completing after their deadline.
    pub late_count: u32,
    /// Hours until the last work finishes.
    pub total_completion_time: f64,
    /// Unused capacity hours.
    pub total_idle_time: f64,
    /// Mean utilization (percent).
    pub average_utilization: f64,
    /// Composite score.
    pub score: f64,
}

impl ScheduleCost {
    /// Builds a cost and its composite score.
    pub fn new(late_count: u32, total_completion_time: f64, total_idle_time: f64, average_utilization: f64) -> Self {
        Self {
            late_count,
            total_completion_time,
            total_idle_time,
            average_utilization,
            score: composite_score(late_count, total_completion_time, total_idle_time),
        }
    }

    /// Cost of an ordering that cannot be realized; ranks after everything.
    pub fn infeasible() -> Self {
        Self {
            late_count: u32::MAX,
            total_completion_time: f64::INFINITY,
            total_idle_time: f64::INFINITY,
            average_utilization: 0.0,
            score: f64::INFINITY,
        }
    }

    /// Whether this cost came from [`ScheduleCost::infeasible`].
    pub fn is_infeasible(&self) -> bool {
        self.score.is_infinite()
    }
}

/// `late × 10 000 + completion × 100 + idle`.
#[inline]
pub fn composite_score(late_count: u32, total_completion_time: f64, total_idle_time: f64) -> f64 {
    f64::from(late_count) * LATE_WEIGHT
        + total_completion_time * COMPLETION_WEIGHT
        + total_idle_time * IDLE_WEIGHT
}

/// Last day with regular (non-extra) production per item id.
pub fn completion_days(days: &[DaySchedule]) -> HashMap<&str, u32> {
    let mut last = HashMap::new();
    for day in days {
        for alloc in day.allocations.iter().filter(|a| !a.is_extra) {
            last.insert(alloc.item_id.as_str(), day.day);
        }
    }
    last
}

/// Days past the deadline for an item finishing on `completion_day`.
#[inline]
pub fn overdue_days(completion_day: u32, days_until_deadline: i64) -> u32 {
    (i64::from(completion_day) - days_until_deadline).max(0) as u32
}

/// Evaluates a day-bucketed schedule.
///
/// Completion time is measured in capacity hours: full days before the last
/// one plus the hours used on the last day.
pub fn evaluate_days(metrics: &[OrderMetrics], days: &[DaySchedule], capacity: f64) -> ScheduleCost {
    let finished = completion_days(days);
    let late_count = metrics
        .iter()
        .filter(|m| {
            finished
                .get(m.item_id.as_str())
                .is_some_and(|&d| overdue_days(d, m.days_until_deadline) > 0)
        })
        .count() as u32;

    let total_completion_time = match days.last() {
        Some(last) => f64::from(last.day - 1) * capacity + last.total_hours_used,
        None => 0.0,
    };
    let total_idle_time: f64 = days.iter().map(|d| d.idle_hours).sum();
    let average_utilization = if days.is_empty() {
        0.0
    } else {
        days.iter().map(|d| d.utilization_pct()).sum::<f64>() / days.len() as f64
    };

    ScheduleCost::new(late_count, total_completion_time, total_idle_time, average_utilization)
}

/// Evaluates a machine allocation.
///
/// Completion time is the makespan; idle time is unused instance-hours.
pub fn evaluate_allocation(metrics: &[OrderMetrics], allocation: &Allocation, hours_per_day: f64) -> ScheduleCost {
    let late_count = allocation
        .items
        .iter()
        .filter(|it| {
            let m = &metrics[it.index];
            overdue_days(day_of(it.completion, hours_per_day), m.days_until_deadline) > 0
        })
        .count() as u32;

    ScheduleCost::new(
        late_count,
        allocation.makespan(),
        allocation.idle_hours(),
        allocation.average_utilization_pct(),
    )
}

/// Day-accumulation fitness of an ordering (higher is better).
///
/// Each item takes `ceil(total_hours / capacity)` whole days.
pub fn ga_fitness(metrics: &[OrderMetrics], order: &[usize], capacity: f64) -> f64 {
    let mut fitness = FITNESS_BASE;
    let mut completion: i64 = 0;

    for &index in order {
        let m = &metrics[index];
        completion += (m.total_hours / capacity).ceil() as i64;
        let delay = (completion - m.days_until_deadline).max(0);

        fitness -= delay as f64 * FITNESS_DELAY_PENALTY + completion as f64 * FITNESS_COMPLETION_PENALTY;
        if delay == 0 {
            fitness += FITNESS_ON_TIME_BONUS;
        }
    }

    fitness
}
