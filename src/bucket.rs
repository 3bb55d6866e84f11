//! Day bucketing.
//!
//! Maps production onto calendar days and does the idle/overtime
//! bookkeeping for each day.
//!
//! # Models
//!
//! | Model | Input | Capacity per day |
//! |-------|-------|------------------|
//! | Sequential | ordering of items | working hours |
//! | Day assignment | (item, batch, day) triples | working hours |
//! | Machine timeline | allocated time slots | working hours × instances |
//!
//! The sequential model always places at least one batch on an open day,
//! which is where overtime comes from. The day-assignment model reproduces
//! whatever the upstream strategy decided.

use chrono::{Days, NaiveDate};

use crate::models::{DayAllocation, DaySchedule, TIME_EPSILON};
use crate::normalize::OrderMetrics;
use crate::timeline::Allocation;

/// A day counts as full once less than this much capacity remains (hours).
pub const FULL_DAY_TOLERANCE: f64 = 0.01;

/// One batch assigned to one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchAssignment {
    /// Index into the metrics slice.
    pub item: usize,
    /// Batch number (1-based).
    pub batch: u32,
    /// Day number (1-based).
    pub day: u32,
}

/// Calendar date of a 1-based day number.
pub fn day_date(reference_date: NaiveDate, day: u32) -> NaiveDate {
    reference_date + Days::new(u64::from(day.saturating_sub(1)))
}

/// Sequential model: items consume capacity back to back in `order`.
///
/// Each open day takes as many whole batches as fit into its remaining
/// capacity, and at least one.
pub fn bucket_sequential(
    metrics: &[OrderMetrics],
    order: &[usize],
    capacity: f64,
    reference_date: NaiveDate,
) -> Vec<DaySchedule> {
    let mut days: Vec<DaySchedule> = Vec::new();

    for &index in order {
        let m = &metrics[index];
        let mut next_batch = 1;

        while next_batch <= m.batches_needed {
            let day_full = days
                .last()
                .map_or(true, |d| capacity - d.total_hours_used <= FULL_DAY_TOLERANCE);
            if day_full {
                let n = days.len() as u32 + 1;
                days.push(DaySchedule::new(n, day_date(reference_date, n), capacity));
            }
            let Some(today) = days.last_mut() else {
                break;
            };

            let available = capacity - today.total_hours_used;
            let fit = ((available + TIME_EPSILON) / m.hours_per_batch).floor() as u32;
            let remaining = m.batches_needed - next_batch + 1;
            let count = fit.max(1).min(remaining);
            let last = next_batch + count - 1;

            today.push(DayAllocation {
                item_id: m.item_id.clone(),
                item_name: m.name.clone(),
                units: m.units_in_batches(next_batch, last),
                hours_used: f64::from(count) * m.hours_per_batch,
                first_batch: next_batch,
                last_batch: last,
                is_extra: false,
            });
            next_batch = last + 1;
        }
    }

    days
}

/// Day-assignment model: emits batches exactly where they were assigned.
///
/// Assignments are taken in the given order within a day; consecutive
/// batches of the same item merge into one allocation. Days between the
/// first and the last used day are present even when empty.
pub fn bucket_assignments(
    metrics: &[OrderMetrics],
    assignments: &[BatchAssignment],
    capacity: f64,
    reference_date: NaiveDate,
) -> Vec<DaySchedule> {
    let last_day = assignments.iter().map(|a| a.day).max().unwrap_or(0);
    let mut days: Vec<DaySchedule> = (1..=last_day)
        .map(|n| DaySchedule::new(n, day_date(reference_date, n), capacity))
        .collect();

    for a in assignments {
        let Some(day) = a.day.checked_sub(1).and_then(|i| days.get_mut(i as usize)) else {
            continue;
        };
        let m = &metrics[a.item];
        let units = m.units_in_batch(a.batch);

        let merged = match day.allocations.last_mut() {
            Some(prev) if !prev.is_extra && prev.item_id == m.item_id && prev.last_batch + 1 == a.batch => {
                prev.units += units;
                prev.hours_used += m.hours_per_batch;
                prev.last_batch = a.batch;
                true
            }
            _ => false,
        };

        if merged {
            day.total_hours_used += m.hours_per_batch;
            day.refresh_balance();
        } else {
            day.push(DayAllocation {
                item_id: m.item_id.clone(),
                item_name: m.name.clone(),
                units,
                hours_used: m.hours_per_batch,
                first_batch: a.batch,
                last_batch: a.batch,
                is_extra: false,
            });
        }
    }

    days
}

/// Machine-timeline model: attributes machine hours and finished units
/// to days.
///
/// Day `d` covers machine time `[(d-1)·h, d·h)`. An item's hours on a day
/// are its occupied slot time clipped to that window; its units are the
/// last-step batches ending inside it.
pub fn bucket_machine_timeline(
    metrics: &[OrderMetrics],
    allocation: &Allocation,
    hours_per_day: f64,
    total_instances: u32,
    reference_date: NaiveDate,
) -> Vec<DaySchedule> {
    let makespan = allocation.makespan();
    if allocation.items.is_empty() || hours_per_day <= 0.0 {
        return Vec::new();
    }
    let day_count = day_of(makespan, hours_per_day).max(1);
    let capacity = hours_per_day * f64::from(total_instances);

    let mut days: Vec<DaySchedule> = (1..=day_count)
        .map(|n| DaySchedule::new(n, day_date(reference_date, n), capacity))
        .collect();

    for timeline in &allocation.items {
        let m = &metrics[timeline.index];
        let slots: Vec<(f64, f64)> = allocation
            .machine_schedules
            .iter()
            .flat_map(|ms| ms.slots.iter())
            .filter(|s| !s.is_idle && s.item_id == timeline.item_id)
            .map(|s| (s.occupied_start(), s.end))
            .collect();

        for day in days.iter_mut() {
            let window_start = f64::from(day.day - 1) * hours_per_day;
            let window_end = window_start + hours_per_day;

            let hours: f64 = slots
                .iter()
                .map(|&(s, e)| (e.min(window_end) - s.max(window_start)).max(0.0))
                .sum();

            let finished: Vec<u32> = timeline
                .outputs
                .iter()
                .enumerate()
                .filter(|(_, o)| day_of(o.end, hours_per_day) == day.day)
                .map(|(i, _)| i as u32 + 1)
                .collect();
            let units: u32 = finished
                .iter()
                .map(|&b| timeline.outputs[(b - 1) as usize].units)
                .sum();

            if hours <= TIME_EPSILON && units == 0 {
                continue;
            }
            day.push(DayAllocation {
                item_id: m.item_id.clone(),
                item_name: m.name.clone(),
                units,
                hours_used: hours,
                first_batch: finished.first().copied().unwrap_or(0),
                last_batch: finished.last().copied().unwrap_or(0),
                is_extra: false,
            });
        }
    }

    days
}

/// Fills the final day's idle time with whole extra batches.
///
/// The item with the most units produced is repeated (ties go to the item
/// produced first). Returns the number of extra batches added.
pub fn backfill_idle(days: &mut [DaySchedule], metrics: &[OrderMetrics]) -> u32 {
    let mut produced: Vec<(usize, u32)> = Vec::new();
    for alloc in days.iter().flat_map(|d| d.allocations.iter()).filter(|a| !a.is_extra) {
        let Some(index) = metrics.iter().position(|m| m.item_id == alloc.item_id) else {
            continue;
        };
        match produced.iter_mut().find(|(i, _)| *i == index) {
            Some((_, units)) => *units += alloc.units,
            None => produced.push((index, alloc.units)),
        }
    }

    // First maximum in production order.
    let Some(&(best, _)) = produced
        .iter()
        .fold(None, |acc: Option<&(usize, u32)>, cur| match acc {
            Some(a) if a.1 >= cur.1 => Some(a),
            _ => Some(cur),
        })
    else {
        return 0;
    };

    let Some(last) = days.last_mut() else {
        return 0;
    };
    let m = &metrics[best];
    let extra = ((last.remaining_hours() + TIME_EPSILON) / m.hours_per_batch).floor() as u32;
    if extra == 0 {
        return 0;
    }

    last.push(DayAllocation {
        item_id: m.item_id.clone(),
        item_name: m.name.clone(),
        units: extra * m.batch_size,
        hours_used: f64::from(extra) * m.hours_per_batch,
        first_batch: 0,
        last_batch: 0,
        is_extra: true,
    });
    extra
}

/// 1-based day in which time `t` (hours from origin) falls; `t` exactly on a
/// boundary belongs to the earlier day.
pub fn day_of(t: f64, hours_per_day: f64) -> u32 {
    if t <= TIME_EPSILON {
        return 1;
    }
    ((t - TIME_EPSILON) / hours_per_day).floor() as u32 + 1
}
