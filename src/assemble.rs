//! Schedule assembly.
//!
//! Wraps the day buckets (and machine timelines, when present) of any
//! strategy into the uniform [`ScheduleResult`] shape.

use crate::evaluate::overdue_days;
use crate::models::{DaySchedule, MachineSchedule, ScheduleResult, ScheduleSummary, ScheduledItem};
use crate::normalize::OrderMetrics;

/// Builds the result for items produced in `sequence` order.
///
/// Start and completion days come from regular (non-extra) production.
/// `days_required` is the calendar span between them; `units_per_day`
/// is the quantity spread evenly over that span, rounded down.
pub fn assemble(
    metrics: &[OrderMetrics],
    sequence: &[usize],
    days: Vec<DaySchedule>,
    machine_schedules: Option<Vec<MachineSchedule>>,
) -> ScheduleResult {
    let items: Vec<ScheduledItem> = sequence
        .iter()
        .enumerate()
        .map(|(rank, &index)| scheduled_item(&metrics[index], rank as u32 + 1, &days))
        .collect();

    let summary = summarize(&items, &days, machine_schedules.as_deref());
    ScheduleResult {
        items,
        days,
        machine_schedules,
        summary,
    }
}

fn scheduled_item(m: &OrderMetrics, production_order: u32, days: &[DaySchedule]) -> ScheduledItem {
    let produced_on = || {
        days.iter()
            .filter(|d| d.allocations.iter().any(|a| !a.is_extra && a.item_id == m.item_id))
            .map(|d| d.day)
    };
    let start_day = produced_on().min().unwrap_or(0);
    let completion_day = produced_on().max().unwrap_or(0);
    let days_required = if completion_day == 0 {
        0
    } else {
        completion_day - start_day + 1
    };

    ScheduledItem {
        item_id: m.item_id.clone(),
        name: m.name.clone(),
        quantity: m.quantity,
        deadline: m.deadline,
        priority: m.priority,
        urgency_score: m.urgency_score,
        start_day,
        completion_day,
        days_required,
        units_per_day: m.quantity.checked_div(days_required).unwrap_or(0),
        overdue_days: overdue_days(completion_day, m.days_until_deadline),
        production_order,
    }
}

fn summarize(
    items: &[ScheduledItem],
    days: &[DaySchedule],
    machine_schedules: Option<&[MachineSchedule]>,
) -> ScheduleSummary {
    let used: f64 = days.iter().map(|d| d.total_hours_used).sum();
    let capacity: f64 = days.iter().map(|d| d.capacity_hours).sum();

    let (machine_idle_hours, average_machine_utilization_pct) = match machine_schedules {
        Some(machines) => {
            let idle = machines.iter().map(|m| m.idle_hours).sum();
            let utilization = if machines.is_empty() {
                0.0
            } else {
                machines.iter().map(|m| m.utilization_pct).sum::<f64>() / machines.len() as f64
            };
            (Some(idle), Some(utilization))
        }
        None => (None, None),
    };

    ScheduleSummary {
        total_days: days.len() as u32,
        average_utilization_pct: if capacity > 0.0 { used / capacity * 100.0 } else { 0.0 },
        total_idle_hours: days.iter().map(|d| d.idle_hours).sum(),
        total_overtime_hours: days.iter().map(|d| d.overtime_hours).sum(),
        late_items: items.iter().filter(|i| i.is_late()).count() as u32,
        machine_idle_hours,
        average_machine_utilization_pct,
    }
}
