//! Schedule (solution) model.
//!
//! The uniform result shape produced by every strategy: per-item summary
//! rows, a calendar of day buckets, optional per-machine timelines and
//! aggregate metrics. Presentation and export code consume it read-only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Priority;

/// Tolerance for floating-point time comparisons (hours).
pub const TIME_EPSILON: f64 = 1e-9;

/// A batch (or idle gap) placed on one machine instance.
///
/// `start` is the processing start. A changeover of `setup_hours` occupies the
/// instance immediately before it, so the occupied interval is
/// `[start - setup_hours, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Machine type.
    pub machine_type: String,
    /// Instance index within the machine type (0-based).
    pub instance: u32,
    /// Work item id (empty for idle slots).
    pub item_id: String,
    /// Work item name ("Idle" for idle slots).
    pub item_name: String,
    /// Batch number within the step (1-based, 0 for idle slots).
    pub batch_number: u32,
    /// Batches of this step for the item.
    pub total_batches: u32,
    /// Processing start (hours from schedule origin).
    pub start: f64,
    /// Processing end (hours from schedule origin).
    pub end: f64,
    /// Changeover time preceding `start`.
    pub setup_hours: f64,
    /// Whether this slot represents idle time.
    pub is_idle: bool,
}

impl TimeSlot {
    /// Creates a production slot.
    #[allow(clippy::too_many_arguments)]
    pub fn batch(
        machine_type: impl Into<String>,
        instance: u32,
        item_id: impl Into<String>,
        item_name: impl Into<String>,
        batch_number: u32,
        total_batches: u32,
        start: f64,
        end: f64,
    ) -> Self {
        Self {
            machine_type: machine_type.into(),
            instance,
            item_id: item_id.into(),
            item_name: item_name.into(),
            batch_number,
            total_batches,
            start,
            end,
            setup_hours: 0.0,
            is_idle: false,
        }
    }

    /// Creates an idle slot.
    pub fn idle(machine_type: impl Into<String>, instance: u32, start: f64, end: f64) -> Self {
        Self {
            machine_type: machine_type.into(),
            instance,
            item_id: String::new(),
            item_name: "Idle".to_string(),
            batch_number: 0,
            total_batches: 0,
            start,
            end,
            setup_hours: 0.0,
            is_idle: true,
        }
    }

    /// Sets the changeover time.
    pub fn with_setup(mut self, setup_hours: f64) -> Self {
        self.setup_hours = setup_hours;
        self
    }

    /// Start of the occupied interval (includes changeover).
    #[inline]
    pub fn occupied_start(&self) -> f64 {
        self.start - self.setup_hours
    }

    /// Processing duration (excludes changeover).
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Occupied duration (includes changeover).
    #[inline]
    pub fn occupied_duration(&self) -> f64 {
        self.end - self.occupied_start()
    }

    /// Whether the occupied intervals of two slots intersect.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.occupied_start() < other.end - TIME_EPSILON
            && other.occupied_start() < self.end - TIME_EPSILON
    }
}

/// Timeline of one machine type across its instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSchedule {
    /// Machine type.
    pub machine_type: String,
    /// Number of parallel instances.
    pub instances: u32,
    /// Slots on all instances, sorted by start time.
    pub slots: Vec<TimeSlot>,
    /// Busy share of `makespan × instances` (percent).
    pub utilization_pct: f64,
    /// Unused instance-hours before this type's makespan.
    pub idle_hours: f64,
}

impl MachineSchedule {
    /// Production slots on a given instance, in time order.
    pub fn slots_on(&self, instance: u32) -> Vec<&TimeSlot> {
        let mut slots: Vec<&TimeSlot> = self
            .slots
            .iter()
            .filter(|s| s.instance == instance && !s.is_idle)
            .collect();
        slots.sort_by(|a, b| a.start.total_cmp(&b.start));
        slots
    }

    /// Processing hours across all instances (changeovers included).
    pub fn busy_hours(&self) -> f64 {
        self.slots
            .iter()
            .filter(|s| !s.is_idle)
            .map(|s| s.occupied_duration())
            .sum()
    }

    /// Latest slot end.
    pub fn makespan(&self) -> f64 {
        self.slots.iter().map(|s| s.end).fold(0.0, f64::max)
    }
}

/// Work attributed to one item on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAllocation {
    /// Work item id.
    pub item_id: String,
    /// Work item name.
    pub item_name: String,
    /// Units produced.
    pub units: u32,
    /// Hours consumed.
    pub hours_used: f64,
    /// First batch number covered (1-based).
    pub first_batch: u32,
    /// Last batch number covered (1-based).
    pub last_batch: u32,
    /// Extra production backfilled into idle time; not part of any order.
    pub is_extra: bool,
}

/// One calendar day of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Day number (1-based).
    pub day: u32,
    /// Calendar date.
    pub date: NaiveDate,
    /// Allocations in production order.
    pub allocations: Vec<DayAllocation>,
    /// Sum of allocation hours.
    pub total_hours_used: f64,
    /// Capacity of the day (hours).
    pub capacity_hours: f64,
    /// `max(0, capacity - used)`.
    pub idle_hours: f64,
    /// `max(0, used - capacity)`.
    pub overtime_hours: f64,
}

impl DaySchedule {
    /// Creates an empty day.
    pub fn new(day: u32, date: NaiveDate, capacity_hours: f64) -> Self {
        Self {
            day,
            date,
            allocations: Vec::new(),
            total_hours_used: 0.0,
            capacity_hours,
            idle_hours: capacity_hours,
            overtime_hours: 0.0,
        }
    }

    /// Appends an allocation and refreshes the totals.
    pub fn push(&mut self, allocation: DayAllocation) {
        self.total_hours_used += allocation.hours_used;
        self.allocations.push(allocation);
        self.refresh_balance();
    }

    /// Recomputes idle and overtime from the used hours.
    pub fn refresh_balance(&mut self) {
        let diff = self.capacity_hours - self.total_hours_used;
        if diff.abs() <= TIME_EPSILON {
            self.idle_hours = 0.0;
            self.overtime_hours = 0.0;
        } else if diff > 0.0 {
            self.idle_hours = diff;
            self.overtime_hours = 0.0;
        } else {
            self.idle_hours = 0.0;
            self.overtime_hours = -diff;
        }
    }

    /// Remaining capacity (never negative).
    #[inline]
    pub fn remaining_hours(&self) -> f64 {
        (self.capacity_hours - self.total_hours_used).max(0.0)
    }

    /// Used share of capacity (percent).
    pub fn utilization_pct(&self) -> f64 {
        if self.capacity_hours <= 0.0 {
            return 0.0;
        }
        self.total_hours_used / self.capacity_hours * 100.0
    }

    /// Units produced for an item on this day (extra production excluded).
    pub fn units_for(&self, item_id: &str) -> u32 {
        self.allocations
            .iter()
            .filter(|a| a.item_id == item_id && !a.is_extra)
            .map(|a| a.units)
            .sum()
    }
}

/// Per-item summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// Work item id.
    pub item_id: String,
    /// Work item name.
    pub name: String,
    /// Ordered quantity.
    pub quantity: u32,
    /// Due date.
    pub deadline: NaiveDate,
    /// Effective priority.
    pub priority: Priority,
    /// Urgency score used for ranking.
    pub urgency_score: i64,
    /// First day with production (1-based).
    pub start_day: u32,
    /// Last day with production (1-based).
    pub completion_day: u32,
    /// Calendar span of production in days.
    pub days_required: u32,
    /// Average units per production day (rounded down).
    pub units_per_day: u32,
    /// Days finished past the deadline.
    pub overdue_days: u32,
    /// Rank in the production sequence (1-based).
    pub production_order: u32,
}

impl ScheduledItem {
    /// Whether the item finishes after its deadline.
    #[inline]
    pub fn is_late(&self) -> bool {
        self.overdue_days > 0
    }
}

/// Aggregate schedule metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    /// Number of calendar days.
    pub total_days: u32,
    /// Used share of total day capacity (percent).
    pub average_utilization_pct: f64,
    /// Sum of day idle hours.
    pub total_idle_hours: f64,
    /// Sum of day overtime hours.
    pub total_overtime_hours: f64,
    /// Items finishing after their deadline.
    pub late_items: u32,
    /// Machine idle instance-hours (machine-aware runs only).
    pub machine_idle_hours: Option<f64>,
    /// Mean machine-type utilization (machine-aware runs only).
    pub average_machine_utilization_pct: Option<f64>,
}

/// A complete production schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Items in production order.
    pub items: Vec<ScheduledItem>,
    /// Calendar of day buckets.
    pub days: Vec<DaySchedule>,
    /// Per-machine timelines (machine-aware runs only).
    pub machine_schedules: Option<Vec<MachineSchedule>>,
    /// Aggregate metrics.
    pub summary: ScheduleSummary,
}

impl ScheduleResult {
    /// Creates an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Finds the row for a work item.
    pub fn item(&self, item_id: &str) -> Option<&ScheduledItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    /// Finds a day by its 1-based number.
    pub fn day(&self, day: u32) -> Option<&DaySchedule> {
        self.days.iter().find(|d| d.day == day)
    }

    /// Item ids in production order.
    pub fn production_sequence(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.item_id.as_str()).collect()
    }

    /// Items finishing after their deadline.
    pub fn late_items(&self) -> Vec<&ScheduledItem> {
        self.items.iter().filter(|i| i.is_late()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn alloc(item: &str, units: u32, hours: f64) -> DayAllocation {
        DayAllocation {
            item_id: item.into(),
            item_name: item.into(),
            units,
            hours_used: hours,
            first_batch: 1,
            last_batch: units,
            is_extra: false,
        }
    }

    #[test]
    fn test_slot_overlap_includes_setup() {
        let a = TimeSlot::batch("mill", 0, "A", "A", 1, 1, 0.0, 2.0);
        let b = TimeSlot::batch("mill", 0, "B", "B", 1, 1, 2.1, 3.0).with_setup(0.2);
        let c = TimeSlot::batch("mill", 0, "B", "B", 1, 1, 2.2, 3.0).with_setup(0.2);

        assert!(a.overlaps(&b)); // setup starts at 1.9
        assert!(!a.overlaps(&c)); // touching at 2.0
        assert!((b.duration() - 0.9).abs() < 1e-10);
        assert!((b.occupied_duration() - 1.1).abs() < 1e-10);
    }

    #[test]
    fn test_day_balance_idle() {
        let mut day = DaySchedule::new(1, date(1), 8.0);
        day.push(alloc("A", 5, 5.0));
        assert!((day.idle_hours - 3.0).abs() < 1e-10);
        assert_eq!(day.overtime_hours, 0.0);
        assert!((day.remaining_hours() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_day_balance_overtime() {
        let mut day = DaySchedule::new(1, date(1), 8.0);
        day.push(alloc("A", 7, 7.0));
        day.push(alloc("B", 1, 1.5));
        assert_eq!(day.idle_hours, 0.0);
        assert!((day.overtime_hours - 0.5).abs() < 1e-10);
        assert_eq!(day.remaining_hours(), 0.0);
        assert!((day.utilization_pct() - 106.25).abs() < 1e-10);
    }

    #[test]
    fn test_units_for_skips_extra() {
        let mut day = DaySchedule::new(1, date(1), 8.0);
        day.push(alloc("A", 4, 4.0));
        let mut extra = alloc("A", 2, 2.0);
        extra.is_extra = true;
        day.push(extra);
        assert_eq!(day.units_for("A"), 4);
        assert_eq!(day.units_for("B"), 0);
    }

    #[test]
    fn test_machine_schedule_metrics() {
        let sched = MachineSchedule {
            machine_type: "mill".into(),
            instances: 2,
            slots: vec![
                TimeSlot::batch("mill", 1, "A", "A", 1, 2, 0.0, 2.0),
                TimeSlot::batch("mill", 0, "A", "A", 2, 2, 0.0, 1.0),
                TimeSlot::idle("mill", 0, 1.0, 2.0),
            ],
            utilization_pct: 0.0,
            idle_hours: 0.0,
        };
        assert!((sched.busy_hours() - 3.0).abs() < 1e-10);
        assert!((sched.makespan() - 2.0).abs() < 1e-10);
        assert_eq!(sched.slots_on(0).len(), 1);
    }

    #[test]
    fn test_empty_result() {
        let r = ScheduleResult::empty();
        assert!(r.items.is_empty());
        assert!(r.item("A").is_none());
        assert!(r.day(1).is_none());
        assert_eq!(r.summary.total_days, 0);
    }
}
