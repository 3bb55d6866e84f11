//! Machine timeline allocation.
//!
//! Turns an ordering of machine-routed work items into contention-free
//! time slots on individual machine instances.
//!
//! # Algorithm
//!
//! For each item in order, for each step, for each batch:
//! 1. Probe start times `cursor, cursor + q, cursor + 2q, ...` (fixed quantum).
//!    An item's cursor starts at the completion of the item before it.
//! 2. At each probe, try the instances of the step's machine type in index
//!    order; the first instance that is free wins.
//! 3. A changeover (setup) precedes the batch when the instance last ran a
//!    different item.
//! 4. The item's cursor advances to the batch end; a step never starts before
//!    the previous step's last batch has finished.
//!
//! # Complexity
//! O(b * p * s) per item where b=batches, p=probes until a gap is found,
//! s=slots already on the probed instance.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 5: Parallel Machine Models

mod allocator;

pub use allocator::TimelineAllocator;

use serde::{Deserialize, Serialize};

use crate::models::{MachineSchedule, TimeSlot, TIME_EPSILON};

/// Default changeover time between different items (5 minutes).
pub const DEFAULT_SETUP_HOURS: f64 = 5.0 / 60.0;

/// Default probing quantum (15 minutes).
pub const DEFAULT_PROBE_QUANTUM_HOURS: f64 = 0.25;

/// Allocator failures.
///
/// Input validation rejects both cases before any strategy runs; searches
/// that still hit one score the ordering as infeasible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("machine type '{machine_type}' is not in the inventory")]
    UnknownMachineType { machine_type: String },

    #[error("machine type '{machine_type}' has no instances")]
    NoInstances { machine_type: String },
}

/// Allocator tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Changeover inserted when an instance switches items (hours).
    pub setup_hours: f64,
    /// Step between probed start times (hours).
    pub probe_quantum_hours: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            setup_hours: DEFAULT_SETUP_HOURS,
            probe_quantum_hours: DEFAULT_PROBE_QUANTUM_HOURS,
        }
    }
}

impl AllocatorConfig {
    /// Sets the changeover time.
    pub fn with_setup_hours(mut self, hours: f64) -> Self {
        self.setup_hours = hours;
        self
    }

    /// Sets the probing quantum.
    pub fn with_probe_quantum(mut self, hours: f64) -> Self {
        self.probe_quantum_hours = hours;
        self
    }
}

/// Finished-goods output of one last-step batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOutput {
    /// Batch end time.
    pub end: f64,
    /// Units completed.
    pub units: u32,
}

/// Where one work item landed on the machine timelines.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTimeline {
    /// Position of the item in the caller's input.
    pub index: usize,
    /// Work item id.
    pub item_id: String,
    /// Occupied start of the item's first slot.
    pub start: f64,
    /// End of the last batch of the last step.
    pub completion: f64,
    /// Output of the last step, in completion order.
    pub outputs: Vec<BatchOutput>,
}

/// Result of allocating a full ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Per machine type timelines with idle slots and metrics.
    pub machine_schedules: Vec<MachineSchedule>,
    /// Per item placement, in allocation order.
    pub items: Vec<ItemTimeline>,
}

impl Allocation {
    /// Latest completion across all items.
    pub fn makespan(&self) -> f64 {
        self.items.iter().map(|i| i.completion).fold(0.0, f64::max)
    }

    /// Unused instance-hours across all machine types.
    pub fn idle_hours(&self) -> f64 {
        self.machine_schedules.iter().map(|m| m.idle_hours).sum()
    }

    /// Mean utilization across machine types (percent).
    pub fn average_utilization_pct(&self) -> f64 {
        if self.machine_schedules.is_empty() {
            return 0.0;
        }
        self.machine_schedules
            .iter()
            .map(|m| m.utilization_pct)
            .sum::<f64>()
            / self.machine_schedules.len() as f64
    }
}

/// Materializes idle gaps and computes utilization for one machine type.
///
/// Idle slots cover every gap on every instance between the origin and the
/// type's latest end.
pub fn finalize_machine(machine_type: &str, instances: u32, lanes: Vec<Vec<TimeSlot>>) -> MachineSchedule {
    let makespan = lanes
        .iter()
        .flatten()
        .map(|s| s.end)
        .fold(0.0, f64::max);

    let mut slots = Vec::new();
    let mut busy = 0.0;
    for (instance, mut lane) in lanes.into_iter().enumerate() {
        lane.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut cursor = 0.0;
        for slot in lane {
            if slot.occupied_start() > cursor + TIME_EPSILON {
                slots.push(TimeSlot::idle(machine_type, instance as u32, cursor, slot.occupied_start()));
            }
            cursor = f64::max(cursor, slot.end);
            busy += slot.occupied_duration();
            slots.push(slot);
        }
        if makespan > cursor + TIME_EPSILON {
            slots.push(TimeSlot::idle(machine_type, instance as u32, cursor, makespan));
        }
    }
    slots.sort_by(|a, b| {
        a.start
            .total_cmp(&b.start)
            .then_with(|| a.instance.cmp(&b.instance))
    });

    let capacity = makespan * f64::from(instances);
    let (utilization_pct, idle_hours) = if capacity > TIME_EPSILON {
        (busy / capacity * 100.0, (capacity - busy).max(0.0))
    } else {
        (0.0, 0.0)
    };

    MachineSchedule {
        machine_type: machine_type.to_string(),
        instances,
        slots,
        utilization_pct,
        idle_hours,
    }
}
