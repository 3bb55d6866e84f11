use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::{
    finalize_machine, AllocationError, Allocation, AllocatorConfig, BatchOutput, ItemTimeline,
    DEFAULT_PROBE_QUANTUM_HOURS,
};
use crate::models::{MachineInventory, MachineStep, TimeSlot, WorkItem, TIME_EPSILON};

/// Sequential batch placer over a machine inventory.
///
/// One allocator serves one ordering; it owns the instance timelines it
/// builds and is consumed by [`TimelineAllocator::finish`].
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_production::models::{MachineInventory, MachineStep, WorkItem};
/// use u_production::timeline::{AllocatorConfig, TimelineAllocator};
///
/// let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
/// let items = vec![
///     WorkItem::routed("A", 10, due).with_step(MachineStep::new("mill", 10, 2.0)),
///     WorkItem::routed("B", 10, due).with_step(MachineStep::new("mill", 10, 1.0)),
/// ];
/// let inventory = MachineInventory::new().with_machine("mill", 1);
///
/// let allocation =
///     TimelineAllocator::allocate(&items, &[0, 1], &inventory, AllocatorConfig::default()).unwrap();
/// // B waits for A and pays a changeover.
/// assert!(allocation.items[1].completion > 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct TimelineAllocator<'a> {
    inventory: &'a MachineInventory,
    config: AllocatorConfig,
    lanes: BTreeMap<String, Vec<Vec<TimeSlot>>>,
    items: Vec<ItemTimeline>,
}

impl<'a> TimelineAllocator<'a> {
    /// Creates an allocator with empty timelines.
    pub fn new(inventory: &'a MachineInventory, config: AllocatorConfig) -> Self {
        let lanes = inventory
            .iter()
            .map(|(machine_type, n)| (machine_type.to_string(), vec![Vec::new(); n as usize]))
            .collect();
        Self {
            inventory,
            config,
            lanes,
            items: Vec::new(),
        }
    }

    /// Allocates items in the given order and finalizes the timelines.
    ///
    /// `order` holds indices into `items`. Each item starts no earlier than
    /// the completion of the item before it.
    pub fn allocate(
        items: &[WorkItem],
        order: &[usize],
        inventory: &MachineInventory,
        config: AllocatorConfig,
    ) -> Result<Allocation, AllocationError> {
        let mut allocator = TimelineAllocator::new(inventory, config);
        let mut released = 0.0;
        for &index in order {
            let completion = allocator.place_item(index, &items[index], released)?;
            released = f64::max(released, completion);
        }
        Ok(allocator.finish())
    }

    /// Places every batch of every step of one item, probing from
    /// `earliest_start`.
    ///
    /// Returns the item's completion time.
    pub fn place_item(&mut self, index: usize, item: &WorkItem, earliest_start: f64) -> Result<f64, AllocationError> {
        let steps = item.steps();
        let mut cursor = earliest_start.max(0.0);
        let mut start: Option<f64> = None;
        let mut outputs = Vec::new();

        for (step_idx, step) in steps.iter().enumerate() {
            let total = step.batches_for(item.quantity);
            let is_last = step_idx + 1 == steps.len();

            for batch in 1..=total {
                let slot = self.place_batch(step, item, batch, total, cursor)?;
                start = Some(start.map_or(slot.occupied_start(), |s| s.min(slot.occupied_start())));
                cursor = slot.end;

                if is_last {
                    let produced = (batch - 1).saturating_mul(step.batch_size);
                    outputs.push(BatchOutput {
                        end: slot.end,
                        units: step.batch_size.min(item.quantity.saturating_sub(produced)),
                    });
                }
            }
        }

        self.items.push(ItemTimeline {
            index,
            item_id: item.id.clone(),
            start: start.unwrap_or(earliest_start),
            completion: cursor,
            outputs,
        });
        Ok(cursor)
    }

    /// Materializes idle slots and per-machine metrics.
    pub fn finish(self) -> Allocation {
        let machine_schedules: Vec<_> = self
            .lanes
            .into_iter()
            .map(|(machine_type, lanes)| {
                let instances = self.inventory.instances(&machine_type).unwrap_or(0);
                finalize_machine(&machine_type, instances, lanes)
            })
            .collect();

        debug!(
            items = self.items.len(),
            machine_types = machine_schedules.len(),
            "machine timelines allocated"
        );

        Allocation {
            machine_schedules,
            items: self.items,
        }
    }

    fn place_batch(
        &mut self,
        step: &MachineStep,
        item: &WorkItem,
        batch: u32,
        total: u32,
        cursor: f64,
    ) -> Result<TimeSlot, AllocationError> {
        let setup_hours = self.config.setup_hours.max(0.0);
        let quantum = if self.config.probe_quantum_hours > TIME_EPSILON {
            self.config.probe_quantum_hours
        } else {
            DEFAULT_PROBE_QUANTUM_HOURS
        };

        let lanes = self
            .lanes
            .get_mut(&step.machine_type)
            .ok_or_else(|| AllocationError::UnknownMachineType {
                machine_type: step.machine_type.clone(),
            })?;
        if lanes.is_empty() {
            return Err(AllocationError::NoInstances {
                machine_type: step.machine_type.clone(),
            });
        }

        let duration = step.hours_per_batch;
        let mut k: u64 = 0;
        loop {
            let t = cursor + k as f64 * quantum;
            for (instance, lane) in lanes.iter_mut().enumerate() {
                let Some(setup) = probe(lane, &item.id, t, duration, setup_hours) else {
                    continue;
                };

                let start = t + setup;
                let slot = TimeSlot::batch(
                    step.machine_type.as_str(),
                    instance as u32,
                    item.id.as_str(),
                    item.name.as_str(),
                    batch,
                    total,
                    start,
                    start + duration,
                )
                .with_setup(setup);

                trace!(
                    machine = %step.machine_type,
                    instance,
                    item = %item.id,
                    batch,
                    start,
                    setup,
                    "batch placed"
                );

                let pos = lane.partition_point(|s| s.start < slot.start);
                lane.insert(pos, slot.clone());
                return Ok(slot);
            }
            k += 1;
        }
    }
}

/// Checks whether a batch can occupy `lane` from `t`.
///
/// Returns the changeover the batch needs there, or `None` when it collides
/// with an existing slot or would leave a following item without room for
/// its own changeover.
fn probe(lane: &[TimeSlot], item_id: &str, t: f64, duration: f64, setup_hours: f64) -> Option<f64> {
    let setup = match lane
        .iter()
        .filter(|s| s.end <= t + TIME_EPSILON)
        .max_by(|a, b| a.end.total_cmp(&b.end))
    {
        Some(prev) if prev.item_id != item_id => setup_hours,
        _ => 0.0,
    };
    let occupied_end = t + setup + duration;

    let collides = lane
        .iter()
        .any(|s| s.occupied_start() < occupied_end - TIME_EPSILON && t < s.end - TIME_EPSILON);
    if collides {
        return None;
    }

    let next = lane
        .iter()
        .filter(|s| s.occupied_start() >= occupied_end - TIME_EPSILON)
        .min_by(|a, b| a.occupied_start().total_cmp(&b.occupied_start()));
    if let Some(next) = next {
        let needs_room = next.item_id != item_id && next.setup_hours <= TIME_EPSILON;
        if needs_room && next.occupied_start() < occupied_end + setup_hours - TIME_EPSILON {
            return None;
        }
    }

    Some(setup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn single(id: &str, qty: u32, machine: &str, batch: u32, hours: f64) -> WorkItem {
        WorkItem::routed(id, qty, due()).with_step(MachineStep::new(machine, batch, hours))
    }

    fn no_setup() -> AllocatorConfig {
        AllocatorConfig::default().with_setup_hours(0.0)
    }

    #[test]
    fn test_single_item_sequential_batches() {
        let inventory = MachineInventory::new().with_machine("mill", 2);
        let items = vec![single("A", 30, "mill", 10, 1.0)];
        let alloc = TimelineAllocator::allocate(&items, &[0], &inventory, no_setup()).unwrap();

        // Batches of one item never run in parallel.
        let it = &alloc.items[0];
        assert!((it.completion - 3.0).abs() < 1e-10);
        assert_eq!(it.outputs.len(), 3);
        assert_eq!(it.outputs.iter().map(|o| o.units).sum::<u32>(), 30);
    }

    #[test]
    fn test_second_item_takes_first_free_instance() {
        let inventory = MachineInventory::new().with_machine("mill", 2);
        let items = vec![single("A", 10, "mill", 10, 2.0), single("B", 10, "mill", 10, 2.0)];
        let alloc = TimelineAllocator::allocate(&items, &[0, 1], &inventory, AllocatorConfig::default()).unwrap();

        // both instances are free once A completes; the lower index wins
        let mill = &alloc.machine_schedules[0];
        let b = mill.slots.iter().find(|s| s.item_id == "B").unwrap();
        assert_eq!(b.instance, 0);
        assert!((b.occupied_start() - 2.0).abs() < 1e-10);
        assert!(b.setup_hours > 0.0);
    }

    #[test]
    fn test_changeover_on_shared_instance() {
        let inventory = MachineInventory::new().with_machine("mill", 1);
        let items = vec![single("A", 10, "mill", 10, 2.0), single("B", 10, "mill", 10, 1.0)];
        let config = AllocatorConfig::default().with_setup_hours(0.25);
        let alloc = TimelineAllocator::allocate(&items, &[0, 1], &inventory, config).unwrap();

        let b = &alloc.items[1];
        assert!((b.start - 2.0).abs() < 1e-10);
        assert!((b.completion - 3.25).abs() < 1e-10);
    }

    #[test]
    fn test_same_item_no_changeover() {
        let inventory = MachineInventory::new().with_machine("mill", 1);
        let items = vec![single("A", 20, "mill", 10, 1.0)];
        let alloc = TimelineAllocator::allocate(&items, &[0], &inventory, AllocatorConfig::default()).unwrap();
        let mill = &alloc.machine_schedules[0];
        assert!(mill.slots.iter().all(|s| s.setup_hours == 0.0));
        assert!((alloc.makespan() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_steps_are_sequential() {
        let inventory = MachineInventory::new()
            .with_machine("mill", 1)
            .with_machine("press", 1);
        let items = vec![WorkItem::routed("A", 10, due())
            .with_step(MachineStep::new("mill", 10, 1.5))
            .with_step(MachineStep::new("press", 5, 0.5))];
        let alloc = TimelineAllocator::allocate(&items, &[0], &inventory, no_setup()).unwrap();

        let press = alloc
            .machine_schedules
            .iter()
            .find(|m| m.machine_type == "press")
            .unwrap();
        let first = press.slots_on(0)[0];
        assert!(first.start >= 1.5 - 1e-10);
        assert!((alloc.items[0].completion - 2.5).abs() < 1e-10);
        assert_eq!(alloc.items[0].outputs.len(), 2);
    }

    #[test]
    fn test_next_item_waits_for_previous_completion() {
        // mill is free while A runs on press, but B may not jump ahead of A
        let inventory = MachineInventory::new()
            .with_machine("mill", 1)
            .with_machine("press", 1);
        let items = vec![
            WorkItem::routed("A", 1, due())
                .with_step(MachineStep::new("press", 1, 2.0))
                .with_step(MachineStep::new("mill", 1, 1.0)),
            single("B", 1, "mill", 1, 1.0),
        ];
        let config = AllocatorConfig::default().with_setup_hours(0.25);
        let alloc = TimelineAllocator::allocate(&items, &[0, 1], &inventory, config).unwrap();

        let mill = alloc.machine_schedules.iter().find(|m| m.machine_type == "mill").unwrap();
        let a = mill.slots.iter().find(|s| s.item_id == "A").unwrap();
        let b = mill.slots.iter().find(|s| s.item_id == "B").unwrap();
        assert!((a.start - 2.0).abs() < 1e-10);
        assert!(b.occupied_start() >= a.end - 1e-10);
        assert!((b.setup_hours - 0.25).abs() < 1e-10);
        assert!((alloc.items[1].start - 3.0).abs() < 1e-10);
        assert!((alloc.items[1].completion - 4.25).abs() < 1e-10);
    }

    #[test]
    fn test_gap_respects_successor_changeover() {
        let mut lane = vec![TimeSlot::batch("mill", 0, "A", "A", 1, 1, 2.0, 3.0)];
        // 0.0..2.0 would touch A with no room for A's changeover.
        assert_eq!(probe(&lane, "B", 0.0, 2.0, 0.25), None);
        assert_eq!(probe(&lane, "B", 0.0, 1.75, 0.25), Some(0.0));
        // Same item needs no room.
        assert_eq!(probe(&lane, "A", 0.0, 2.0, 0.25), Some(0.0));

        lane[0].setup_hours = 0.25;
        lane[0].start = 2.25;
        assert_eq!(probe(&lane, "B", 0.0, 2.0, 0.25), Some(0.0));
    }

    #[test]
    fn test_unknown_machine_type() {
        let inventory = MachineInventory::new().with_machine("mill", 1);
        let items = vec![single("A", 1, "oven", 1, 1.0)];
        let err = TimelineAllocator::allocate(&items, &[0], &inventory, no_setup()).unwrap_err();
        assert!(matches!(err, AllocationError::UnknownMachineType { .. }));
    }

    #[test]
    fn test_zero_instances() {
        let inventory = MachineInventory::new().with_machine("mill", 0);
        let items = vec![single("A", 1, "mill", 1, 1.0)];
        let err = TimelineAllocator::allocate(&items, &[0], &inventory, no_setup()).unwrap_err();
        assert_eq!(
            err,
            AllocationError::NoInstances {
                machine_type: "mill".into()
            }
        );
    }

    #[test]
    fn test_quantum_probing_grid() {
        let inventory = MachineInventory::new().with_machine("mill", 1);
        let mut allocator = TimelineAllocator::new(&inventory, no_setup());
        allocator.place_item(0, &single("A", 1, "mill", 1, 0.6), 0.0).unwrap();

        // B probes 0.0, 0.25, 0.5, 0.75 and lands on the first grid point after A.
        let completion = allocator.place_item(1, &single("B", 1, "mill", 1, 1.0), 0.0).unwrap();
        assert!((completion - 1.75).abs() < 1e-10);
        let alloc = allocator.finish();
        assert!((alloc.items[1].start - 0.75).abs() < 1e-10);
    }

    #[test]
    fn test_earliest_start_is_respected() {
        let inventory = MachineInventory::new().with_machine("mill", 2);
        let mut allocator = TimelineAllocator::new(&inventory, no_setup());
        let completion = allocator.place_item(0, &single("A", 20, "mill", 10, 1.0), 1.5).unwrap();
        assert!((completion - 3.5).abs() < 1e-10);
        assert!((allocator.finish().items[0].start - 1.5).abs() < 1e-10);
    }
}
