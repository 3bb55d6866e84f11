use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use u_production::bucket::{bucket_assignments, bucket_sequential};
use u_production::models::{DaySchedule, FactoryConfig, MachineStep, WorkItem, TIME_EPSILON};
use u_production::normalize::normalize;
use u_production::strategy::edf::first_fit;
use u_production::strategy::EdfConfig;
use u_production::timeline::{AllocatorConfig, TimelineAllocator};

const MACHINES: [&str; 3] = ["cut", "weld", "paint"];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn per_unit_items() -> impl Strategy<Value = Vec<WorkItem>> {
    prop::collection::vec((1u32..40, 1u32..25, 0u64..15), 1..6).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (quantity, quarter_hours, days))| {
                WorkItem::per_unit(
                    format!("P{i}"),
                    quantity,
                    today() + Days::new(days),
                    f64::from(quarter_hours) * 0.25,
                )
            })
            .collect()
    })
}

fn routed_items() -> impl Strategy<Value = Vec<WorkItem>> {
    let step = (0usize..3, 1u32..8, 1u32..12);
    prop::collection::vec((1u32..30, prop::collection::vec(step, 1..4)), 1..5).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (quantity, steps))| {
                steps.into_iter().fold(
                    WorkItem::routed(format!("R{i}"), quantity, today() + Days::new(5)),
                    |item, (machine, batch_size, quarter_hours)| {
                        item.with_step(MachineStep::new(MACHINES[machine], batch_size, f64::from(quarter_hours) * 0.25))
                    },
                )
            })
            .collect()
    })
}

fn assert_day_invariants(days: &[DaySchedule]) -> Result<(), TestCaseError> {
    for day in days {
        let sum: f64 = day.allocations.iter().map(|a| a.hours_used).sum();
        prop_assert!((sum - day.total_hours_used).abs() < 1e-6, "day {} sum {sum} != {}", day.day, day.total_hours_used);
        prop_assert!(day.idle_hours * day.overtime_hours == 0.0);
        prop_assert!(day.idle_hours >= 0.0 && day.overtime_hours >= 0.0);
    }
    Ok(())
}

proptest! {
    #[test]
    fn allocator_never_overlaps_slots_on_an_instance(
        items in routed_items(),
        seed in any::<u64>(),
        instances in prop::collection::vec(1u32..3, 3),
    ) {
        let mut factory = FactoryConfig::new(8.0);
        for (machine, n) in MACHINES.iter().zip(&instances) {
            factory = factory.with_machine(*machine, *n);
        }
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.rotate_left(seed as usize % items.len());

        let allocation =
            TimelineAllocator::allocate(&items, &order, &factory.machine_inventory, AllocatorConfig::default()).unwrap();

        for machine in &allocation.machine_schedules {
            for instance in 0..machine.instances {
                let mut slots = machine.slots_on(instance);
                slots.sort_by(|a, b| a.occupied_start().total_cmp(&b.occupied_start()));
                for pair in slots.windows(2) {
                    prop_assert!(
                        pair[1].occupied_start() >= pair[0].end - TIME_EPSILON,
                        "{} instance {instance}: {:?} overlaps {:?}", machine.machine_type, pair[0], pair[1]
                    );
                }
            }
        }

        for pair in allocation.items.windows(2) {
            prop_assert!(
                pair[1].start >= pair[0].completion - TIME_EPSILON,
                "{} starts at {} before {} completes at {}", pair[1].item_id, pair[1].start, pair[0].item_id, pair[0].completion
            );
        }

        for (timeline, item) in allocation.items.iter().map(|t| (t, &items[t.index])) {
            let units: u32 = timeline.outputs.iter().map(|o| o.units).sum();
            prop_assert_eq!(units, item.quantity);
        }
    }

    #[test]
    fn sequential_buckets_balance(items in per_unit_items()) {
        let work = normalize(&items, &FactoryConfig::new(8.0), today()).unwrap();
        let order: Vec<usize> = (0..items.len()).rev().collect();
        let days = bucket_sequential(&work.metrics, &order, 8.0, today());

        assert_day_invariants(&days)?;
        for item in &items {
            let units: u32 = days.iter().map(|d| d.units_for(&item.id)).sum();
            prop_assert_eq!(units, item.quantity);
        }
    }

    #[test]
    fn earliest_deadline_buckets_balance(items in per_unit_items()) {
        let work = normalize(&items, &FactoryConfig::new(8.0), today()).unwrap();
        let (sequence, assignments) = first_fit(&work.metrics, 8.0, &EdfConfig::default());
        prop_assert_eq!(sequence.len(), items.len());

        let days = bucket_assignments(&work.metrics, &assignments, 8.0, today());
        assert_day_invariants(&days)?;
        for day in &days {
            // only a lone oversize batch may exceed the day
            if day.overtime_hours > 0.0 {
                prop_assert_eq!(day.allocations.len(), 1);
            }
        }
        for item in &items {
            let units: u32 = days.iter().map(|d| d.units_for(&item.id)).sum();
            prop_assert_eq!(units, item.quantity);
        }
    }
}
