//! Work normalization.
//!
//! Turns caller-owned work items into [`OrderMetrics`]: batch counts,
//! per-batch durations, total work and urgency. Metrics are derived afresh
//! for every run and never mutated afterwards.
//!
//! # Batch model
//!
//! - Per-unit items: one unit per batch, `hours_per_batch = hours_per_unit`.
//! - Cataloged items: `ceil(q / units_per_batch)` cycles of the product's
//!   full cycle time.
//! - Machine-routed items: each step needs `ceil(q / batch_size)` runs; the
//!   item's batch count is the largest of these, and its total work
//!   (all steps, all runs) is spread evenly over that many batches.

use chrono::NaiveDate;

use crate::error::{Result, ScheduleError};
use crate::models::{FactoryConfig, Priority, ProcessingModel, WorkItem};
use crate::validation::{missing_product, validate_input};

/// Which processing representation is active for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    /// Scalar batch durations (per-unit or cataloged) on a single shared
    /// capacity.
    PerUnit,
    /// Machine routings allocated on the machine inventory.
    MachineAware,
}

/// Derived quantities for one work item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderMetrics {
    /// Position of the item in the caller's input.
    pub index: usize,
    /// Work item id.
    pub item_id: String,
    /// Work item name.
    pub name: String,
    /// Ordered quantity.
    pub quantity: u32,
    /// Due date.
    pub deadline: NaiveDate,
    /// Batches needed to produce the quantity.
    pub batches_needed: u32,
    /// Units in a full batch.
    pub batch_size: u32,
    /// Hours per batch.
    pub hours_per_batch: f64,
    /// Total hours of work.
    pub total_hours: f64,
    /// Days from the reference date to the deadline (may be negative).
    pub days_until_deadline: i64,
    /// Explicit or deadline-derived priority.
    pub priority: Priority,
    /// `weight × 1000 − max(0, days_until_deadline)`; higher = more urgent.
    pub urgency_score: i64,
}

impl OrderMetrics {
    /// Units in a given batch (1-based); the last batch may be partial.
    pub fn units_in_batch(&self, batch: u32) -> u32 {
        if batch == 0 || batch > self.batches_needed {
            return 0;
        }
        let produced_before = (batch - 1).saturating_mul(self.batch_size);
        self.batch_size.min(self.quantity.saturating_sub(produced_before))
    }

    /// Units covered by an inclusive range of batches.
    pub fn units_in_batches(&self, first: u32, last: u32) -> u32 {
        (first..=last).map(|b| self.units_in_batch(b)).sum()
    }
}

/// Normalized input for one optimization run.
#[derive(Debug, Clone)]
pub struct NormalizedWork {
    /// Active processing representation.
    pub mode: SchedulingMode,
    /// Metrics in input order.
    pub metrics: Vec<OrderMetrics>,
}

impl NormalizedWork {
    /// Number of work items.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Total hours of work across all items.
    pub fn total_hours(&self) -> f64 {
        self.metrics.iter().map(|m| m.total_hours).sum()
    }
}

/// Validates the input and derives metrics for every work item.
///
/// # Errors
/// `ScheduleError::InvalidInput` listing every problem found.
pub fn normalize(
    items: &[WorkItem],
    factory: &FactoryConfig,
    reference_date: NaiveDate,
) -> Result<NormalizedWork> {
    validate_input(items, factory)?;
    derive(items, factory, reference_date)
}

/// Derives metrics for input that has already been validated.
pub(crate) fn derive(
    items: &[WorkItem],
    factory: &FactoryConfig,
    reference_date: NaiveDate,
) -> Result<NormalizedWork> {
    let mode = if items
        .iter()
        .any(|i| matches!(i.processing, ProcessingModel::MachineSequence(_)))
    {
        SchedulingMode::MachineAware
    } else {
        SchedulingMode::PerUnit
    };

    let metrics = items
        .iter()
        .enumerate()
        .map(|(index, item)| compute_metrics(index, item, factory, reference_date))
        .collect::<Result<Vec<_>>>()?;

    Ok(NormalizedWork { mode, metrics })
}

/// Derives metrics for a single (already validated) work item.
///
/// # Errors
/// `InvalidInput` with `MissingProductConfig` if a cataloged item's
/// product is not in `factory`.
pub fn compute_metrics(
    index: usize,
    item: &WorkItem,
    factory: &FactoryConfig,
    reference_date: NaiveDate,
) -> Result<OrderMetrics> {
    let (batches_needed, batch_size, hours_per_batch, total_hours) = match &item.processing {
        ProcessingModel::PerUnit { hours_per_unit } => (
            item.quantity,
            1,
            *hours_per_unit,
            f64::from(item.quantity) * hours_per_unit,
        ),
        ProcessingModel::Cataloged { product_id } => {
            let product = factory
                .product(product_id)
                .ok_or_else(|| ScheduleError::InvalidInput(vec![missing_product(&item.id, product_id)]))?;
            let batches = item.quantity.div_ceil(product.units_per_batch.max(1));
            let cycle = product.hours_per_batch();
            (batches, product.units_per_batch, cycle, f64::from(batches) * cycle)
        }
        ProcessingModel::MachineSequence(steps) => {
            let total: f64 = steps
                .iter()
                .map(|s| f64::from(s.batches_for(item.quantity)) * s.hours_per_batch)
                .sum();
            let batches = steps
                .iter()
                .map(|s| s.batches_for(item.quantity))
                .max()
                .unwrap_or(0)
                .max(1);
            let size = item.quantity.div_ceil(batches);
            (batches, size, total / f64::from(batches), total)
        }
    };

    let days_until_deadline = item.days_until_deadline(reference_date);
    let priority = item.effective_priority(reference_date);
    let urgency_score = priority.weight() * 1000 - days_until_deadline.max(0);

    Ok(OrderMetrics {
        index,
        item_id: item.id.clone(),
        name: item.name.clone(),
        quantity: item.quantity,
        deadline: item.deadline,
        batches_needed,
        batch_size,
        hours_per_batch,
        total_hours,
        days_until_deadline,
        priority,
        urgency_score,
    })
}
