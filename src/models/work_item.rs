//! Work item (production order) model.
//!
//! A work item is a unit of demand: a product, a quantity and a deadline,
//! together with how the product is processed. Work items are owned by the
//! caller and read-only to the optimizer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One machine operation in a product's routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStep {
    /// Machine type this step runs on (key into the machine inventory).
    pub machine_type: String,
    /// Maximum units processed together in one run.
    pub batch_size: u32,
    /// Processing time of one batch (hours).
    pub hours_per_batch: f64,
}

impl MachineStep {
    /// Creates a new machine step.
    pub fn new(machine_type: impl Into<String>, batch_size: u32, hours_per_batch: f64) -> Self {
        Self {
            machine_type: machine_type.into(),
            batch_size,
            hours_per_batch,
        }
    }

    /// Number of batches needed to process `quantity` units.
    pub fn batches_for(&self, quantity: u32) -> u32 {
        if self.batch_size == 0 {
            return 0;
        }
        quantity.div_ceil(self.batch_size)
    }
}

/// How a work item consumes capacity.
///
/// Exactly one representation is active per scheduling run; see
/// [`SchedulingMode`](crate::normalize::SchedulingMode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingModel {
    /// Scalar processing time per unit (hours), single shared resource.
    PerUnit {
        /// Hours needed for one unit.
        hours_per_unit: f64,
    },
    /// Ordered machine routing with per-step batch sizes.
    MachineSequence(Vec<MachineStep>),
    /// Batch size and cycle time from the factory's product catalog.
    Cataloged {
        /// Key into [`FactoryConfig::products`](crate::models::FactoryConfig::products).
        product_id: String,
    },
}

/// Explicit order priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Multiplier used in the urgency score.
    pub fn weight(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Derives a tier from deadline proximity.
    ///
    /// Three days or fewer is High, a week or fewer is Medium.
    pub fn from_days_until_deadline(days: i64) -> Self {
        if days <= 3 {
            Priority::High
        } else if days <= 7 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// A production order to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier.
    pub id: String,
    /// Display name (product name).
    pub name: String,
    /// Units to produce.
    pub quantity: u32,
    /// Calendar date by which the order is due.
    pub deadline: NaiveDate,
    /// Processing representation.
    pub processing: ProcessingModel,
    /// Explicit priority. `None` = derived from the deadline.
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl WorkItem {
    /// Creates a per-unit work item.
    pub fn per_unit(
        id: impl Into<String>,
        quantity: u32,
        deadline: NaiveDate,
        hours_per_unit: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            quantity,
            deadline,
            processing: ProcessingModel::PerUnit { hours_per_unit },
            priority: None,
        }
    }

    /// Creates a machine-routed work item with no steps yet.
    pub fn routed(id: impl Into<String>, quantity: u32, deadline: NaiveDate) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            quantity,
            deadline,
            processing: ProcessingModel::MachineSequence(Vec::new()),
            priority: None,
        }
    }

    /// Creates a work item for a cataloged product.
    pub fn cataloged(
        id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: u32,
        deadline: NaiveDate,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            quantity,
            deadline,
            processing: ProcessingModel::Cataloged {
                product_id: product_id.into(),
            },
            priority: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets an explicit priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Appends a machine step, switching the item to the machine model.
    pub fn with_step(mut self, step: MachineStep) -> Self {
        match &mut self.processing {
            ProcessingModel::MachineSequence(steps) => steps.push(step),
            ProcessingModel::PerUnit { .. } | ProcessingModel::Cataloged { .. } => {
                self.processing = ProcessingModel::MachineSequence(vec![step]);
            }
        }
        self
    }

    /// Machine steps, empty for per-unit items.
    pub fn steps(&self) -> &[MachineStep] {
        match &self.processing {
            ProcessingModel::MachineSequence(steps) => steps,
            ProcessingModel::PerUnit { .. } | ProcessingModel::Cataloged { .. } => &[],
        }
    }

    /// Referenced catalog product, if any.
    pub fn product_id(&self) -> Option<&str> {
        match &self.processing {
            ProcessingModel::Cataloged { product_id } => Some(product_id.as_str()),
            _ => None,
        }
    }

    /// Whole days between `reference` and the deadline (negative if past).
    pub fn days_until_deadline(&self, reference: NaiveDate) -> i64 {
        (self.deadline - reference).num_days()
    }

    /// Explicit priority, or the tier implied by the deadline.
    pub fn effective_priority(&self, reference: NaiveDate) -> Priority {
        self.priority
            .unwrap_or_else(|| Priority::from_days_until_deadline(self.days_until_deadline(reference)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_work_item_builder() {
        let item = WorkItem::routed("O1", 120, date(2025, 3, 10))
            .with_name("Gasket")
            .with_priority(Priority::High)
            .with_step(MachineStep::new("mill", 50, 1.5))
            .with_step(MachineStep::new("press", 40, 2.0));

        assert_eq!(item.name, "Gasket");
        assert_eq!(item.priority, Some(Priority::High));
        assert_eq!(item.steps().len(), 2);
        assert_eq!(item.steps()[1].machine_type, "press");
    }

    #[test]
    fn test_batches_for_rounds_up() {
        let step = MachineStep::new("mill", 50, 1.0);
        assert_eq!(step.batches_for(120), 3);
        assert_eq!(step.batches_for(100), 2);
        assert_eq!(step.batches_for(1), 1);
        assert_eq!(MachineStep::new("x", 0, 1.0).batches_for(10), 0);
    }

    #[test]
    fn test_derived_priority() {
        let today = date(2025, 3, 1);
        let soon = WorkItem::per_unit("A", 1, date(2025, 3, 4), 1.0);
        let week = WorkItem::per_unit("B", 1, date(2025, 3, 8), 1.0);
        let later = WorkItem::per_unit("C", 1, date(2025, 3, 20), 1.0);

        assert_eq!(soon.effective_priority(today), Priority::High);
        assert_eq!(week.effective_priority(today), Priority::Medium);
        assert_eq!(later.effective_priority(today), Priority::Low);
        assert_eq!(
            later.with_priority(Priority::High).effective_priority(today),
            Priority::High
        );
    }

    #[test]
    fn test_days_until_deadline_can_be_negative() {
        let item = WorkItem::per_unit("A", 1, date(2025, 2, 27), 1.0);
        assert_eq!(item.days_until_deadline(date(2025, 3, 1)), -2);
    }

    #[test]
    fn test_per_unit_has_no_steps() {
        let item = WorkItem::per_unit("A", 5, date(2025, 3, 1), 0.5);
        assert!(item.steps().is_empty());
        assert_eq!(item.product_id(), None);
    }

    #[test]
    fn test_cataloged_item() {
        let item = WorkItem::cataloged("O7", "tray", 48, date(2025, 3, 5)).with_name("Ice trays");
        assert_eq!(item.product_id(), Some("tray"));
        assert!(item.steps().is_empty());

        let json = serde_json::to_string(&item.processing).unwrap();
        assert_eq!(json, r#"{"cataloged":{"product_id":"tray"}}"#);
    }
}
