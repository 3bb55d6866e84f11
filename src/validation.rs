//! Input validation for production scheduling.
//!
//! Checks structural integrity of work items and factory capacity before
//! any strategy runs. Detects:
//! - Duplicate work-item IDs
//! - Non-positive quantities, durations, batch sizes and daily hours
//! - Machine-type references missing from the inventory
//! - Machine types with zero instances
//! - Product references missing from the catalog, and malformed catalog entries
//! - Work items mixing processing models within one run
//!
//! Every problem found is reported; nothing is scheduled from invalid input.

use crate::models::{FactoryConfig, ProcessingModel, ProductConfig, WorkItem};
use std::collections::HashSet;
use std::fmt;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two work items share the same ID.
    DuplicateId,
    /// Quantity is zero.
    InvalidQuantity,
    /// A processing time is zero, negative or not finite.
    InvalidDuration,
    /// A machine step has batch size zero.
    InvalidBatchSize,
    /// A machine-routed item has no steps.
    EmptyRouting,
    /// A step references a machine type missing from the inventory.
    UnknownMachineType,
    /// A referenced machine type has zero instances.
    NoMachineInstances,
    /// A work item references a product missing from the catalog.
    MissingProductConfig,
    /// Working hours per day are not in (0, 24].
    InvalidCapacity,
    /// Per-unit and machine-routed items in the same run.
    MixedProcessingModels,
    /// More items than the selected strategy can handle.
    TooManyItems,
    /// A strategy tunable is out of range.
    InvalidParameter,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates work items against the factory configuration.
///
/// Checks:
/// 1. Working hours per day in (0, 24]
/// 2. No duplicate work-item IDs
/// 3. Quantities are positive
/// 4. Per-unit durations are positive and finite
/// 5. Machine routings are non-empty, with positive batch sizes and durations
/// 6. Every referenced machine type exists and has at least one instance
/// 7. Catalog entries have unique IDs, a positive batch size and a positive
///    cycle made of non-negative phases; every referenced product exists
/// 8. Per-unit or cataloged items are not mixed with machine-routed ones
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(items: &[WorkItem], factory: &FactoryConfig) -> ValidationResult {
    let mut errors = Vec::new();

    let hours = factory.working_hours_per_day;
    if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidCapacity,
            format!("Working hours per day must be in (0, 24], got {hours}"),
        ));
    }

    check_catalog(&factory.products, &mut errors);

    let mut ids = HashSet::new();
    let mut per_unit = 0usize;
    let mut routed = 0usize;

    for item in items {
        if !ids.insert(item.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate work item ID: {}", item.id),
            ));
        }

        if item.quantity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidQuantity,
                format!("Work item '{}' has quantity 0", item.id),
            ));
        }

        match &item.processing {
            ProcessingModel::PerUnit { hours_per_unit } => {
                per_unit += 1;
                if !is_positive(*hours_per_unit) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidDuration,
                        format!(
                            "Work item '{}' has invalid hours per unit {hours_per_unit}",
                            item.id
                        ),
                    ));
                }
            }
            ProcessingModel::Cataloged { product_id } => {
                per_unit += 1;
                if factory.product(product_id).is_none() {
                    errors.push(missing_product(&item.id, product_id));
                }
            }
            ProcessingModel::MachineSequence(steps) => {
                routed += 1;
                if steps.is_empty() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::EmptyRouting,
                        format!("Work item '{}' has no machine steps", item.id),
                    ));
                }
                for (i, step) in steps.iter().enumerate() {
                    check_step(item, i, step, factory, &mut errors);
                }
            }
        }
    }

    if per_unit > 0 && routed > 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::MixedProcessingModels,
            format!(
                "{per_unit} per-unit or cataloged and {routed} machine-routed work items cannot be scheduled together"
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub(crate) fn missing_product(item_id: &str, product_id: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::MissingProductConfig,
        format!("Work item '{item_id}' references unknown product '{product_id}'"),
    )
}

fn check_catalog(products: &[ProductConfig], errors: &mut Vec<ValidationError>) {
    let mut ids = HashSet::new();
    for product in products {
        if !ids.insert(product.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate product ID: {}", product.id),
            ));
        }

        if product.units_per_batch == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidBatchSize,
                format!("Product '{}' yields 0 units per batch", product.id),
            ));
        }

        for (phase, hours) in product.phases() {
            if !hours.is_finite() || hours < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDuration,
                    format!("Product '{}' has invalid {phase} time {hours}", product.id),
                ));
            }
        }
        if !is_positive(product.hours_per_batch()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!("Product '{}' has an empty cycle", product.id),
            ));
        }
    }
}

fn check_step(
    item: &WorkItem,
    index: usize,
    step: &crate::models::MachineStep,
    factory: &FactoryConfig,
    errors: &mut Vec<ValidationError>,
) {
    let position = index + 1;

    if step.batch_size == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidBatchSize,
            format!("Work item '{}' step {position} has batch size 0", item.id),
        ));
    }

    if !is_positive(step.hours_per_batch) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            format!(
                "Work item '{}' step {position} has invalid hours per batch {}",
                item.id, step.hours_per_batch
            ),
        ));
    }

    match factory.machine_inventory.instances(&step.machine_type) {
        None => errors.push(ValidationError::new(
            ValidationErrorKind::UnknownMachineType,
            format!(
                "Work item '{}' step {position} references unknown machine type '{}'",
                item.id, step.machine_type
            ),
        )),
        Some(0) => errors.push(ValidationError::new(
            ValidationErrorKind::NoMachineInstances,
            format!(
                "Machine type '{}' required by work item '{}' has no instances",
                step.machine_type, item.id
            ),
        )),
        Some(_) => {}
    }
}

#[inline]
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
