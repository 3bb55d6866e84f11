//! Factory capacity model.
//!
//! Working hours per day bound the calendar schedule; the machine inventory
//! says how many physical instances of each machine type run in parallel;
//! the product catalog holds cycle times for cataloged work.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ProductConfig;

/// Machine type → number of instances.
///
/// Ordered by machine type so that timelines and reports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineInventory {
    counts: BTreeMap<String, u32>,
}

impl MachineInventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a machine type.
    pub fn with_machine(mut self, machine_type: impl Into<String>, instances: u32) -> Self {
        self.counts.insert(machine_type.into(), instances);
        self
    }

    /// Instance count for a machine type, `None` if unknown.
    pub fn instances(&self, machine_type: &str) -> Option<u32> {
        self.counts.get(machine_type).copied()
    }

    /// Whether the machine type has an inventory entry.
    pub fn contains(&self, machine_type: &str) -> bool {
        self.counts.contains_key(machine_type)
    }

    /// Sum of instances across all machine types, saturating at `u32::MAX`.
    pub fn total_instances(&self) -> u32 {
        self.counts.values().fold(0u32, |acc, &n| acc.saturating_add(n))
    }

    /// Iterates `(machine_type, instances)` in machine-type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Number of machine types.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no machine types are configured.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Factory configuration shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Working hours available per calendar day.
    pub working_hours_per_day: f64,
    /// Parallel machine instances per machine type.
    #[serde(default)]
    pub machine_inventory: MachineInventory,
    /// Product catalog referenced by cataloged work items.
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

impl FactoryConfig {
    /// Creates a configuration with the given daily hours and no machines.
    pub fn new(working_hours_per_day: f64) -> Self {
        Self {
            working_hours_per_day,
            machine_inventory: MachineInventory::new(),
            products: Vec::new(),
        }
    }

    /// Adds a machine type.
    pub fn with_machine(mut self, machine_type: impl Into<String>, instances: u32) -> Self {
        self.machine_inventory = self.machine_inventory.with_machine(machine_type, instances);
        self
    }

    /// Adds a product to the catalog.
    pub fn with_product(mut self, product: ProductConfig) -> Self {
        self.products.push(product);
        self
    }

    /// Looks up a cataloged product; the first entry wins on duplicate IDs.
    pub fn product(&self, id: &str) -> Option<&ProductConfig> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Daily capacity in hours.
    #[inline]
    pub fn daily_capacity(&self) -> f64 {
        self.working_hours_per_day
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self::new(8.0)
    }
}
