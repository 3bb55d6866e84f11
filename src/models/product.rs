//! Product catalog.
//!
//! A product configuration describes one molding cycle: how many units a
//! cycle yields and how long each phase of the cycle takes. Work items that
//! reference a product by ID take their batch size and batch duration from
//! here instead of carrying them inline.

use serde::{Deserialize, Serialize};

/// One cataloged product.
///
/// # Batch time
/// `processing + cooling + mold_refill + finishing`, all in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Unique product identifier referenced by work items.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Units produced by one cycle (all compartments together).
    pub units_per_batch: u32,
    #[serde(default)]
    pub processing_hours: f64,
    #[serde(default)]
    pub cooling_hours: f64,
    #[serde(default)]
    pub mold_refill_hours: f64,
    #[serde(default)]
    pub finishing_hours: f64,
}

impl ProductConfig {
    /// Creates a product with zero-length phases.
    pub fn new(id: impl Into<String>, units_per_batch: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            units_per_batch,
            processing_hours: 0.0,
            cooling_hours: 0.0,
            mold_refill_hours: 0.0,
            finishing_hours: 0.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_processing(mut self, hours: f64) -> Self {
        self.processing_hours = hours;
        self
    }

    pub fn with_cooling(mut self, hours: f64) -> Self {
        self.cooling_hours = hours;
        self
    }

    pub fn with_mold_refill(mut self, hours: f64) -> Self {
        self.mold_refill_hours = hours;
        self
    }

    pub fn with_finishing(mut self, hours: f64) -> Self {
        self.finishing_hours = hours;
        self
    }

    /// Phase durations in cycle order.
    pub fn phases(&self) -> [(&'static str, f64); 4] {
        [
            ("processing", self.processing_hours),
            ("cooling", self.cooling_hours),
            ("mold refill", self.mold_refill_hours),
            ("finishing", self.finishing_hours),
        ]
    }

    /// Length of one full cycle.
    #[inline]
    pub fn hours_per_batch(&self) -> f64 {
        self.phases().iter().map(|(_, h)| h).sum()
    }
}
