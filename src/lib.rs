//! Factory production scheduling.
//!
//! Given work orders (quantity, deadline, and either a per-unit duration or
//! a machine routing with batch sizes) and a factory (working hours per day,
//! machine inventory), computes which units are produced on which day and,
//! for routed work, on which machine instance and when.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `WorkItem`, `FactoryConfig`, `ProductConfig`, `TimeSlot`,
//!   `DaySchedule`, `ScheduleResult`
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling machine
//!   types, non-positive quantities and capacities)
//! - **`normalize`**: Batch counts, durations and urgency per work item
//! - **`timeline`**: Machine timeline allocator with changeover time
//! - **`bucket`**: Continuous time and batch assignments into calendar days
//! - **`evaluate`**: Composite cost and genetic fitness
//! - **`dispatching`**: Urgency and due-date ranking rules
//! - **`strategy`**: Exhaustive, genetic, integer-program and
//!   earliest-deadline search behind one `optimize` entry point
//! - **`assemble`**: The uniform result shape
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use u_production::{optimize, FactoryConfig, ScheduleRequest, Strategy, WorkItem};
//!
//! let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
//! let items = vec![
//!     WorkItem::per_unit("bolts", 12, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), 1.0),
//!     WorkItem::per_unit("nuts", 4, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(), 1.0),
//! ];
//! let request = ScheduleRequest::new(items, FactoryConfig::new(8.0), today)
//!     .with_strategy(Strategy::earliest_deadline());
//!
//! let result = optimize(&request).unwrap();
//! assert_eq!(result.production_sequence(), vec!["nuts", "bolts"]);
//! assert_eq!(result.summary.total_days, 2);
//! assert_eq!(result.summary.late_items, 0);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Pochet & Wolsey (2006), "Production Planning by Mixed Integer Programming"

pub mod assemble;
pub mod bucket;
pub mod dispatching;
pub mod error;
pub mod evaluate;
pub mod models;
pub mod normalize;
pub mod strategy;
pub mod timeline;
pub mod validation;

pub use error::{Result, ScheduleError};
pub use models::{
    FactoryConfig, MachineInventory, MachineStep, Priority, ProductConfig, ScheduleResult, WorkItem,
};
pub use strategy::{optimize, CancelToken, Optimizer, PlanningOptions, ScheduleRequest, Strategy};
