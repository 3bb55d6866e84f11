//! Production scheduling domain models.
//!
//! Inputs (`WorkItem`, `FactoryConfig`) are owned by the caller and never
//! mutated. Outputs (`ScheduleResult` and its parts) are rebuilt from
//! scratch on every optimization run.
//!
//! # Domain Mappings
//!
//! | u-production | Factory floor |
//! |--------------|---------------|
//! | WorkItem | Production order |
//! | MachineStep | Routing operation |
//! | MachineInventory | Machine park |
//! | ProductConfig | Mold cycle |
//! | TimeSlot | Machine booking |
//! | DaySchedule | Daily plan |

mod factory;
mod product;
mod schedule;
mod work_item;

pub use factory::{FactoryConfig, MachineInventory};
pub use product::ProductConfig;
pub use schedule::{
    DayAllocation, DaySchedule, MachineSchedule, ScheduleResult, ScheduleSummary,
    ScheduledItem, TimeSlot, TIME_EPSILON,
};
pub use work_item::{MachineStep, Priority, ProcessingModel, WorkItem};
