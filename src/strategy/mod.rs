//! Search strategies and the optimization entry point.
//!
//! Every strategy answers the same question: in which order (or on which
//! day) should each batch of work be produced? Callers pick a tagged
//! [`Strategy`] variant and receive the same [`ScheduleResult`] shape
//! whichever variant produced it.
//!
//! | Strategy | Output | Exact | Deterministic |
//! |----------|--------|-------|---------------|
//! | Exhaustive | ordering | yes (small N) | yes |
//! | Genetic | ordering | no | when seeded |
//! | IntegerProgram | day assignment | within horizon | yes |
//! | EarliestDeadline | day assignment | no | yes |
//!
//! Orderings are realized by the sequential day bucketer (per-unit work)
//! or by the machine timeline allocator (machine-routed work).
//!
//! # Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use u_production::models::{FactoryConfig, WorkItem};
//! use u_production::strategy::{optimize, ScheduleRequest, Strategy};
//!
//! let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
//! let request = ScheduleRequest::new(
//!     vec![WorkItem::per_unit("A", 10, due, 1.0)],
//!     FactoryConfig::new(8.0),
//!     today,
//! )
//! .with_strategy(Strategy::exhaustive());
//!
//! let result = optimize(&request).unwrap();
//! assert_eq!(result.summary.total_days, 2);
//! ```

mod cancel;
pub mod edf;
pub mod exhaustive;
pub mod ga;
pub mod milp;

pub use cancel::CancelToken;
pub use edf::{EdfConfig, EdfSortKey};
pub use exhaustive::ExhaustiveConfig;
pub use ga::GaConfig;
pub use milp::MilpConfig;

use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assemble::assemble;
use crate::bucket::{backfill_idle, bucket_assignments, bucket_machine_timeline, bucket_sequential, BatchAssignment};
use crate::error::{Result, ScheduleError};
use crate::evaluate::{evaluate_allocation, evaluate_days, ScheduleCost};
use crate::models::{DaySchedule, FactoryConfig, ScheduleResult, WorkItem};
use crate::normalize::{derive, NormalizedWork, OrderMetrics, SchedulingMode};
use crate::timeline::{
    AllocationError, Allocation, AllocatorConfig, TimelineAllocator, DEFAULT_PROBE_QUANTUM_HOURS,
    DEFAULT_SETUP_HOURS,
};
use crate::validation::{validate_input, ValidationError, ValidationErrorKind};

/// Strategy selection with its tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Every ordering, keep the cheapest.
    Exhaustive(ExhaustiveConfig),
    /// Population search over orderings.
    Genetic(GaConfig),
    /// Binary batch-to-day program with an earliest-deadline fallback.
    IntegerProgram(MilpConfig),
    /// Urgency-sorted first-fit over days.
    EarliestDeadline(EdfConfig),
}

impl Strategy {
    /// Exhaustive search with default limits.
    pub fn exhaustive() -> Self {
        Strategy::Exhaustive(ExhaustiveConfig::default())
    }

    /// Genetic search with default tunables.
    pub fn genetic() -> Self {
        Strategy::Genetic(GaConfig::default())
    }

    /// Integer program with default horizon.
    pub fn integer_program() -> Self {
        Strategy::IntegerProgram(MilpConfig::default())
    }

    /// Earliest-deadline heuristic sorted by urgency.
    pub fn earliest_deadline() -> Self {
        Strategy::EarliestDeadline(EdfConfig::default())
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Exhaustive(_) => "exhaustive",
            Strategy::Genetic(_) => "genetic",
            Strategy::IntegerProgram(_) => "integer_program",
            Strategy::EarliestDeadline(_) => "earliest_deadline",
        }
    }

    /// Checks the tunables against the number of work items.
    pub fn validate(&self, item_count: usize) -> Vec<ValidationError> {
        match self {
            Strategy::Exhaustive(config) => config.validate(item_count),
            Strategy::Genetic(config) => config.validate(),
            Strategy::IntegerProgram(config) => config.validate(),
            Strategy::EarliestDeadline(_) => Vec::new(),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::earliest_deadline()
    }
}

/// Options shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningOptions {
    /// Backfill the final day's idle time with extra production.
    pub include_extra: bool,
    /// Changeover time between different items on one machine (hours).
    pub setup_hours: f64,
    /// Start-time probing step of the timeline allocator (hours).
    pub probe_quantum_hours: f64,
}

impl Default for PlanningOptions {
    fn default() -> Self {
        Self {
            include_extra: false,
            setup_hours: DEFAULT_SETUP_HOURS,
            probe_quantum_hours: DEFAULT_PROBE_QUANTUM_HOURS,
        }
    }
}

impl PlanningOptions {
    /// Enables or disables idle backfill.
    pub fn with_extra_production(mut self, enabled: bool) -> Self {
        self.include_extra = enabled;
        self
    }

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

    /// Allocator settings derived from these options.
    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig::default()
            .with_setup_hours(self.setup_hours)
            .with_probe_quantum(self.probe_quantum_hours)
    }

    /// Checks the options.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.setup_hours.is_finite() || self.setup_hours < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParameter,
                format!("Setup hours must be non-negative, got {}", self.setup_hours),
            ));
        }
        if !self.probe_quantum_hours.is_finite() || self.probe_quantum_hours <= 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParameter,
                format!("Probe quantum must be positive, got {}", self.probe_quantum_hours),
            ));
        }
        errors
    }
}

/// Everything one optimization run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Work items to schedule.
    pub items: Vec<WorkItem>,
    /// Factory capacity.
    pub factory: FactoryConfig,
    /// The date of day 1.
    pub reference_date: NaiveDate,
    /// Selected strategy.
    #[serde(default)]
    pub strategy: Strategy,
    /// Shared options.
    #[serde(default)]
    pub options: PlanningOptions,
}

impl ScheduleRequest {
    /// Creates a request using the default strategy and options.
    pub fn new(items: Vec<WorkItem>, factory: FactoryConfig, reference_date: NaiveDate) -> Self {
        Self {
            items,
            factory,
            reference_date,
            strategy: Strategy::default(),
            options: PlanningOptions::default(),
        }
    }

    /// Parses a request from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the shared options.
    pub fn with_options(mut self, options: PlanningOptions) -> Self {
        self.options = options;
        self
    }

    /// Collects every problem with the request.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = validate_input(&self.items, &self.factory).err().unwrap_or_default();
        errors.extend(self.strategy.validate(self.items.len()));
        errors.extend(self.options.validate());
        errors
    }
}

/// Runs strategies against requests.
///
/// Holds nothing but the cancellation token; every run builds its own
/// buffers and timelines, so one optimizer may serve concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    cancel: CancelToken,
}

impl Optimizer {
    /// Creates an optimizer that is never cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes the given token at every search boundary.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Computes a schedule.
    ///
    /// # Errors
    /// - `InvalidInput` if the request fails validation.
    /// - `Cancelled` if the exhaustive or integer-program strategy is
    ///   stopped before it has an answer.
    pub fn optimize(&self, request: &ScheduleRequest) -> Result<ScheduleResult> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(ScheduleError::InvalidInput(errors));
        }

        let work = derive(&request.items, &request.factory, request.reference_date)?;
        if work.is_empty() {
            return Ok(ScheduleResult::empty());
        }

        let started = Instant::now();
        info!(
            strategy = request.strategy.name(),
            items = work.len(),
            mode = ?work.mode,
            total_hours = work.total_hours(),
            "optimization started"
        );

        let ctx = PlanningContext {
            request,
            work: &work,
            cancel: &self.cancel,
        };
        let plan = match &request.strategy {
            Strategy::Exhaustive(config) => exhaustive::search(&ctx, config)?,
            Strategy::Genetic(config) => ga::search(&ctx, config)?,
            Strategy::IntegerProgram(config) => milp::solve(&ctx, config)?,
            Strategy::EarliestDeadline(config) => edf::plan(&ctx, config),
        };
        let result = ctx.finish(plan);

        info!(
            strategy = request.strategy.name(),
            total_days = result.summary.total_days,
            late_items = result.summary.late_items,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "optimization finished"
        );
        Ok(result)
    }
}

/// Runs `request` with a fresh, never-cancelled optimizer.
pub fn optimize(request: &ScheduleRequest) -> Result<ScheduleResult> {
    Optimizer::new().optimize(request)
}

/// What a strategy hands back before assembly.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    /// An ordering already realized into days (and timelines).
    Ordering(Realized),
    /// Batches placed directly on days.
    Assignment {
        sequence: Vec<usize>,
        assignments: Vec<BatchAssignment>,
    },
}

/// An ordering turned into a concrete schedule.
#[derive(Debug, Clone)]
pub(crate) struct Realized {
    pub order: Vec<usize>,
    pub days: Vec<DaySchedule>,
    pub allocation: Option<Allocation>,
    pub cost: ScheduleCost,
}

/// Read-only state shared by the strategies of one run.
pub(crate) struct PlanningContext<'a> {
    pub request: &'a ScheduleRequest,
    pub work: &'a NormalizedWork,
    pub cancel: &'a CancelToken,
}

impl PlanningContext<'_> {
    pub fn metrics(&self) -> &[OrderMetrics] {
        &self.work.metrics
    }

    /// Working hours per day.
    pub fn capacity(&self) -> f64 {
        self.request.factory.working_hours_per_day
    }

    /// Cost of an ordering without building the calendar when avoidable.
    pub fn cost_of(&self, order: &[usize]) -> ScheduleCost {
        match self.work.mode {
            SchedulingMode::PerUnit => {
                let days = bucket_sequential(self.metrics(), order, self.capacity(), self.request.reference_date);
                evaluate_days(self.metrics(), &days, self.capacity())
            }
            SchedulingMode::MachineAware => match self.allocate(order) {
                Ok(allocation) => evaluate_allocation(self.metrics(), &allocation, self.capacity()),
                Err(_) => ScheduleCost::infeasible(),
            },
        }
    }

    /// Turns an ordering into days (and machine timelines).
    pub fn realize(&self, order: &[usize]) -> std::result::Result<Realized, AllocationError> {
        let reference = self.request.reference_date;
        match self.work.mode {
            SchedulingMode::PerUnit => {
                let days = bucket_sequential(self.metrics(), order, self.capacity(), reference);
                let cost = evaluate_days(self.metrics(), &days, self.capacity());
                Ok(Realized {
                    order: order.to_vec(),
                    days,
                    allocation: None,
                    cost,
                })
            }
            SchedulingMode::MachineAware => {
                let allocation = self.allocate(order)?;
                let cost = evaluate_allocation(self.metrics(), &allocation, self.capacity());
                let days = bucket_machine_timeline(
                    self.metrics(),
                    &allocation,
                    self.capacity(),
                    self.request.factory.machine_inventory.total_instances(),
                    reference,
                );
                Ok(Realized {
                    order: order.to_vec(),
                    days,
                    allocation: Some(allocation),
                    cost,
                })
            }
        }
    }

    fn allocate(&self, order: &[usize]) -> std::result::Result<Allocation, AllocationError> {
        TimelineAllocator::allocate(
            &self.request.items,
            order,
            &self.request.factory.machine_inventory,
            self.request.options.allocator_config(),
        )
    }

    /// Buckets, backfills and assembles a plan.
    pub fn finish(&self, plan: Plan) -> ScheduleResult {
        let include_extra = self.request.options.include_extra;
        match plan {
            Plan::Ordering(realized) => {
                let mut days = realized.days;
                if include_extra && realized.allocation.is_none() {
                    backfill_idle(&mut days, self.metrics());
                }
                let machines = realized.allocation.map(|a| a.machine_schedules);
                assemble(self.metrics(), &realized.order, days, machines)
            }
            Plan::Assignment { sequence, assignments } => {
                let mut days =
                    bucket_assignments(self.metrics(), &assignments, self.capacity(), self.request.reference_date);
                if include_extra {
                    backfill_idle(&mut days, self.metrics());
                }
                assemble(self.metrics(), &sequence, days, None)
            }
        }
    }
}
