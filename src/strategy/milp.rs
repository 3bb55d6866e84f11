//! Batch-to-day integer program.
//!
//! # Formulation
//!
//! Binary `x[i,b,d]` = batch `b` of item `i` is produced on day `d`, for
//! `d` in `1..=H` with `H = ceil(total_hours / capacity) + slack`.
//!
//! ```text
//! minimize   Σ cost(i,d) · x[i,b,d]
//! subject to Σ_d x[i,b,d] = 1                      every batch placed once
//!            Σ_{i,b} hours(i) · x[i,b,d] ≤ capacity every day
//!            Σ_d d · x[i,b,d] ≤ Σ_d d · x[i,b+1,d]  batches of an item in order
//!
//! cost(i,d) = (d − due(i)) · lateness_weight · max(1, urgency(i))   if d > due(i)
//!           + assignment_cost · d
//! ```
//!
//! The last constraint only removes symmetric copies of the same plan:
//! batches of one item are interchangeable.
//!
//! Any solver failure (infeasible horizon, oversize batch, numerical
//! trouble) falls back to the earliest-deadline packing.
//!
//! # Reference
//! Pochet & Wolsey (2006), "Production Planning by Mixed Integer Programming"

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, variables, Constraint, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::edf::{self, rank_of, EdfConfig};
use super::{Plan, PlanningContext};
use crate::bucket::BatchAssignment;
use crate::error::{Result, ScheduleError};
use crate::normalize::OrderMetrics;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Default days added to the work-content horizon.
pub const DEFAULT_HORIZON_SLACK_DAYS: u32 = 5;

/// Longest horizon the program is built for; longer plans go to the
/// earliest-deadline fallback.
pub const MAX_HORIZON_DAYS: u32 = 366;

/// Integer-program tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilpConfig {
    /// Days added to `ceil(total_hours / capacity)`.
    pub horizon_slack_days: u32,
    /// Fixed horizon overriding the computed one.
    pub horizon_days: Option<u32>,
    /// Per-assignment cost, scaled by the day index.
    pub assignment_cost: f64,
    /// Cost per late day, scaled by urgency.
    pub lateness_weight: f64,
}

impl Default for MilpConfig {
    fn default() -> Self {
        Self {
            horizon_slack_days: DEFAULT_HORIZON_SLACK_DAYS,
            horizon_days: None,
            assignment_cost: 0.1,
            lateness_weight: 100.0,
        }
    }
}

impl MilpConfig {
    pub fn with_horizon_slack(mut self, days: u32) -> Self {
        self.horizon_slack_days = days;
        self
    }

    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = Some(days);
        self
    }

    pub fn with_assignment_cost(mut self, cost: f64) -> Self {
        self.assignment_cost = cost;
        self
    }

    pub fn with_lateness_weight(mut self, weight: f64) -> Self {
        self.lateness_weight = weight;
        self
    }

    /// Candidate days for a given amount of work, saturating at `u32::MAX`.
    pub fn horizon(&self, total_hours: f64, capacity: f64) -> u32 {
        if let Some(days) = self.horizon_days {
            return days;
        }
        if capacity <= 0.0 {
            return self.horizon_slack_days;
        }
        // float-to-int `as` saturates
        let work_days = (total_hours / capacity).ceil() as u32;
        work_days.saturating_add(self.horizon_slack_days)
    }

    pub(crate) fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("Horizon slack", Some(self.horizon_slack_days)),
            ("Fixed horizon", self.horizon_days),
        ] {
            if let Some(days) = value.filter(|&d| d > MAX_HORIZON_DAYS) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidParameter,
                    format!("{name} must be at most {MAX_HORIZON_DAYS} days, got {days}"),
                ));
            }
        }
        for (name, value) in [
            ("Assignment cost", self.assignment_cost),
            ("Lateness weight", self.lateness_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidParameter,
                    format!("{name} must be non-negative, got {value}"),
                ));
            }
        }
        errors
    }
}

/// Why the program produced no plan.
#[derive(Debug, Error)]
enum ProgramError {
    #[error("horizon has no days")]
    EmptyHorizon,
    #[error("horizon of {0} days exceeds the longest supported horizon")]
    HorizonTooLong(u32),
    #[error(transparent)]
    Solver(#[from] ResolutionError),
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    item: usize,
    batch: u32,
    day: u32,
    var: Variable,
}

/// The built, not yet solved, program.
struct DayAssignmentModel {
    vars: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    cells: Vec<Cell>,
}

impl DayAssignmentModel {
    fn build(metrics: &[OrderMetrics], capacity: f64, horizon: u32, config: &MilpConfig) -> Self {
        let mut vars = variables!();
        let mut cells = Vec::new();
        let mut objective = Expression::with_capacity(metrics.len() * horizon as usize);
        let mut constraints = Vec::new();

        for (item, m) in metrics.iter().enumerate() {
            let urgency = m.urgency_score.max(1) as f64;
            let mut previous_day: Option<Expression> = None;

            for batch in 1..=m.batches_needed {
                let mut placed = Expression::with_capacity(horizon as usize);
                let mut day_index = Expression::with_capacity(horizon as usize);

                for day in 1..=horizon {
                    let var = vars.add(variable().binary());
                    let late = i64::from(day) - m.days_until_deadline;
                    let mut cost = config.assignment_cost * f64::from(day);
                    if late > 0 {
                        cost += late as f64 * config.lateness_weight * urgency;
                    }

                    objective += cost * var;
                    placed += var;
                    day_index += f64::from(day) * var;
                    cells.push(Cell { item, batch, day, var });
                }

                constraints.push(constraint!(placed == 1.0));
                if let Some(prev) = previous_day.take() {
                    constraints.push(constraint!(prev <= day_index.clone()));
                }
                previous_day = Some(day_index);
            }
        }

        for day in 1..=horizon {
            let load: Expression = cells
                .iter()
                .filter(|c| c.day == day)
                .map(|c| metrics[c.item].hours_per_batch * c.var)
                .sum();
            constraints.push(constraint!(load <= capacity));
        }

        Self {
            vars,
            objective,
            constraints,
            cells,
        }
    }

    fn solve(self) -> std::result::Result<Vec<BatchAssignment>, ProgramError> {
        let mut problem = self.vars.minimise(self.objective).using(microlp);
        for c in self.constraints {
            problem = problem.with(c);
        }
        let solution = problem.solve()?;

        Ok(self
            .cells
            .iter()
            .filter(|c| solution.value(c.var) > 0.5)
            .map(|c| BatchAssignment {
                item: c.item,
                batch: c.batch,
                day: c.day,
            })
            .collect())
    }
}

pub(crate) fn solve(ctx: &PlanningContext<'_>, config: &MilpConfig) -> Result<Plan> {
    let checkpoint = |stage: &str| {
        if ctx.cancel.is_cancelled() {
            warn!(stage, "integer program cancelled");
            Err(ScheduleError::Cancelled)
        } else {
            Ok(())
        }
    };

    checkpoint("before build")?;
    let metrics = ctx.metrics();
    let capacity = ctx.capacity();
    let horizon = config.horizon(ctx.work.total_hours(), capacity);

    let outcome = if horizon == 0 {
        Err(ProgramError::EmptyHorizon)
    } else if horizon > MAX_HORIZON_DAYS {
        Err(ProgramError::HorizonTooLong(horizon))
    } else {
        let model = DayAssignmentModel::build(metrics, capacity, horizon, config);
        debug!(horizon, variables = model.cells.len(), constraints = model.constraints.len(), "integer program built");
        checkpoint("after build")?;
        model.solve()
    };
    checkpoint("after solve")?;

    match outcome {
        Ok(mut assignments) => {
            let sequence = sequence_by_first_day(metrics, &assignments);
            let rank = rank_of(&sequence, metrics.len());
            assignments.sort_by_key(|a| (a.day, rank[a.item], a.batch));
            debug!(horizon, batches = assignments.len(), "integer program solved");
            Ok(Plan::Assignment { sequence, assignments })
        }
        Err(err) => {
            warn!(error = %err, horizon, "integer program failed, falling back to earliest deadline");
            Ok(edf::plan(ctx, &EdfConfig::default()))
        }
    }
}

/// Items ordered by first production day, then urgency (descending),
/// then input position.
fn sequence_by_first_day(metrics: &[OrderMetrics], assignments: &[BatchAssignment]) -> Vec<usize> {
    let mut first_day = vec![u32::MAX; metrics.len()];
    for a in assignments {
        first_day[a.item] = first_day[a.item].min(a.day);
    }
    let mut sequence: Vec<usize> = (0..metrics.len()).collect();
    sequence.sort_by_key(|&i| (first_day[i], std::cmp::Reverse(metrics[i].urgency_score), i));
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactoryConfig, WorkItem};
    use crate::normalize::normalize;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn metrics(items: Vec<WorkItem>) -> Vec<OrderMetrics> {
        normalize(&items, &FactoryConfig::new(8.0), date(1)).unwrap().metrics
    }

    #[test]
    fn test_horizon() {
        let config = MilpConfig::default();
        assert_eq!(config.horizon(10.0, 8.0), 7);
        assert_eq!(config.horizon(16.0, 8.0), 7);
        assert_eq!(config.with_horizon_slack(0).horizon(16.0, 8.0), 2);
        assert_eq!(MilpConfig::default().with_horizon_days(3).horizon(100.0, 8.0), 3);
    }

    #[test]
    fn test_horizon_saturates() {
        let config = MilpConfig::default().with_horizon_slack(u32::MAX);
        assert_eq!(config.horizon(16.0, 8.0), u32::MAX);
        assert_eq!(MilpConfig::default().horizon(f64::MAX, 1e-9), u32::MAX);
    }

    #[test]
    fn test_model_places_every_batch_once() {
        let m = metrics(vec![
            WorkItem::per_unit("A", 6, date(3), 1.0),
            WorkItem::per_unit("B", 4, date(2), 1.0),
        ]);
        let model = DayAssignmentModel::build(&m, 8.0, 2, &MilpConfig::default());
        assert_eq!(model.cells.len(), 20);

        let assignments = model.solve().unwrap();
        assert_eq!(assignments.len(), 10);
        for day in 1..=2 {
            let load = assignments.iter().filter(|a| a.day == day).count();
            assert!(load <= 8);
        }
    }

    #[test]
    fn test_urgent_batches_meet_deadline() {
        // B is due after day 1; A has slack
        let m = metrics(vec![
            WorkItem::per_unit("A", 8, date(10), 1.0),
            WorkItem::per_unit("B", 8, date(2), 1.0),
        ]);
        let model = DayAssignmentModel::build(&m, 8.0, 3, &MilpConfig::default());
        let assignments = model.solve().unwrap();
        assert!(assignments.iter().filter(|a| a.item == 1).all(|a| a.day == 1));
    }

    #[test]
    fn test_infeasible_horizon_is_an_error() {
        // three 5h batches cannot share two 8h days
        let m = metrics(vec![WorkItem::per_unit("A", 3, date(9), 5.0)]);
        let model = DayAssignmentModel::build(&m, 8.0, 2, &MilpConfig::default());
        assert!(matches!(model.solve(), Err(ProgramError::Solver(_))));
    }

    #[test]
    fn test_sequence_by_first_day() {
        let m = metrics(vec![
            WorkItem::per_unit("A", 1, date(20), 1.0),
            WorkItem::per_unit("B", 1, date(2), 1.0),
            WorkItem::per_unit("C", 1, date(20), 1.0),
        ]);
        let assignments = [
            BatchAssignment { item: 0, batch: 1, day: 1 },
            BatchAssignment { item: 1, batch: 1, day: 1 },
            BatchAssignment { item: 2, batch: 1, day: 2 },
        ];
        assert_eq!(sequence_by_first_day(&m, &assignments), vec![1, 0, 2]);
    }

    #[test]
    fn test_validate() {
        assert!(MilpConfig::default().validate().is_empty());
        let errors = MilpConfig::default().with_lateness_weight(-1.0).validate();
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidParameter);

        assert!(MilpConfig::default().with_horizon_days(MAX_HORIZON_DAYS).validate().is_empty());
        let errors = MilpConfig::default()
            .with_horizon_slack(u32::MAX)
            .with_horizon_days(MAX_HORIZON_DAYS + 1)
            .validate();
        assert_eq!(errors.len(), 2);
    }
}
