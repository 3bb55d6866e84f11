//! Error types.

use crate::timeline::AllocationError;
use crate::validation::ValidationError;

/// Errors surfaced to the caller of an optimization run.
///
/// Solver infeasibility is not an error: the integer-program strategy
/// recovers by falling back to the earliest-deadline heuristic.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid input: {}", join_messages(.0))]
    InvalidInput(Vec<ValidationError>),

    #[error("optimization cancelled before a schedule was found")]
    Cancelled,

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("malformed request: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ScheduleError {
    /// Validation errors carried by an `InvalidInput`, empty otherwise.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ScheduleError::InvalidInput(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for ScheduleError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ScheduleError::InvalidInput(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
