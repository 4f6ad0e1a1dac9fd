//! Error taxonomy for scoring operations

use thiserror::Error;

/// Local precondition failures raised by the scoring core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// A mean was requested over zero observations
    #[error("Cannot compute a mean over zero observations{}", department_suffix(.0))]
    EmptyInput(Option<String>),

    /// Importance was non-positive or not finite
    #[error("Invalid importance weight: {0}")]
    InvalidWeight(f64),

    /// Hour argument outside [0, 24)
    #[error("Hour must be in the range [0, 23], got {0}")]
    OutOfRange(i64),

    /// Threat score outside [0, 90]
    #[error("Threat score must be in the range [0, 90], got {0}")]
    ScoreOutOfRange(i64),
}

fn department_suffix(department: &Option<String>) -> String {
    match department {
        Some(name) => format!(" (department '{}')", name),
        None => String::new(),
    }
}
