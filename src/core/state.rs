//! Execution state models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the engine reacts when a stage fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Stop at the first failure and report it as the run's terminal error
    #[default]
    FailFast,
    /// Record the failure and move on to the next stage
    Continue,
    /// Restore the document to its pre-stage snapshot, then stop
    Rollback,
    /// Re-run the stage with exponential backoff; record a failure if every attempt fails
    Retry,
    /// Record the failure and move on (same handling as `Continue`)
    Skip,
}

impl ErrorStrategy {
    pub const ALL: [ErrorStrategy; 5] = [
        ErrorStrategy::FailFast,
        ErrorStrategy::Continue,
        ErrorStrategy::Rollback,
        ErrorStrategy::Retry,
        ErrorStrategy::Skip,
    ];

    /// Tag used in pipeline definitions
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStrategy::FailFast => "fail_fast",
            ErrorStrategy::Continue => "continue",
            ErrorStrategy::Rollback => "rollback",
            ErrorStrategy::Retry => "retry",
            ErrorStrategy::Skip => "skip",
        }
    }

    /// Comma-separated list of every accepted tag
    pub fn valid_options() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorStrategy {
    type Err = crate::core::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| crate::core::ConfigError::InvalidErrorStrategy {
                value: s.to_string(),
                valid: Self::valid_options(),
            })
    }
}

/// Where a single stage attempt is in its lifecycle
///
/// `Pending -> ValidatingInput -> Executing -> {Succeeded, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageState {
    /// Stage has not started
    Pending,
    /// Stage preconditions are being checked
    ValidatingInput,
    /// Stage is running
    Executing,
    /// Stage finished successfully
    Succeeded,
    /// Stage failed; the error strategy decides what happens next
    Failed,
}
