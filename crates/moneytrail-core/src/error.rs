//! Error types for MoneyTrail.

use std::fmt;
use thiserror::Error;

/// Result type alias using `AnalysisError`.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Why a cycle enumeration stopped before exhausting the search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// The configured maximum number of cycles was reached.
    CycleLimit,
    /// The configured maximum number of search steps was reached.
    StepLimit,
    /// The wall-clock deadline passed.
    Deadline,
    /// The caller cancelled the run.
    Cancelled,
}

impl TruncationReason {
    /// Returns the reason as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TruncationReason::CycleLimit => "cycle_limit",
            TruncationReason::StepLimit => "step_limit",
            TruncationReason::Deadline => "deadline",
            TruncationReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building or analysing a transaction graph.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A single transaction record is malformed and was rejected.
    #[error("Invalid record #{origin_index}: {reason}")]
    InvalidRecord {
        /// Position of the record in the caller's input.
        origin_index: u64,
        /// What is wrong with it.
        reason: String,
    },

    /// The graph has no entities.
    #[error("Graph has no entities")]
    EmptyGraph,

    /// Eigenvector centrality did not converge.
    #[error("Eigenvector centrality did not converge after {iterations} iterations")]
    Centrality {
        /// Iterations performed before giving up.
        iterations: u32,
    },

    /// Cycle enumeration stopped early; results are a lower bound.
    #[error("Cycle enumeration truncated after {cycles} cycles ({reason})")]
    CycleEnumerationTruncated {
        /// Cycles found before stopping.
        cycles: usize,
        /// Which budget was exhausted.
        reason: TruncationReason,
    },

    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout waiting for a stage to complete.
    #[error("Timeout waiting for stage after {0:?}")]
    Timeout(std::time::Duration),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalysisError {
    /// Create an invalid record error.
    #[must_use]
    pub fn invalid_record(origin_index: u64, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidRecord {
            origin_index,
            reason: reason.into(),
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        AnalysisError::ValidationError(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        AnalysisError::ConfigError(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        AnalysisError::InternalError(msg.into())
    }

    /// Returns true if the run can continue with degraded output.
    ///
    /// Per-record rejections, an empty graph, centrality non-convergence and
    /// truncated cycle enumeration never abort a run.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidRecord { .. }
                | AnalysisError::EmptyGraph
                | AnalysisError::Centrality { .. }
                | AnalysisError::CycleEnumerationTruncated { .. }
        )
    }
}
