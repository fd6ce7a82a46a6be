//! # MoneyTrail Core
//!
//! Core abstractions shared by the MoneyTrail investigation crates.
//!
//! This crate provides:
//! - Error taxonomy and `Result` alias
//! - Domain and analyzer metadata definitions
//! - Trait definitions for pipeline stages
//! - The canonical transaction record and risk levels
//! - Work budgets for bounded searches
//! - Configuration and logging setup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod budget;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod risk;
pub mod traits;
pub mod transaction;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analyzer::AnalyzerMetadata;
    pub use crate::budget::{BudgetMeter, CancellationFlag, Deadline, WorkBudget};
    pub use crate::config::{
        AnalysisConfig, AnalysisConfigBuilder, CommunityMethod, CycleBudgetConfig,
        EigenvectorConfig, SelfLoopPolicy,
    };
    pub use crate::domain::Domain;
    pub use crate::error::{AnalysisError, Result, TruncationReason};
    pub use crate::logging::{LogConfig, LogLevel};
    pub use crate::risk::RiskLevel;
    pub use crate::traits::{Analyzer, BatchAnalyzer};
    pub use crate::transaction::TransactionRecord;
}
