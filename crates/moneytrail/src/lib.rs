//! # MoneyTrail
//!
//! Transaction graph construction and money-laundering pattern detection.
//!
//! MoneyTrail turns a flat list of transfers into a merged weighted directed
//! graph, derives per-entity flow and centrality metrics, and runs independent
//! detectors over the resulting snapshot:
//!
//! - **Structuring**: same-day near-uniform transfers summing above a threshold
//! - **Circular flows**: simple directed cycles, enumerated under a work budget
//! - **Hubs**: composite centrality scoring and tiering
//! - **Outliers**: IQR value outliers and high-frequency senders
//! - **Timing**: weekend and night activity
//!
//! The detector outputs are combined into an `InvestigationReport` with a
//! 0 to 100 risk score.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use moneytrail::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = InvestigationPipeline::new(AnalysisConfig::default())?;
//!     pipeline.init_logging()?;
//!
//!     let records = vec![
//!         TransactionRecord::new(0, "ACME", "SHELL-1", 9_500.0),
//!         TransactionRecord::new(1, "SHELL-1", "SHELL-2", 9_400.0),
//!         TransactionRecord::new(2, "SHELL-2", "ACME", 9_300.0),
//!     ];
//!
//!     let report = pipeline.analyze(records).await?;
//!     println!("risk {} ({})", report.risk_score, report.risk_band);
//!     println!("{}", report.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! `AnalysisConfig` can be loaded from TOML with `AnalysisConfig::from_file`
//! or from `MONEYTRAIL_*` environment variables with `AnalysisConfig::from_env`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline;

// Re-export member crates
pub use moneytrail_compliance as compliance;
pub use moneytrail_core as core;
pub use moneytrail_graph as graph;

pub use pipeline::{InvestigationPipeline, Snapshot};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use moneytrail::prelude::*;
/// ```
pub mod prelude {
    pub use crate::pipeline::{InvestigationPipeline, Snapshot};
    pub use moneytrail_compliance::prelude::*;
    pub use moneytrail_core::prelude::*;
    pub use moneytrail_graph::prelude::*;
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
