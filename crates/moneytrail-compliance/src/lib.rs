//! # MoneyTrail Compliance
//!
//! Money-laundering pattern detectors over a transaction graph snapshot.
//!
//! ## Detectors
//! - `StructuringDetector` - same-day near-uniform transfers above a threshold
//! - `CircularFlowDetector` - budgeted simple cycle search with value threshold
//! - `OutlierDetector` - IQR value outliers and high-frequency senders
//! - `TemporalDetector` - weekend and night activity
//! - `HubRanker` - composite centrality scoring and tiering
//!
//! ## Aggregation
//! - `RiskAggregator` - 0 to 100 score and `InvestigationReport`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod circular;
pub mod hubs;
pub mod outliers;
pub mod report;
pub mod risk;
pub mod stats;
pub mod structuring;
pub mod temporal;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::circular::CircularFlowDetector;
    pub use crate::hubs::HubRanker;
    pub use crate::outliers::OutlierDetector;
    pub use crate::report::{ExecutiveSummary, InvestigationReport, ReportMetadata, ReportSummary};
    pub use crate::risk::{risk_band, risk_score, DetectorOutputs, RiskAggregator};
    pub use crate::structuring::StructuringDetector;
    pub use crate::temporal::TemporalDetector;
    pub use crate::types::*;
}
