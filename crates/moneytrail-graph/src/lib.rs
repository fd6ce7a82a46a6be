//! # MoneyTrail Graph
//!
//! Transaction graph construction and structural analytics.
//!
//! ## Components
//!
//! ### Construction
//! - `GraphBuilder` - merged weighted directed graph, lenient or strict
//!
//! ### Node Metrics
//! - `NodeMetricsCalculator` - flows, degrees, centralities, communities
//! - `DegreeCentrality`, `BetweennessCentrality`, `ClosenessCentrality`,
//!   `EigenvectorCentrality`
//!
//! ### Community Detection
//! - `LouvainCommunity`, `GreedyModularity`, `LabelPropagation` behind
//!   the `CommunityStrategy` trait
//!
//! ### Cycles
//! - `SimpleCycles` - budgeted simple cycle enumeration
//!
//! ### Topology
//! - `GraphSummary` - density, weak components, top entities

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod centrality;
pub mod community;
pub mod cycles;
pub mod metrics;
pub mod topology;

// Common graph types
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::*;
    pub use crate::centrality::*;
    pub use crate::community::*;
    pub use crate::cycles::*;
    pub use crate::metrics::*;
    pub use crate::topology::*;
    pub use crate::types::*;
}
