//! Hub entity ranking.
//!
//! The composite score is a fixed heuristic over connections, flow and
//! activity; the weights are not statistically derived.

use crate::types::HubRecord;
use async_trait::async_trait;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    domain::Domain,
    error::Result,
    risk::RiskLevel,
    traits::{Analyzer, BatchAnalyzer},
};
use moneytrail_graph::types::{EntityGraph, EntityMetrics};
use std::sync::Arc;

/// Weight of total degree.
pub const DEGREE_WEIGHT: f64 = 0.3;
/// Weight of total flow, in units of `FLOW_SCALE`.
pub const FLOW_WEIGHT: f64 = 0.4;
/// Weight of total transaction count.
pub const TRANSACTION_WEIGHT: f64 = 0.3;
/// Flow divisor.
pub const FLOW_SCALE: f64 = 100_000.0;

/// Composite hub score of one entity.
pub fn centrality_score(metrics: &EntityMetrics) -> f64 {
    metrics.total_degree as f64 * DEGREE_WEIGHT
        + (metrics.total_flow / FLOW_SCALE) * FLOW_WEIGHT
        + metrics.total_transactions as f64 * TRANSACTION_WEIGHT
}

/// Risk tier of a hub score.
pub fn hub_tier(score: f64) -> RiskLevel {
    if score > 100.0 {
        RiskLevel::Critical
    } else if score > 50.0 {
        RiskLevel::High
    } else if score > 20.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Hub ranker.
#[derive(Debug, Clone)]
pub struct HubRanker {
    metadata: AnalyzerMetadata,
    top_n: usize,
}

impl HubRanker {
    /// Create a ranker returning the top 10 entities.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("compliance/hubs", Domain::Compliance)
                .with_description("Composite centrality scoring and tiering"),
            top_n: 10,
        }
    }

    /// Set how many records to return.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Rank entities by composite score, highest first (ties by id).
    pub fn rank(graph: &EntityGraph, top_n: usize) -> Vec<HubRecord> {
        let mut hubs: Vec<HubRecord> = graph
            .entities()
            .iter()
            .map(|entity| {
                let m = &entity.metrics;
                let centrality_score = centrality_score(m);
                HubRecord {
                    entity_id: entity.id.clone(),
                    total_connections: m.total_degree,
                    in_connections: m.in_degree,
                    out_connections: m.out_degree,
                    total_flow: m.total_flow,
                    in_flow: m.in_flow,
                    out_flow: m.out_flow,
                    net_flow: m.net_flow,
                    total_transactions: m.total_transactions,
                    centrality_score,
                    risk_level: hub_tier(centrality_score),
                }
            })
            .collect();

        hubs.sort_by(|a, b| {
            b.centrality_score
                .total_cmp(&a.centrality_score)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        hubs.truncate(top_n);
        hubs
    }
}

impl Default for HubRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for HubRanker {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<EntityGraph>, Vec<HubRecord>> for HubRanker {
    async fn execute(&self, input: Arc<EntityGraph>) -> Result<Vec<HubRecord>> {
        Ok(Self::rank(&input, self.top_n))
    }
}
