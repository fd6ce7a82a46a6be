//! Risk aggregation.
//!
//! Combines detector outputs into an `InvestigationReport` with a 0 to 100
//! score. Temporal patterns are reported but never scored.

use crate::report::{ExecutiveSummary, InvestigationReport, ReportMetadata, ReportSummary};
use crate::types::{CycleAlert, HubRecord, StructuringAlert, TemporalPattern, UnusualPattern};
use async_trait::async_trait;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    domain::Domain,
    error::Result,
    risk::RiskLevel,
    traits::{Analyzer, BatchAnalyzer},
};
use moneytrail_graph::topology::GraphSummary;
use moneytrail_graph::types::EntityGraph;
use uuid::Uuid;

/// Points per scored alert.
pub const POINTS_PER_ALERT: usize = 10;

/// Composite score: `min(100, 10 × (structuring + circular + unusual))`.
pub fn risk_score(structuring: usize, circular: usize, unusual: usize) -> u8 {
    let alerts = structuring
        .saturating_add(circular)
        .saturating_add(unusual);
    let score = alerts.saturating_mul(POINTS_PER_ALERT).min(100);
    u8::try_from(score).unwrap_or(100)
}

/// Band of a composite score.
pub fn risk_band(score: u8) -> RiskLevel {
    match score {
        70..=u8::MAX => RiskLevel::Critical,
        40..=69 => RiskLevel::High,
        20..=39 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Detector outputs handed to the aggregator.
#[derive(Debug, Clone, Default)]
pub struct DetectorOutputs {
    /// Structuring alerts.
    pub structuring: Vec<StructuringAlert>,
    /// Circular flow alerts.
    pub circular: Vec<CycleAlert>,
    /// Unusual patterns.
    pub unusual: Vec<UnusualPattern>,
    /// Temporal patterns.
    pub temporal: Vec<TemporalPattern>,
}

/// Risk aggregator.
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    metadata: AnalyzerMetadata,
}

impl RiskAggregator {
    /// Create a new aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("compliance/risk-aggregator", Domain::Compliance)
                .with_description("Composite risk score over detector alerts"),
        }
    }

    /// Assemble a report from detector outputs.
    ///
    /// Hubs, graph totals and metadata start empty; attach them with the
    /// `with_*` methods.
    pub fn aggregate(
        structuring: Vec<StructuringAlert>,
        circular: Vec<CycleAlert>,
        unusual: Vec<UnusualPattern>,
        temporal: Vec<TemporalPattern>,
    ) -> InvestigationReport {
        let risk_score = risk_score(structuring.len(), circular.len(), unusual.len());
        let risk_band = risk_band(risk_score);

        let executive = ExecutiveSummary {
            structuring_alerts: structuring.len(),
            circular_alerts: circular.len(),
            unusual_patterns: unusual.len(),
            temporal_patterns: temporal.len(),
            ..Default::default()
        };

        tracing::info!(
            risk_score,
            risk_band = %risk_band,
            structuring = structuring.len(),
            circular = circular.len(),
            unusual = unusual.len(),
            temporal = temporal.len(),
            "Risk aggregated"
        );

        InvestigationReport {
            report_id: Uuid::nil(),
            generated_at: None,
            risk_score,
            risk_band,
            structuring,
            circular,
            unusual,
            temporal,
            hubs: Vec::new(),
            summary: ReportSummary {
                executive,
                graph: GraphSummary::default(),
            },
            metadata: ReportMetadata::default(),
        }
        .sealed()
    }
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for RiskAggregator {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchAnalyzer<DetectorOutputs, InvestigationReport> for RiskAggregator {
    async fn execute(&self, input: DetectorOutputs) -> Result<InvestigationReport> {
        Ok(Self::aggregate(
            input.structuring,
            input.circular,
            input.unusual,
            input.temporal,
        ))
    }
}

impl InvestigationReport {
    /// Attach ranked hubs.
    #[must_use]
    pub fn with_hubs(mut self, hubs: Vec<HubRecord>) -> Self {
        self.summary.executive.high_risk_hubs = hubs
            .iter()
            .filter(|h| h.risk_level >= RiskLevel::High)
            .count();
        self.hubs = hubs;
        self.sealed()
    }

    /// Attach graph totals and the structural summary.
    #[must_use]
    pub fn with_graph(mut self, graph: &EntityGraph, top_k: usize) -> Self {
        let executive = &mut self.summary.executive;
        executive.total_transactions = graph.total_transactions();
        executive.unique_entities = graph.num_nodes();
        executive.total_edges = graph.num_edges();
        executive.total_value = graph.total_value();
        self.summary.graph = GraphSummary::compute(graph, top_k);
        self.sealed()
    }

    /// Attach run metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ReportMetadata) -> Self {
        self.metadata = metadata;
        self.sealed()
    }
}
