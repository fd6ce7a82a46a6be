//! Investigation report types.

use crate::types::{CycleAlert, HubRecord, StructuringAlert, TemporalPattern, UnusualPattern};
use chrono::{DateTime, Utc};
use moneytrail_core::error::{AnalysisError, Result, TruncationReason};
use moneytrail_core::risk::RiskLevel;
use moneytrail_graph::builder::RejectedRecord;
use moneytrail_graph::topology::GraphSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Headline totals of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    /// Records accepted into the graph.
    pub total_transactions: usize,
    /// Distinct entities.
    pub unique_entities: usize,
    /// Merged edges.
    pub total_edges: usize,
    /// Sum of accepted amounts.
    pub total_value: f64,
    /// Structuring alerts.
    pub structuring_alerts: usize,
    /// Circular flow alerts.
    pub circular_alerts: usize,
    /// Unusual patterns.
    pub unusual_patterns: usize,
    /// Temporal patterns.
    pub temporal_patterns: usize,
    /// Hubs tiered `High` or above.
    pub high_risk_hubs: usize,
}

/// Summary section of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Headline totals.
    pub executive: ExecutiveSummary,
    /// Structure of the analysed graph.
    pub graph: GraphSummary,
}

/// Degraded conditions and diagnostics of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Records handed to the pipeline.
    pub records_received: usize,
    /// Records rejected by the graph builder.
    pub skipped_records: usize,
    /// Rejected records with reasons, in input order.
    pub rejected: Vec<RejectedRecord>,
    /// True when circular alerts are a lower bound.
    pub cycle_enumeration_truncated: bool,
    /// Which budget stopped cycle enumeration.
    pub truncation_reason: Option<TruncationReason>,
    /// Cycles inspected by the circular-flow detector.
    pub cycles_examined: usize,
    /// True when eigenvector centrality fell back to zeros.
    pub centrality_degraded: bool,
    /// True when no entity survived graph construction.
    pub empty_graph: bool,
    /// Human-readable messages for every degraded condition.
    pub diagnostics: Vec<String>,
}

impl ReportMetadata {
    /// Record a degradable error as a diagnostic, setting the matching flag.
    pub fn record(&mut self, error: &AnalysisError) {
        match error {
            AnalysisError::EmptyGraph => self.empty_graph = true,
            AnalysisError::Centrality { .. } => self.centrality_degraded = true,
            AnalysisError::CycleEnumerationTruncated { reason, .. } => {
                self.cycle_enumeration_truncated = true;
                self.truncation_reason = Some(*reason);
            }
            _ => {}
        }
        self.diagnostics.push(error.to_string());
    }

    /// Record builder rejections.
    pub fn record_rejections(&mut self, rejected: Vec<RejectedRecord>) {
        if !rejected.is_empty() {
            self.diagnostics
                .push(format!("{} invalid records skipped", rejected.len()));
        }
        self.skipped_records = rejected.len();
        self.rejected = rejected;
    }
}

/// Namespace for content-derived report ids.
const REPORT_NAMESPACE: Uuid = Uuid::from_u128(0x6d6f_6e65_7974_7261_696c_2d72_6570_6f72);

/// The result of one investigation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    /// Id derived from the report content; equal inputs give equal ids.
    pub report_id: Uuid,
    /// Wall-clock time stamped by the caller, if any.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    /// Composite score, 0 to 100.
    pub risk_score: u8,
    /// Band of `risk_score`.
    pub risk_band: RiskLevel,
    /// Structuring alerts.
    pub structuring: Vec<StructuringAlert>,
    /// Circular flow alerts.
    pub circular: Vec<CycleAlert>,
    /// Value outliers and high-frequency senders.
    pub unusual: Vec<UnusualPattern>,
    /// Weekend and night activity (informational).
    pub temporal: Vec<TemporalPattern>,
    /// Top hubs.
    pub hubs: Vec<HubRecord>,
    /// Totals and graph structure.
    pub summary: ReportSummary,
    /// Degraded conditions.
    pub metadata: ReportMetadata,
}

impl InvestigationReport {
    /// Content id over every section except `report_id` and `generated_at`.
    #[must_use]
    pub fn content_id(&self) -> Uuid {
        let content = (
            self.risk_score,
            self.risk_band,
            &self.structuring,
            &self.circular,
            &self.unusual,
            &self.temporal,
            &self.hubs,
            &self.summary,
            &self.metadata,
        );
        let bytes = serde_json::to_vec(&content).unwrap_or_default();
        Uuid::new_v5(&REPORT_NAMESPACE, &bytes)
    }

    /// Recompute `report_id` after the content changed.
    #[must_use]
    pub(crate) fn sealed(mut self) -> Self {
        self.report_id = self.content_id();
        self
    }

    /// Record when the report was produced.
    #[must_use]
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Total alerts that contribute to the score.
    #[must_use]
    pub fn scored_alerts(&self) -> usize {
        self.structuring.len() + self.circular.len() + self.unusual.len()
    }

    /// True when nothing was flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.scored_alerts() == 0 && self.temporal.is_empty()
    }

    /// Suggested next step for the report band.
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self.risk_band {
            RiskLevel::Critical => "Escalate immediately and consider a suspicious activity report",
            RiskLevel::High => "Open a detailed investigation of the flagged entities",
            RiskLevel::Medium => "Review the flagged entities and monitor further activity",
            RiskLevel::Low => "No immediate action; continue routine monitoring",
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::internal(format!("report serialization failed: {e}")))
    }

    /// Parse a report from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AnalysisError::validation(format!("invalid report JSON: {e}")))
    }
}
