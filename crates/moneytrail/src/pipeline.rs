//! End-to-end investigation pipeline.
//!
//! Records are built into a graph, node metrics are computed once, and the
//! resulting snapshot is shared read-only by every detector. `analyze` runs
//! the detectors as parallel blocking tasks; `analyze_blocking` runs the
//! same stages in sequence on the calling thread.

use async_trait::async_trait;
use moneytrail_compliance::prelude::*;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    budget::{CancellationFlag, WorkBudget},
    config::AnalysisConfig,
    domain::Domain,
    error::{AnalysisError, Result},
    traits::{Analyzer, BatchAnalyzer},
    transaction::TransactionRecord,
};
use moneytrail_graph::{
    builder::GraphBuilder, metrics::NodeMetricsCalculator, types::EntityGraph,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{spawn_blocking, JoinError};

/// Immutable input shared by the detectors.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Graph with computed node metrics.
    pub graph: Arc<EntityGraph>,
    /// Accepted records in input order.
    pub transactions: Arc<[TransactionRecord]>,
    /// Conditions recorded while building the snapshot.
    pub metadata: ReportMetadata,
}

/// Raw outputs of one detector pass.
struct Findings {
    structuring: Vec<StructuringAlert>,
    circular: CircularFlowResult,
    unusual: Vec<UnusualPattern>,
    temporal: Vec<TemporalPattern>,
    hubs: Vec<HubRecord>,
}

/// Runs every stage over a batch of transaction records.
#[derive(Debug, Clone)]
pub struct InvestigationPipeline {
    metadata: AnalyzerMetadata,
    config: AnalysisConfig,
    builder: GraphBuilder,
    metrics: NodeMetricsCalculator,
    cancellation: Option<CancellationFlag>,
}

impl InvestigationPipeline {
    /// Create a pipeline, validating the configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            metadata: AnalyzerMetadata::new("pipeline/investigation", Domain::Compliance)
                .with_description("Graph construction, detectors and risk aggregation"),
            builder: GraphBuilder::new().with_self_loops(config.self_loops),
            metrics: NodeMetricsCalculator::from_config(&config),
            config,
            cancellation: None,
        })
    }

    /// Create a pipeline from `MONEYTRAIL_*` environment settings.
    pub fn from_env() -> Result<Self> {
        Self::new(AnalysisConfig::from_env()?)
    }

    /// Let the caller abort cycle enumeration through `flag`.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Install the configured tracing subscriber.
    pub fn init_logging(&self) -> Result<()> {
        self.config.logging.init()
    }

    /// Build the graph and compute node metrics.
    pub fn prepare(&self, records: &[TransactionRecord]) -> Snapshot {
        let mut metadata = ReportMetadata {
            records_received: records.len(),
            ..Default::default()
        };

        let outcome = self.builder.build(records);
        let transactions: Arc<[TransactionRecord]> = records
            .iter()
            .filter(|r| self.builder.validate_record(r).is_ok())
            .cloned()
            .collect();
        metadata.record_rejections(outcome.rejected);

        let computed = self.metrics.compute(outcome.graph);
        if let Some(err) = &computed.centrality_error {
            tracing::warn!(error = %err, "Eigenvector centrality degraded to zero");
            metadata.record(err);
        }
        if computed.graph.is_empty() {
            metadata.record(&AnalysisError::EmptyGraph);
        }

        Snapshot {
            graph: Arc::new(computed.graph),
            transactions,
            metadata,
        }
    }

    /// Run the full pipeline, detectors in parallel.
    pub async fn analyze(
        &self,
        records: impl Into<Arc<[TransactionRecord]>>,
    ) -> Result<InvestigationReport> {
        let started = Instant::now();
        let records = records.into();
        tracing::info!(records = records.len(), "Investigation started");

        let stage = self.clone();
        let snapshot = spawn_blocking(move || stage.prepare(&records))
            .await
            .map_err(task_failed)?;
        if snapshot.graph.is_empty() {
            return Ok(self.empty_report(snapshot.metadata));
        }

        let structuring = {
            let tx = Arc::clone(&snapshot.transactions);
            let (threshold, tolerance) = (
                self.config.structuring_threshold,
                self.config.structuring_tolerance,
            );
            spawn_blocking(move || StructuringDetector::detect(&tx, threshold, tolerance))
        };
        let circular = {
            let graph = Arc::clone(&snapshot.graph);
            let (min_len, threshold) = (self.config.min_cycle_length, self.config.alert_threshold);
            let budget = self.cycle_budget();
            spawn_blocking(move || CircularFlowDetector::detect(&graph, min_len, threshold, &budget))
        };
        let unusual = {
            let tx = Arc::clone(&snapshot.transactions);
            spawn_blocking(move || OutlierDetector::detect(&tx))
        };
        let temporal = {
            let tx = Arc::clone(&snapshot.transactions);
            spawn_blocking(move || TemporalDetector::detect(&tx))
        };
        let hubs = {
            let graph = Arc::clone(&snapshot.graph);
            let top_n = self.config.top_n_hubs;
            spawn_blocking(move || HubRanker::rank(&graph, top_n))
        };

        let (structuring, circular, unusual, temporal, hubs) =
            tokio::join!(structuring, circular, unusual, temporal, hubs);
        let findings = Findings {
            structuring: structuring.map_err(task_failed)?,
            circular: circular.map_err(task_failed)?,
            unusual: unusual.map_err(task_failed)?,
            temporal: temporal.map_err(task_failed)?,
            hubs: hubs.map_err(task_failed)?,
        };

        let report = self.assemble(snapshot, findings);
        tracing::info!(
            report_id = %report.report_id,
            risk_score = report.risk_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Investigation complete"
        );
        Ok(report)
    }

    /// Run the full pipeline on the calling thread.
    pub fn analyze_blocking(&self, records: &[TransactionRecord]) -> InvestigationReport {
        tracing::info!(records = records.len(), "Investigation started");
        let snapshot = self.prepare(records);
        if snapshot.graph.is_empty() {
            return self.empty_report(snapshot.metadata);
        }

        let findings = Findings {
            structuring: StructuringDetector::detect(
                &snapshot.transactions,
                self.config.structuring_threshold,
                self.config.structuring_tolerance,
            ),
            circular: CircularFlowDetector::detect(
                &snapshot.graph,
                self.config.min_cycle_length,
                self.config.alert_threshold,
                &self.cycle_budget(),
            ),
            unusual: OutlierDetector::detect(&snapshot.transactions),
            temporal: TemporalDetector::detect(&snapshot.transactions),
            hubs: HubRanker::rank(&snapshot.graph, self.config.top_n_hubs),
        };

        let report = self.assemble(snapshot, findings);
        tracing::info!(
            report_id = %report.report_id,
            risk_score = report.risk_score,
            "Investigation complete"
        );
        report
    }

    /// Budget for one cycle enumeration; the deadline starts now.
    fn cycle_budget(&self) -> WorkBudget {
        let budget = self.config.cycle_work_budget();
        match &self.cancellation {
            Some(flag) => budget.with_cancellation(flag.clone()),
            None => budget,
        }
    }

    fn assemble(&self, snapshot: Snapshot, findings: Findings) -> InvestigationReport {
        let Snapshot {
            graph,
            mut metadata,
            ..
        } = snapshot;

        metadata.cycles_examined = findings.circular.cycles_examined;
        if let Some(reason) = findings.circular.truncation {
            metadata.record(&AnalysisError::CycleEnumerationTruncated {
                cycles: findings.circular.cycles_examined,
                reason,
            });
        }

        RiskAggregator::aggregate(
            findings.structuring,
            findings.circular.alerts,
            findings.unusual,
            findings.temporal,
        )
        .with_graph(&graph, self.config.summary_top_k)
        .with_hubs(findings.hubs)
        .with_metadata(metadata)
    }

    fn empty_report(&self, metadata: ReportMetadata) -> InvestigationReport {
        tracing::info!(
            skipped = metadata.skipped_records,
            "No entities to analyse; returning empty report"
        );
        RiskAggregator::aggregate(Vec::new(), Vec::new(), Vec::new(), Vec::new())
            .with_metadata(metadata)
    }
}

fn task_failed(err: JoinError) -> AnalysisError {
    AnalysisError::internal(format!("analysis task failed: {err}"))
}

impl Analyzer for InvestigationPipeline {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.metrics.validate()
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<[TransactionRecord]>, InvestigationReport> for InvestigationPipeline {
    async fn execute(&self, input: Arc<[TransactionRecord]>) -> Result<InvestigationReport> {
        self.analyze(input).await
    }

    /// Any batch is acceptable, including an empty one; invalid records are
    /// skipped during graph construction.
    fn validate_input(&self, _input: &Arc<[TransactionRecord]>) -> Result<()> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moneytrail_core::config::CommunityMethod;
    use std::time::Duration;

    fn tx(i: u64, s: &str, t: &str, amount: f64) -> TransactionRecord {
        TransactionRecord::new(i, s, t, amount)
    }

    fn pipeline() -> InvestigationPipeline {
        let config = AnalysisConfig::default().with_community(CommunityMethod::Disabled);
        InvestigationPipeline::new(config).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AnalysisConfig {
            structuring_tolerance: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            InvestigationPipeline::new(config),
            Err(AnalysisError::ConfigError(_))
        ));
    }

    #[test]
    fn test_prepare_skips_invalid_records() {
        let records = vec![tx(0, "A", "B", 5.0), tx(1, "A", "B", -1.0), tx(2, "", "C", 1.0)];
        let snapshot = pipeline().prepare(&records);

        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.graph.num_nodes(), 2);
        assert_eq!(snapshot.metadata.records_received, 3);
        assert_eq!(snapshot.metadata.skipped_records, 2);
        assert!(!snapshot.metadata.empty_graph);
    }

    #[tokio::test]
    async fn test_async_matches_blocking() {
        let records = vec![
            tx(0, "A", "B", 20_000.0),
            tx(1, "B", "C", 20_000.0),
            tx(2, "C", "A", 20_000.0),
            tx(3, "D", "A", 10.0),
        ];
        let p = pipeline();
        let async_report = p.analyze(records.clone()).await.unwrap();
        let blocking_report = p.analyze_blocking(&records);

        assert_eq!(async_report.circular.len(), 1);
        assert_eq!(async_report, blocking_report);

        let again = p.analyze(records).await.unwrap();
        assert_eq!(again.report_id, async_report.report_id);
    }

    #[tokio::test]
    async fn test_cancelled_cycle_search_is_reported() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let p = pipeline().with_cancellation(flag);
        let records = vec![tx(0, "A", "B", 1.0), tx(1, "B", "A", 1.0)];

        let report = p.analyze(records).await.unwrap();
        assert!(report.metadata.cycle_enumeration_truncated);
        assert_eq!(
            report.metadata.truncation_reason,
            Some(moneytrail_core::error::TruncationReason::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_execute_with_timeout() {
        let p = pipeline();
        let records: Arc<[TransactionRecord]> = vec![tx(0, "A", "B", 1.0)].into();
        let report = p
            .execute_with_timeout(records, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(report.summary.executive.unique_entities, 2);
    }

    #[tokio::test]
    async fn test_empty_batch_passes_validation() {
        let p = pipeline();
        let empty: Arc<[TransactionRecord]> = Arc::from(Vec::new());
        assert!(p.validate_input(&empty).is_ok());

        let report = p
            .execute_with_timeout(empty, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(report.risk_score, 0);
        assert!(report.metadata.empty_graph);
    }

    #[test]
    fn test_zero_top_n_yields_no_hubs() {
        let config = AnalysisConfig {
            top_n_hubs: 0,
            ..AnalysisConfig::default().with_community(CommunityMethod::Disabled)
        };
        let p = InvestigationPipeline::new(config).unwrap();
        let records = vec![tx(0, "A", "B", 1.0), tx(1, "B", "C", 1.0)];
        let report = p.analyze_blocking(&records);
        assert!(report.hubs.is_empty());
        assert_eq!(report.summary.executive.unique_entities, 3);
    }
}
