//! Graph construction from transaction records.
//!
//! Records are validated one by one. Invalid records are rejected and
//! counted; they never abort the build. Valid records are merged into one
//! edge per ordered `(source, target)` pair.

use crate::types::EntityGraph;
use async_trait::async_trait;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    config::SelfLoopPolicy,
    domain::Domain,
    error::{AnalysisError, Result},
    traits::{Analyzer, BatchAnalyzer},
    transaction::TransactionRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A record the builder refused, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position of the record in the caller's input.
    pub origin_index: u64,
    /// Why it was rejected.
    pub reason: String,
}

impl From<RejectedRecord> for AnalysisError {
    fn from(rejected: RejectedRecord) -> Self {
        AnalysisError::invalid_record(rejected.origin_index, rejected.reason)
    }
}

/// Result of a lenient build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The merged graph.
    pub graph: EntityGraph,
    /// Records skipped during the build, in input order.
    pub rejected: Vec<RejectedRecord>,
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Aggregates transaction records into an `EntityGraph`.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    metadata: AnalyzerMetadata,
    self_loops: SelfLoopPolicy,
}

impl GraphBuilder {
    /// Create a builder that keeps self-loops.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/builder", Domain::GraphAnalytics)
                .with_description("Merged weighted directed graph from transactions"),
            self_loops: SelfLoopPolicy::Allow,
        }
    }

    /// Set the self-loop policy.
    #[must_use]
    pub fn with_self_loops(mut self, policy: SelfLoopPolicy) -> Self {
        self.self_loops = policy;
        self
    }

    /// Check a single record.
    pub fn validate_record(&self, record: &TransactionRecord) -> std::result::Result<(), RejectedRecord> {
        let reject = |reason: &str| RejectedRecord {
            origin_index: record.origin_index,
            reason: reason.to_string(),
        };

        if record.source().is_empty() {
            return Err(reject("empty source id"));
        }
        if record.target().is_empty() {
            return Err(reject("empty target id"));
        }
        if !record.amount.is_finite() {
            return Err(reject("amount is not a finite number"));
        }
        if record.amount < 0.0 {
            return Err(reject("negative amount"));
        }
        if self.self_loops == SelfLoopPolicy::Reject && record.is_self_loop() {
            return Err(reject("self-loop rejected by policy"));
        }
        Ok(())
    }

    /// Build a graph, skipping and counting invalid records.
    pub fn build(&self, records: &[TransactionRecord]) -> BuildOutcome {
        let mut ids: BTreeSet<String> = BTreeSet::new();
        let mut merged: BTreeMap<(String, String), (f64, Vec<TransactionRecord>)> =
            BTreeMap::new();
        let mut rejected = Vec::new();

        for record in records {
            if let Err(reason) = self.validate_record(record) {
                tracing::debug!(
                    origin_index = reason.origin_index,
                    reason = %reason.reason,
                    "Rejected transaction record"
                );
                rejected.push(reason);
                continue;
            }

            let source = record.source().to_string();
            let target = record.target().to_string();
            let normalized = TransactionRecord {
                source_id: source.clone(),
                target_id: target.clone(),
                ..record.clone()
            };

            ids.insert(source.clone());
            ids.insert(target.clone());

            let (total_value, transactions) = merged.entry((source, target)).or_default();
            *total_value += normalized.amount;
            transactions.push(normalized);
        }

        if !rejected.is_empty() {
            tracing::warn!(
                analyzer = %self.metadata.id,
                rejected = rejected.len(),
                total = records.len(),
                "Skipped invalid transaction records"
            );
        }

        let graph = EntityGraph::from_id_edges(ids.into_iter().collect(), merged);
        tracing::debug!(
            analyzer = %self.metadata.id,
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            "Graph built"
        );

        BuildOutcome { graph, rejected }
    }

    /// Build a graph, failing on the first invalid record.
    pub fn try_build(&self, records: &[TransactionRecord]) -> Result<EntityGraph> {
        if let Some(bad) = records.iter().find_map(|r| self.validate_record(r).err()) {
            return Err(bad.into());
        }
        Ok(self.build(records).graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for GraphBuilder {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<[TransactionRecord]>, BuildOutcome> for GraphBuilder {
    async fn execute(&self, input: Arc<[TransactionRecord]>) -> Result<BuildOutcome> {
        Ok(self.build(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(i: u64, s: &str, t: &str, amount: f64) -> TransactionRecord {
        TransactionRecord::new(i, s, t, amount)
    }

    #[test]
    fn test_parallel_transactions_merge() {
        let records = vec![
            tx(0, "A", "B", 100.0),
            tx(1, "A", "B", 250.0),
            tx(2, "B", "A", 10.0),
        ];
        let outcome = GraphBuilder::new().build(&records);
        let graph = outcome.graph;

        assert!(outcome.rejected.is_empty());
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.num_edges(), 2);

        let ab = graph.edge_by_ids("A", "B").unwrap();
        assert_eq!(ab.transaction_count, 2);
        assert!((ab.total_value - 350.0).abs() < 1e-9);
        assert_eq!(
            ab.transactions.iter().map(|t| t.origin_index).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_ids_are_trimmed() {
        let records = vec![tx(0, " A ", "B", 1.0), tx(1, "A", "B ", 2.0)];
        let graph = GraphBuilder::new().build(&records).graph;
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.edge_by_ids("A", "B").unwrap().transaction_count, 2);
        assert_eq!(graph.edges()[0].transactions[0].source_id, "A");
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let records = vec![
            tx(0, "A", "B", 100.0),
            tx(1, "", "B", 100.0),
            tx(2, "A", "B", -5.0),
            tx(3, "A", "B", f64::NAN),
            tx(4, "B", "C", 1.0),
        ];
        let outcome = GraphBuilder::new().build(&records);
        assert_eq!(
            outcome.rejected.iter().map(|r| r.origin_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(outcome.graph.num_edges(), 2);
    }

    #[test]
    fn test_self_loop_policy() {
        let records = vec![tx(0, "A", "A", 10.0), tx(1, "A", "B", 10.0)];

        let allowed = GraphBuilder::new().build(&records);
        assert_eq!(allowed.graph.num_edges(), 2);
        assert!(allowed.graph.edge_by_ids("A", "A").unwrap().is_self_loop());

        let rejected = GraphBuilder::new()
            .with_self_loops(SelfLoopPolicy::Reject)
            .build(&records);
        assert_eq!(rejected.graph.num_edges(), 1);
        assert_eq!(rejected.rejected.len(), 1);
    }

    #[test]
    fn test_try_build_is_strict() {
        let records = vec![tx(0, "A", "B", 1.0), tx(7, "A", "B", -1.0)];
        let err = GraphBuilder::new().try_build(&records).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRecord { origin_index: 7, .. }));
    }

    #[test]
    fn test_permutation_gives_same_structure() {
        let records = vec![
            tx(0, "C", "A", 5.0),
            tx(1, "A", "B", 7.0),
            tx(2, "B", "C", 9.0),
            tx(3, "A", "B", 1.0),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let g1 = GraphBuilder::new().build(&records).graph;
        let g2 = GraphBuilder::new().build(&reversed).graph;

        let ids = |g: &EntityGraph| g.entities().iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&g1), ids(&g2));
        for (a, b) in g1.edges().iter().zip(g2.edges()) {
            assert_eq!((a.source, a.target), (b.source, b.target));
            assert_eq!(a.transaction_count, b.transaction_count);
            assert!((a.total_value - b.total_value).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_batch_execute() {
        let records: Arc<[TransactionRecord]> = vec![tx(0, "A", "B", 3.0)].into();
        let outcome = GraphBuilder::new().execute(records).await.unwrap();
        assert_eq!(outcome.graph.num_nodes(), 2);
    }
}
