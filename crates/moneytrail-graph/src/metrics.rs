//! Per-entity metrics.
//!
//! `NodeMetricsCalculator` consumes a graph and returns it with every
//! entity's flows, degrees, transaction counts, centralities and community
//! assignment filled in. Nothing is carried over from a previous pass.

use crate::centrality::{
    BetweennessCentrality, ClosenessCentrality, DegreeCentrality, EigenvectorCentrality,
};
use crate::community::{strategy_for, Partition};
use crate::types::{EntityGraph, EntityMetrics};
use async_trait::async_trait;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    config::{AnalysisConfig, CommunityMethod, EigenvectorConfig},
    domain::Domain,
    error::{AnalysisError, Result},
    traits::{Analyzer, BatchAnalyzer},
};

/// Graph with metrics, plus any degradation encountered.
#[derive(Debug)]
pub struct MetricsOutcome {
    /// The graph with populated entity metrics.
    pub graph: EntityGraph,
    /// Set when eigenvector centrality fell back to zeros.
    pub centrality_error: Option<AnalysisError>,
    /// Community partition, when detection is enabled.
    pub partition: Option<Partition>,
}

/// Computes flows, degrees and centrality for every entity.
#[derive(Debug, Clone)]
pub struct NodeMetricsCalculator {
    metadata: AnalyzerMetadata,
    eigenvector: EigenvectorConfig,
    community: CommunityMethod,
}

impl NodeMetricsCalculator {
    /// Create a calculator with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/node-metrics", Domain::GraphAnalytics)
                .with_description("Flows, degrees, centralities and communities per entity"),
            eigenvector: EigenvectorConfig::default(),
            community: CommunityMethod::default(),
        }
    }

    /// Create a calculator from an analysis configuration.
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new()
            .with_eigenvector(config.eigenvector.clone())
            .with_community(config.community)
    }

    /// Set eigenvector parameters.
    #[must_use]
    pub fn with_eigenvector(mut self, config: EigenvectorConfig) -> Self {
        self.eigenvector = config;
        self
    }

    /// Set the community method.
    #[must_use]
    pub fn with_community(mut self, method: CommunityMethod) -> Self {
        self.community = method;
        self
    }

    /// Compute all metrics.
    pub fn compute(&self, mut graph: EntityGraph) -> MetricsOutcome {
        let n = graph.num_nodes();
        let mut metrics = vec![EntityMetrics::default(); n];

        for edge in graph.edges() {
            let out = &mut metrics[edge.source];
            out.out_flow += edge.total_value;
            out.out_degree += 1;
            out.out_transactions += edge.transaction_count;

            let inc = &mut metrics[edge.target];
            inc.in_flow += edge.total_value;
            inc.in_degree += 1;
            inc.in_transactions += edge.transaction_count;
        }

        let degree = DegreeCentrality::compute(&graph);
        let betweenness = BetweennessCentrality::compute(&graph);
        let closeness = ClosenessCentrality::compute(&graph);
        let (eigenvector, centrality_error) = EigenvectorCentrality::compute_or_degrade(
            &graph,
            self.eigenvector.max_iterations,
            self.eigenvector.tolerance,
        );

        let partition = strategy_for(self.community).map(|strategy| {
            let partition = strategy.partition(&graph);
            tracing::debug!(
                strategy = strategy.name(),
                communities = partition.num_communities,
                modularity = partition.modularity,
                "Communities detected"
            );
            partition
        });

        for (i, m) in metrics.iter_mut().enumerate() {
            m.total_flow = m.in_flow + m.out_flow;
            m.net_flow = m.in_flow - m.out_flow;
            m.total_degree = m.in_degree + m.out_degree;
            m.total_transactions = m.in_transactions + m.out_transactions;
            m.degree_centrality = degree.scores[i];
            m.betweenness_centrality = betweenness.scores[i];
            m.closeness_centrality = closeness.scores[i];
            m.eigenvector_centrality = eigenvector.scores[i];
        }

        for (entity, m) in graph.entities_mut().iter_mut().zip(metrics) {
            entity.metrics = m;
            entity.metrics.community_id = partition
                .as_ref()
                .and_then(|p| p.community_of(&entity.id));
        }

        tracing::debug!(
            analyzer = %self.metadata.id,
            nodes = n,
            degraded = centrality_error.is_some(),
            "Node metrics computed"
        );

        MetricsOutcome {
            graph,
            centrality_error,
            partition,
        }
    }
}

impl Default for NodeMetricsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for NodeMetricsCalculator {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        if self.eigenvector.max_iterations == 0 {
            return Err(AnalysisError::config(
                "eigenvector.max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchAnalyzer<EntityGraph, MetricsOutcome> for NodeMetricsCalculator {
    async fn execute(&self, input: EntityGraph) -> Result<MetricsOutcome> {
        Ok(self.compute(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use moneytrail_core::transaction::TransactionRecord;

    fn tx(i: u64, s: &str, t: &str, amount: f64) -> TransactionRecord {
        TransactionRecord::new(i, s, t, amount)
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            tx(0, "A", "B", 100.0),
            tx(1, "A", "B", 50.0),
            tx(2, "B", "C", 120.0),
            tx(3, "C", "A", 30.0),
            tx(4, "D", "A", 5.0),
            tx(5, "A", "A", 1.0),
        ]
    }

    #[test]
    fn test_flows_and_degrees() {
        let graph = GraphBuilder::new().build(&sample()).graph;
        let outcome = NodeMetricsCalculator::new().compute(graph);
        let a = &outcome.graph.entity_by_id("A").unwrap().metrics;

        assert!((a.out_flow - 151.0).abs() < 1e-9);
        assert!((a.in_flow - 36.0).abs() < 1e-9);
        assert!((a.net_flow - (36.0 - 151.0)).abs() < 1e-9);
        // A->B, A->A out; C->A, D->A, A->A in
        assert_eq!(a.out_degree, 2);
        assert_eq!(a.in_degree, 3);
        assert_eq!(a.total_degree, 5);
        assert_eq!(a.out_transactions, 3);
        assert_eq!(a.in_transactions, 3);
        assert_eq!(a.total_transactions, 6);
    }

    #[test]
    fn test_flow_conservation() {
        let graph = GraphBuilder::new().build(&sample()).graph;
        let outcome = NodeMetricsCalculator::new().compute(graph);
        let graph = &outcome.graph;

        for (i, entity) in graph.entities().iter().enumerate() {
            let incoming: f64 = graph.in_edges(i).map(|e| e.total_value).sum();
            let outgoing: f64 = graph.out_edges(i).iter().map(|e| e.total_value).sum();
            assert!((entity.metrics.in_flow - incoming).abs() < 1e-9);
            assert!((entity.metrics.out_flow - outgoing).abs() < 1e-9);
        }
        let total_in: f64 = graph.entities().iter().map(|e| e.metrics.in_flow).sum();
        assert!((total_in - graph.total_value()).abs() < 1e-9);
    }

    #[test]
    fn test_permutation_invariance() {
        let records = sample();
        let mut shuffled = records.clone();
        shuffled.rotate_left(2);
        shuffled.swap(0, 3);

        let calc = NodeMetricsCalculator::new();
        let g1 = calc.compute(GraphBuilder::new().build(&records).graph).graph;
        let g2 = calc.compute(GraphBuilder::new().build(&shuffled).graph).graph;

        for (a, b) in g1.entities().iter().zip(g2.entities()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.metrics.total_degree, b.metrics.total_degree);
            assert_eq!(a.metrics.community_id, b.metrics.community_id);
            assert!((a.metrics.total_flow - b.metrics.total_flow).abs() < 1e-9);
            assert!((a.metrics.betweenness_centrality - b.metrics.betweenness_centrality).abs() < 1e-12);
            assert!((a.metrics.eigenvector_centrality - b.metrics.eigenvector_centrality).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degraded_eigenvector() {
        let graph = GraphBuilder::new().build(&sample()).graph;
        let outcome = NodeMetricsCalculator::new()
            .with_eigenvector(EigenvectorConfig {
                max_iterations: 1,
                tolerance: 1e-15,
            })
            .compute(graph);

        assert!(matches!(
            outcome.centrality_error,
            Some(AnalysisError::Centrality { .. })
        ));
        assert!(outcome
            .graph
            .entities()
            .iter()
            .all(|e| e.metrics.eigenvector_centrality == 0.0));
    }

    #[test]
    fn test_community_disabled() {
        let graph = GraphBuilder::new().build(&sample()).graph;
        let outcome = NodeMetricsCalculator::new()
            .with_community(CommunityMethod::Disabled)
            .compute(graph);
        assert!(outcome.partition.is_none());
        assert!(outcome
            .graph
            .entities()
            .iter()
            .all(|e| e.metrics.community_id.is_none()));
    }

    #[test]
    fn test_empty_graph() {
        let outcome = NodeMetricsCalculator::new().compute(EntityGraph::empty());
        assert!(outcome.graph.is_empty());
        assert!(outcome.centrality_error.is_none());
    }

    #[tokio::test]
    async fn test_batch_execute() {
        let graph = GraphBuilder::new().build(&sample()).graph;
        let outcome = NodeMetricsCalculator::new().execute(graph).await.unwrap();
        assert!(outcome.partition.is_some());
    }
}
