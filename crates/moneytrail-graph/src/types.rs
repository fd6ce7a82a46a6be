//! Common graph types and data structures.
//!
//! `EntityGraph` stores one merged edge per ordered `(source, target)` pair in
//! a compressed sparse row layout: edges are sorted by source then target, so
//! the outgoing edges of node `v` are a contiguous slice. A second index over
//! edge positions, sorted by target then source, serves incoming lookups.

use moneytrail_core::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dense node index. Entities are indexed in ascending id order.
pub type NodeId = usize;

// ============================================================================
// Entities and Edges
// ============================================================================

/// Derived per-entity attributes, recomputed on every metrics pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// Sum of incoming edge values.
    pub in_flow: f64,
    /// Sum of outgoing edge values.
    pub out_flow: f64,
    /// `in_flow + out_flow`.
    pub total_flow: f64,
    /// `in_flow - out_flow`.
    pub net_flow: f64,
    /// Distinct incoming counterparties (merged edges).
    pub in_degree: usize,
    /// Distinct outgoing counterparties (merged edges).
    pub out_degree: usize,
    /// `in_degree + out_degree`.
    pub total_degree: usize,
    /// Incoming transaction count.
    pub in_transactions: usize,
    /// Outgoing transaction count.
    pub out_transactions: usize,
    /// `in_transactions + out_transactions`.
    pub total_transactions: usize,
    /// `total_degree / (|V| - 1)`.
    pub degree_centrality: f64,
    /// Normalized Brandes betweenness.
    pub betweenness_centrality: f64,
    /// Outgoing-BFS closeness.
    pub closeness_centrality: f64,
    /// Eigenvector centrality on the undirected projection.
    pub eigenvector_centrality: f64,
    /// Community assignment, if community detection ran.
    pub community_id: Option<u32>,
}

/// A graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Normalized (trimmed) entity id.
    pub id: String,
    /// Derived attributes.
    pub metrics: EntityMetrics,
}

impl Entity {
    /// Create an entity with zeroed metrics.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metrics: EntityMetrics::default(),
        }
    }
}

/// Merged edge for one ordered entity pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node index.
    pub source: NodeId,
    /// Target node index.
    pub target: NodeId,
    /// Sum of merged transaction amounts.
    pub total_value: f64,
    /// Number of merged transactions.
    pub transaction_count: usize,
    /// Merged transactions in input order.
    pub transactions: Vec<TransactionRecord>,
}

impl Edge {
    /// True for an edge from a node to itself.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

// ============================================================================
// Entity Graph
// ============================================================================

/// Weighted directed transaction graph.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    entities: Vec<Entity>,
    edges: Vec<Edge>,
    /// Row offsets into `edges` (length: num_nodes + 1).
    out_offsets: Vec<usize>,
    /// Row offsets into `in_edges` (length: num_nodes + 1).
    in_offsets: Vec<usize>,
    /// Edge positions sorted by (target, source).
    in_edges: Vec<usize>,
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl EntityGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entities: Vec::new(),
            edges: Vec::new(),
            out_offsets: vec![0],
            in_offsets: vec![0],
            in_edges: Vec::new(),
        }
    }

    /// Assemble a graph from entity ids and merged edges keyed by id pair.
    ///
    /// Every edge endpoint must appear in `ids`; the map guarantees one edge
    /// per ordered pair.
    pub(crate) fn from_id_edges(
        ids: Vec<String>,
        merged: BTreeMap<(String, String), (f64, Vec<TransactionRecord>)>,
    ) -> Self {
        let entities: Vec<Entity> = ids.into_iter().map(Entity::new).collect();
        let index_of = |id: &str| {
            entities
                .binary_search_by(|e| e.id.as_str().cmp(id))
                .unwrap_or_default()
        };

        // BTreeMap order over id pairs equals (source index, target index) order.
        let edges: Vec<Edge> = merged
            .into_iter()
            .map(|((source, target), (total_value, transactions))| Edge {
                source: index_of(&source),
                target: index_of(&target),
                total_value,
                transaction_count: transactions.len(),
                transactions,
            })
            .collect();

        Self::from_sorted_edges(entities, edges)
    }

    fn from_sorted_edges(entities: Vec<Entity>, edges: Vec<Edge>) -> Self {
        let n = entities.len();

        let mut out_counts = vec![0usize; n];
        let mut in_counts = vec![0usize; n];
        for edge in &edges {
            out_counts[edge.source] += 1;
            in_counts[edge.target] += 1;
        }

        let mut out_offsets = vec![0usize; n + 1];
        let mut in_offsets = vec![0usize; n + 1];
        for i in 0..n {
            out_offsets[i + 1] = out_offsets[i] + out_counts[i];
            in_offsets[i + 1] = in_offsets[i] + in_counts[i];
        }

        // Edges are visited in source order, so each target row ends up
        // sorted by source.
        let mut in_edges = vec![0usize; edges.len()];
        let mut current_pos = in_offsets.clone();
        for (pos, edge) in edges.iter().enumerate() {
            in_edges[current_pos[edge.target]] = pos;
            current_pos[edge.target] += 1;
        }

        Self {
            entities,
            edges,
            out_offsets,
            in_offsets,
            in_edges,
        }
    }

    /// Number of entities.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.entities.len()
    }

    /// Number of merged edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// True if the graph has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in ascending id order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Entity at `node`.
    #[must_use]
    pub fn entity(&self, node: NodeId) -> Option<&Entity> {
        self.entities.get(node)
    }

    /// Index of the entity with this id.
    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeId> {
        self.entities
            .binary_search_by(|e| e.id.as_str().cmp(id))
            .ok()
    }

    /// Entity with this id.
    #[must_use]
    pub fn entity_by_id(&self, id: &str) -> Option<&Entity> {
        self.node_index(id).map(|i| &self.entities[i])
    }

    /// All merged edges sorted by (source, target).
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of `node`, sorted by target.
    #[must_use]
    pub fn out_edges(&self, node: NodeId) -> &[Edge] {
        if node >= self.num_nodes() {
            return &[];
        }
        &self.edges[self.out_offsets[node]..self.out_offsets[node + 1]]
    }

    /// Incoming edges of `node`, sorted by source.
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        let range = if node < self.num_nodes() {
            self.in_offsets[node]..self.in_offsets[node + 1]
        } else {
            0..0
        };
        self.in_edges[range].iter().map(move |&pos| &self.edges[pos])
    }

    /// Targets of the outgoing edges of `node`, ascending.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.out_edges(node).iter().map(|e| e.target)
    }

    /// Sources of the incoming edges of `node`, ascending.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.in_edges(node).map(|e| e.source)
    }

    /// Number of distinct outgoing counterparties.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.out_edges(node).len()
    }

    /// Number of distinct incoming counterparties.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        if node >= self.num_nodes() {
            return 0;
        }
        self.in_offsets[node + 1] - self.in_offsets[node]
    }

    /// Merged edge `source -> target`, if any.
    #[must_use]
    pub fn edge(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
        let row = self.out_edges(source);
        row.binary_search_by(|e| e.target.cmp(&target))
            .ok()
            .map(|i| &row[i])
    }

    /// Merged edge between two entity ids, if any.
    #[must_use]
    pub fn edge_by_ids(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edge(self.node_index(source)?, self.node_index(target)?)
    }

    /// Total value over all edges.
    #[must_use]
    pub fn total_value(&self) -> f64 {
        self.edges.iter().map(|e| e.total_value).sum()
    }

    /// Total transactions over all edges.
    #[must_use]
    pub fn total_transactions(&self) -> usize {
        self.edges.iter().map(|e| e.transaction_count).sum()
    }

    /// Directed density `E / (V (V - 1))`.
    #[must_use]
    pub fn density(&self) -> f64 {
        let n = self.num_nodes();
        if n <= 1 {
            return 0.0;
        }
        let max_edges = n * (n - 1);
        self.num_edges() as f64 / max_edges as f64
    }

    /// Undirected weighted projection without self-loops.
    ///
    /// Edges `a -> b` and `b -> a` collapse into one neighbor entry whose
    /// weight is the sum of both values. Rows are sorted by neighbor.
    #[must_use]
    pub fn undirected_projection(&self) -> Vec<Vec<(NodeId, f64)>> {
        let mut rows: Vec<BTreeMap<NodeId, f64>> = vec![BTreeMap::new(); self.num_nodes()];
        for edge in self.edges.iter().filter(|e| !e.is_self_loop()) {
            *rows[edge.source].entry(edge.target).or_insert(0.0) += edge.total_value;
            *rows[edge.target].entry(edge.source).or_insert(0.0) += edge.total_value;
        }
        rows.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

/// Entity with a score, used for top-k listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScore {
    /// Entity id.
    pub entity_id: String,
    /// Score.
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: u64, s: &str, t: &str, amount: f64) -> TransactionRecord {
        TransactionRecord::new(i, s, t, amount)
    }

    fn triangle() -> EntityGraph {
        let mut merged = BTreeMap::new();
        merged.insert(
            ("A".to_string(), "B".to_string()),
            (100.0, vec![record(0, "A", "B", 100.0)]),
        );
        merged.insert(
            ("B".to_string(), "C".to_string()),
            (50.0, vec![record(1, "B", "C", 50.0)]),
        );
        merged.insert(
            ("C".to_string(), "A".to_string()),
            (25.0, vec![record(2, "C", "A", 25.0)]),
        );
        EntityGraph::from_id_edges(
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            merged,
        )
    }

    #[test]
    fn test_csr_layout() {
        let graph = triangle();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(graph.out_degree(0), 1);
        assert_eq!(graph.in_degree(0), 1);
        assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(graph.predecessors(0).collect::<Vec<_>>(), vec![2]);
        assert_eq!(graph.edge_by_ids("C", "A").map(|e| e.total_value), Some(25.0));
        assert!(graph.edge_by_ids("A", "C").is_none());
    }

    #[test]
    fn test_density_and_totals() {
        let graph = triangle();
        assert!((graph.density() - 0.5).abs() < 1e-12);
        assert_eq!(graph.total_transactions(), 3);
        assert!((graph.total_value() - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_undirected_projection() {
        let graph = triangle();
        let projection = graph.undirected_projection();
        assert_eq!(projection[0], vec![(1, 100.0), (2, 25.0)]);
        assert_eq!(projection[1], vec![(0, 100.0), (2, 50.0)]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = EntityGraph::empty();
        assert!(graph.is_empty());
        assert_eq!(graph.out_edges(3).len(), 0);
        assert_eq!(graph.in_edges(3).count(), 0);
        assert_eq!(graph.density(), 0.0);
    }
}
