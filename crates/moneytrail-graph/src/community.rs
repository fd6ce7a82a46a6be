//! Community detection.
//!
//! This module provides interchangeable strategies behind `CommunityStrategy`:
//! - Louvain (multi-level modularity optimization)
//! - Greedy modularity (Clauset-Newman-Moore agglomeration)
//! - Label propagation (deterministic, ties go to the smallest label)
//!
//! All strategies run on the undirected projection of the transaction graph
//! and return contiguous community ids in first-appearance order over
//! ascending entity id. Louvain and greedy modularity weight edges by merged
//! value; label propagation counts neighbors and ignores value. Reported
//! modularity is always the value-weighted score.

use crate::types::{EntityGraph, NodeId};
use moneytrail_core::{
    analyzer::AnalyzerMetadata, config::CommunityMethod, domain::Domain, traits::Analyzer,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

/// Relative gain below which a move does not count as an improvement.
const MIN_GAIN: f64 = 1e-12;

/// Upper bound on label propagation passes.
const MAX_LABEL_PASSES: u32 = 100;

// ============================================================================
// Partition
// ============================================================================

/// Community assignment for every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Community id per entity id.
    pub assignments: BTreeMap<String, u32>,
    /// Number of communities found.
    pub num_communities: usize,
    /// Modularity score of the assignment.
    pub modularity: f64,
}

impl Partition {
    /// Community of an entity.
    #[must_use]
    pub fn community_of(&self, entity_id: &str) -> Option<u32> {
        self.assignments.get(entity_id).copied()
    }

    /// Community sizes, indexed by community id.
    #[must_use]
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.num_communities];
        for &c in self.assignments.values() {
            sizes[c as usize] += 1;
        }
        sizes
    }

    fn from_labels(graph: &EntityGraph, weighted: &WeightedGraph, labels: &[usize]) -> Self {
        let renumbered = renumber(labels);
        let num_communities = renumbered.iter().max().map_or(0, |&m| m as usize + 1);
        let modularity = weighted.modularity(&renumbered.iter().map(|&c| c as usize).collect::<Vec<_>>());
        let assignments = graph
            .entities()
            .iter()
            .zip(&renumbered)
            .map(|(e, &c)| (e.id.clone(), c))
            .collect();

        Self {
            assignments,
            num_communities,
            modularity,
        }
    }
}

/// Renumber labels contiguously in order of first appearance.
fn renumber(labels: &[usize]) -> Vec<u32> {
    let mut map: HashMap<usize, u32> = HashMap::new();
    let mut next_id = 0u32;
    labels
        .iter()
        .map(|label| {
            *map.entry(*label).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            })
        })
        .collect()
}

/// A community detection algorithm.
pub trait CommunityStrategy: Send + Sync + Debug {
    /// Strategy name.
    fn name(&self) -> &'static str;

    /// Partition the entities of `graph`.
    fn partition(&self, graph: &EntityGraph) -> Partition;
}

/// Strategy for a configured method; `None` when detection is disabled.
#[must_use]
pub fn strategy_for(method: CommunityMethod) -> Option<Box<dyn CommunityStrategy>> {
    match method {
        CommunityMethod::Louvain => Some(Box::new(LouvainCommunity::new())),
        CommunityMethod::GreedyModularity => Some(Box::new(GreedyModularity::new())),
        CommunityMethod::LabelPropagation => Some(Box::new(LabelPropagation::new())),
        CommunityMethod::Disabled => None,
    }
}

// ============================================================================
// Weighted undirected graph
// ============================================================================

/// Undirected weighted graph with explicit self-loop weights.
///
/// Louvain aggregation turns intra-community weight into self-loops, so the
/// loop weight is kept apart from the neighbor rows.
#[derive(Debug, Clone)]
struct WeightedGraph {
    adj: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
    /// Weighted degree: neighbor weights plus twice the loop weight.
    degree: Vec<f64>,
    /// Twice the total edge weight.
    two_m: f64,
}

impl WeightedGraph {
    fn new(adj: Vec<Vec<(usize, f64)>>, loops: Vec<f64>) -> Self {
        let degree: Vec<f64> = adj
            .iter()
            .zip(&loops)
            .map(|(row, l)| row.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * l)
            .collect();
        let two_m = degree.iter().sum();
        Self {
            adj,
            loops,
            degree,
            two_m,
        }
    }

    fn from_entity_graph(graph: &EntityGraph) -> Self {
        let n = graph.num_nodes();
        Self::new(graph.undirected_projection(), vec![0.0; n])
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    /// Q = Σ_c [ L_c / m - (d_c / 2m)^2 ]
    fn modularity(&self, communities: &[usize]) -> f64 {
        if self.two_m <= 0.0 {
            return 0.0;
        }
        let m = self.two_m / 2.0;
        let k = communities.iter().max().map_or(0, |&c| c + 1);
        let mut internal = vec![0.0f64; k];
        let mut total = vec![0.0f64; k];

        for i in 0..self.len() {
            let ci = communities[i];
            total[ci] += self.degree[i];
            internal[ci] += self.loops[i];
            for &(j, w) in &self.adj[i] {
                // Each undirected edge appears in both rows.
                if communities[j] == ci {
                    internal[ci] += w / 2.0;
                }
            }
        }

        internal
            .iter()
            .zip(&total)
            .map(|(l, d)| l / m - (d / self.two_m).powi(2))
            .sum()
    }

    /// Collapse communities into single nodes.
    fn aggregate(&self, communities: &[usize], k: usize) -> Self {
        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); k];
        let mut loops = vec![0.0f64; k];
        for i in 0..self.len() {
            let ci = communities[i];
            loops[ci] += self.loops[i];
            for &(j, w) in &self.adj[i] {
                let cj = communities[j];
                if ci == cj {
                    loops[ci] += w / 2.0;
                } else {
                    *rows[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }
        Self::new(
            rows.into_iter().map(|r| r.into_iter().collect()).collect(),
            loops,
        )
    }
}

// ============================================================================
// Louvain
// ============================================================================

/// Louvain community detection.
///
/// Multi-level modularity optimization: greedy local moves until no node
/// improves, then aggregation of communities into nodes, repeated while the
/// partition keeps shrinking.
#[derive(Debug, Clone)]
pub struct LouvainCommunity {
    metadata: AnalyzerMetadata,
    max_levels: u32,
}

impl LouvainCommunity {
    /// Create a new Louvain strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/louvain-community", Domain::GraphAnalytics)
                .with_description("Louvain community detection (modularity optimization)"),
            max_levels: 32,
        }
    }

    /// One local-moving phase. Returns labels and whether any node moved.
    fn local_moving(graph: &WeightedGraph) -> (Vec<usize>, bool) {
        let n = graph.len();
        let mut communities: Vec<usize> = (0..n).collect();
        let mut totals: Vec<f64> = graph.degree.clone();
        let mut moved_any = false;

        if graph.two_m <= 0.0 {
            return (communities, false);
        }

        loop {
            let mut moved = false;

            for node in 0..n {
                let current = communities[node];
                let k_i = graph.degree[node];

                // Weight from node to each neighboring community
                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(j, w) in &graph.adj[node] {
                    *links.entry(communities[j]).or_insert(0.0) += w;
                }

                totals[current] -= k_i;
                let gain = |c: usize, k_in: f64| k_in - totals[c] * k_i / graph.two_m;

                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&c, &k_in) in &links {
                    let g = gain(c, k_in);
                    if g > best_gain + MIN_GAIN {
                        best = c;
                        best_gain = g;
                    }
                }

                totals[best] += k_i;
                if best != current {
                    communities[node] = best;
                    moved = true;
                    moved_any = true;
                }
            }

            if !moved {
                break;
            }
        }

        (communities, moved_any)
    }

    fn run(&self, graph: &EntityGraph) -> Vec<usize> {
        let mut level_graph = WeightedGraph::from_entity_graph(graph);
        let mut membership: Vec<usize> = (0..graph.num_nodes()).collect();

        for level in 0..self.max_levels {
            let (communities, moved) = Self::local_moving(&level_graph);
            if !moved {
                tracing::trace!(level, "Louvain converged");
                break;
            }

            let compact: Vec<usize> = renumber(&communities).into_iter().map(|c| c as usize).collect();
            let k = compact.iter().max().map_or(0, |&m| m + 1);

            for m in &mut membership {
                *m = compact[*m];
            }
            level_graph = level_graph.aggregate(&compact, k);
        }

        membership
    }
}

impl Default for LouvainCommunity {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for LouvainCommunity {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

impl CommunityStrategy for LouvainCommunity {
    fn name(&self) -> &'static str {
        "louvain"
    }

    fn partition(&self, graph: &EntityGraph) -> Partition {
        let weighted = WeightedGraph::from_entity_graph(graph);
        Partition::from_labels(graph, &weighted, &self.run(graph))
    }
}

// ============================================================================
// Greedy Modularity (CNM)
// ============================================================================

/// Agglomerative greedy modularity maximization.
///
/// Starts from singletons and repeatedly merges the connected pair of
/// communities with the largest modularity gain `2 (e_ij - a_i a_j)` while
/// that gain is positive. Ties go to the lexicographically smallest pair.
#[derive(Debug, Clone)]
pub struct GreedyModularity {
    metadata: AnalyzerMetadata,
}

impl GreedyModularity {
    /// Create a new greedy modularity strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/greedy-modularity", Domain::GraphAnalytics)
                .with_description("Clauset-Newman-Moore greedy modularity"),
        }
    }

    fn run(graph: &WeightedGraph) -> Vec<usize> {
        let n = graph.len();
        let mut membership: Vec<usize> = (0..n).collect();
        if graph.two_m <= 0.0 {
            return membership;
        }

        // e_ij and a_i as fractions of 2m
        let mut links: BTreeMap<usize, BTreeMap<usize, f64>> = (0..n)
            .map(|i| {
                let row = graph.adj[i]
                    .iter()
                    .map(|&(j, w)| (j, w / graph.two_m))
                    .collect();
                (i, row)
            })
            .collect();
        let mut a: Vec<f64> = graph.degree.iter().map(|d| d / graph.two_m).collect();

        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for (&i, row) in &links {
                for (&j, &e_ij) in row.range(i + 1..) {
                    let delta = 2.0 * (e_ij - a[i] * a[j]);
                    if delta > MIN_GAIN && best.map_or(true, |(_, _, b)| delta > b + MIN_GAIN) {
                        best = Some((i, j, delta));
                    }
                }
            }

            let Some((keep, absorb, _)) = best else {
                break;
            };

            // Merge `absorb` into `keep`
            let absorbed = links.remove(&absorb).unwrap_or_default();
            for (k, e) in absorbed {
                if k == keep {
                    continue;
                }
                if let Some(row) = links.get_mut(&k) {
                    row.remove(&absorb);
                    *row.entry(keep).or_insert(0.0) += e;
                }
                if let Some(row) = links.get_mut(&keep) {
                    *row.entry(k).or_insert(0.0) += e;
                }
            }
            if let Some(row) = links.get_mut(&keep) {
                row.remove(&absorb);
            }
            a[keep] += a[absorb];
            a[absorb] = 0.0;

            for m in &mut membership {
                if *m == absorb {
                    *m = keep;
                }
            }
        }

        membership
    }
}

impl Default for GreedyModularity {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for GreedyModularity {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

impl CommunityStrategy for GreedyModularity {
    fn name(&self) -> &'static str {
        "greedy_modularity"
    }

    fn partition(&self, graph: &EntityGraph) -> Partition {
        let weighted = WeightedGraph::from_entity_graph(graph);
        let labels = Self::run(&weighted);
        Partition::from_labels(graph, &weighted, &labels)
    }
}

// ============================================================================
// Label Propagation
// ============================================================================

/// Label propagation community detection.
///
/// Each node adopts the label carried by most of its neighbors, counted
/// without regard to edge value. Nodes are
/// visited in ascending order and ties go to the smallest label, so the
/// result is deterministic.
#[derive(Debug, Clone)]
pub struct LabelPropagation {
    metadata: AnalyzerMetadata,
    max_iterations: u32,
}

impl LabelPropagation {
    /// Create a new label propagation strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/label-propagation", Domain::GraphAnalytics)
                .with_description("Label propagation community detection"),
            max_iterations: MAX_LABEL_PASSES,
        }
    }

    fn run(&self, adj: &[Vec<(NodeId, f64)>]) -> Vec<usize> {
        let n = adj.len();
        let mut labels: Vec<usize> = (0..n).collect();

        for _ in 0..self.max_iterations {
            let mut changed = false;

            for node in 0..n {
                let mut label_counts: BTreeMap<usize, usize> = BTreeMap::new();
                for &(neighbor, _) in &adj[node] {
                    *label_counts.entry(labels[neighbor]).or_insert(0) += 1;
                }

                // BTreeMap iterates labels ascending; keep the first maximum
                let mut best: Option<(usize, usize)> = None;
                for (&label, &count) in &label_counts {
                    if best.map_or(true, |(_, c)| count > c) {
                        best = Some((label, count));
                    }
                }

                if let Some((best_label, _)) = best {
                    if labels[node] != best_label {
                        labels[node] = best_label;
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        labels
    }
}

impl Default for LabelPropagation {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for LabelPropagation {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

impl CommunityStrategy for LabelPropagation {
    fn name(&self) -> &'static str {
        "label_propagation"
    }

    fn partition(&self, graph: &EntityGraph) -> Partition {
        let weighted = WeightedGraph::from_entity_graph(graph);
        let labels = self.run(&weighted.adj);
        Partition::from_labels(graph, &weighted, &labels)
    }
}
