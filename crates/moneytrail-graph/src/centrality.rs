//! Centrality measures.
//!
//! This module provides the per-entity centrality algorithms:
//! - Degree centrality
//! - Betweenness centrality (Brandes algorithm)
//! - Closeness centrality (BFS-based)
//! - Eigenvector centrality (power iteration on the undirected projection)

use crate::types::{EntityGraph, EntityScore};
use moneytrail_core::{
    analyzer::AnalyzerMetadata, domain::Domain, error::AnalysisError, traits::Analyzer,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Scores per node, indexed like the graph's entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityResult {
    /// Score per node.
    pub scores: Vec<f64>,
    /// Number of iterations (for iterative algorithms).
    pub iterations: Option<u32>,
    /// Whether the algorithm converged.
    pub converged: bool,
}

impl CentralityResult {
    fn exact(scores: Vec<f64>) -> Self {
        Self {
            scores,
            iterations: None,
            converged: true,
        }
    }

    /// Top-k entities by score, ties broken by id.
    #[must_use]
    pub fn top_k(&self, graph: &EntityGraph, k: usize) -> Vec<EntityScore> {
        let mut ranked: Vec<EntityScore> = graph
            .entities()
            .iter()
            .zip(&self.scores)
            .map(|(e, &score)| EntityScore {
                entity_id: e.id.clone(),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        ranked.truncate(k);
        ranked
    }
}

// ============================================================================
// Degree Centrality
// ============================================================================

/// Degree centrality.
///
/// `(in_degree + out_degree) / (n - 1)` over merged edges.
#[derive(Debug, Clone)]
pub struct DegreeCentrality {
    metadata: AnalyzerMetadata,
}

impl DegreeCentrality {
    /// Create a new degree centrality analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/degree-centrality", Domain::GraphAnalytics)
                .with_description("Normalized in+out degree"),
        }
    }

    /// Calculate degree centrality for all nodes.
    pub fn compute(graph: &EntityGraph) -> CentralityResult {
        let n = graph.num_nodes();
        let normalizer = if n > 1 { (n - 1) as f64 } else { 1.0 };

        CentralityResult::exact(
            (0..n)
                .map(|i| (graph.in_degree(i) + graph.out_degree(i)) as f64 / normalizer)
                .collect(),
        )
    }
}

impl Default for DegreeCentrality {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for DegreeCentrality {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

// ============================================================================
// Betweenness Centrality (Brandes Algorithm)
// ============================================================================

/// Betweenness centrality.
///
/// Uses Brandes algorithm for efficient computation in O(VE) time over
/// directed, unweighted shortest paths.
#[derive(Debug, Clone)]
pub struct BetweennessCentrality {
    metadata: AnalyzerMetadata,
}

impl BetweennessCentrality {
    /// Create a new betweenness centrality analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/betweenness-centrality", Domain::GraphAnalytics)
                .with_description("Betweenness centrality (Brandes algorithm)"),
        }
    }

    /// Compute betweenness centrality.
    ///
    /// Normalized by `(n-1)(n-2)`; all zeros when `n <= 2`.
    pub fn compute(graph: &EntityGraph) -> CentralityResult {
        let n = graph.num_nodes();
        let mut centrality = vec![0.0f64; n];
        if n <= 2 {
            return CentralityResult::exact(centrality);
        }

        for s in 0..n {
            let mut stack: Vec<usize> = Vec::with_capacity(n);
            let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n]; // Number of shortest paths
            let mut dist = vec![-1i64; n];

            sigma[s] = 1.0;
            dist[s] = 0;

            let mut queue = VecDeque::new();
            queue.push_back(s);

            while let Some(v) = queue.pop_front() {
                stack.push(v);

                for w in graph.successors(v) {
                    if dist[w] < 0 {
                        dist[w] = dist[v] + 1;
                        queue.push_back(w);
                    }

                    if dist[w] == dist[v] + 1 {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                }
            }

            // Backward pass - accumulate dependencies
            let mut delta = vec![0.0f64; n];

            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
                }

                if w != s {
                    centrality[w] += delta[w];
                }
            }
        }

        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for c in &mut centrality {
            *c *= scale;
        }

        CentralityResult::exact(centrality)
    }
}

impl Default for BetweennessCentrality {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for BetweennessCentrality {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

// ============================================================================
// Closeness Centrality
// ============================================================================

/// Closeness centrality.
///
/// Closeness = reachable / sum(shortest_path_distances), following
/// outgoing edges. Zero for nodes that reach nothing.
#[derive(Debug, Clone)]
pub struct ClosenessCentrality {
    metadata: AnalyzerMetadata,
}

impl ClosenessCentrality {
    /// Create a new closeness centrality analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/closeness-centrality", Domain::GraphAnalytics)
                .with_description("Closeness centrality (BFS-based)"),
        }
    }

    /// Compute closeness centrality using BFS from each node.
    pub fn compute(graph: &EntityGraph) -> CentralityResult {
        let n = graph.num_nodes();
        let mut centrality = vec![0.0f64; n];

        for (source, score) in centrality.iter_mut().enumerate() {
            let distances = Self::bfs_distances(graph, source);
            let sum: u64 = distances.iter().flatten().sum();
            let reachable = distances.iter().flatten().filter(|&&d| d > 0).count();

            if sum > 0 && reachable > 0 {
                *score = reachable as f64 / sum as f64;
            }
        }

        CentralityResult::exact(centrality)
    }

    /// BFS distances from `source`; `None` for unreachable nodes.
    fn bfs_distances(graph: &EntityGraph, source: usize) -> Vec<Option<u64>> {
        let mut distances = vec![None; graph.num_nodes()];
        distances[source] = Some(0);

        let mut queue = VecDeque::new();
        queue.push_back((source, 0u64));

        while let Some((v, d)) = queue.pop_front() {
            for w in graph.successors(v) {
                if distances[w].is_none() {
                    distances[w] = Some(d + 1);
                    queue.push_back((w, d + 1));
                }
            }
        }

        distances
    }
}

impl Default for ClosenessCentrality {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for ClosenessCentrality {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

// ============================================================================
// Eigenvector Centrality
// ============================================================================

/// Eigenvector centrality.
///
/// Power iteration on `A + I` of the unweighted undirected projection
/// (self-loops ignored). The identity shift keeps bipartite components from
/// oscillating and leaves the eigenvectors unchanged.
#[derive(Debug, Clone)]
pub struct EigenvectorCentrality {
    metadata: AnalyzerMetadata,
}

impl EigenvectorCentrality {
    /// Create a new eigenvector centrality analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/eigenvector-centrality", Domain::GraphAnalytics)
                .with_description("Eigenvector centrality (power iteration)"),
        }
    }

    /// Compute eigenvector centrality using power iteration.
    ///
    /// Converged when the L1 change between iterations drops below
    /// `tolerance * n`.
    pub fn compute(graph: &EntityGraph, max_iterations: u32, tolerance: f64) -> CentralityResult {
        let n = graph.num_nodes();
        if n == 0 {
            return CentralityResult {
                scores: Vec::new(),
                iterations: Some(0),
                converged: true,
            };
        }

        let neighbors = graph.undirected_projection();
        let mut scores = vec![1.0 / (n as f64).sqrt(); n];
        let mut new_scores = vec![0.0f64; n];
        let mut converged = false;
        let mut iterations = 0u32;

        for iter in 0..max_iterations {
            iterations = iter + 1;

            // x_i = x_i + sum(A_ij * x_j)
            for (i, row) in neighbors.iter().enumerate() {
                new_scores[i] = scores[i] + row.iter().map(|&(j, _)| scores[j]).sum::<f64>();
            }

            let norm: f64 = new_scores.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm > 0.0 {
                for x in &mut new_scores {
                    *x /= norm;
                }
            }

            let diff: f64 = scores
                .iter()
                .zip(new_scores.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();

            std::mem::swap(&mut scores, &mut new_scores);

            if diff < tolerance * n as f64 {
                converged = true;
                break;
            }
        }

        CentralityResult {
            scores,
            iterations: Some(iterations),
            converged,
        }
    }

    /// Like `compute`, but a non-converged run yields zeros and an error.
    pub fn compute_or_degrade(
        graph: &EntityGraph,
        max_iterations: u32,
        tolerance: f64,
    ) -> (CentralityResult, Option<AnalysisError>) {
        let result = Self::compute(graph, max_iterations, tolerance);
        if result.converged {
            return (result, None);
        }

        let iterations = result.iterations.unwrap_or(max_iterations);
        tracing::warn!(
            iterations,
            nodes = graph.num_nodes(),
            "Eigenvector centrality did not converge, falling back to zeros"
        );
        (
            CentralityResult {
                scores: vec![0.0; graph.num_nodes()],
                iterations: Some(iterations),
                converged: false,
            },
            Some(AnalysisError::Centrality { iterations }),
        )
    }
}

impl Default for EigenvectorCentrality {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for EigenvectorCentrality {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}
