//! Graph-level summary.
//!
//! Node and edge counts, density, weakly connected components, the top
//! entities per centrality measure and the community size distribution.

use crate::types::{EntityGraph, EntityScore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top entities per centrality measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopEntities {
    /// Highest degree centrality.
    pub degree_centrality: Vec<EntityScore>,
    /// Highest betweenness centrality.
    pub betweenness_centrality: Vec<EntityScore>,
    /// Highest closeness centrality.
    pub closeness_centrality: Vec<EntityScore>,
}

/// Community size distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    /// Number of communities.
    pub count: usize,
    /// Members per community id.
    pub sizes: BTreeMap<u32, usize>,
}

/// Structural summary of an analysed graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Number of entities.
    pub nodes: usize,
    /// Number of merged edges.
    pub edges: usize,
    /// Directed density `E / (V (V - 1))`.
    pub density: f64,
    /// True when the graph is non-empty and has one weak component.
    pub is_weakly_connected: bool,
    /// Number of weakly connected components.
    pub component_count: usize,
    /// Component sizes, largest first.
    pub component_sizes: Vec<usize>,
    /// Top entities per centrality measure.
    pub top_entities: TopEntities,
    /// Communities, when community detection ran.
    pub communities: Option<CommunitySummary>,
}

impl GraphSummary {
    /// Summarise a graph whose metrics have been computed.
    #[must_use]
    pub fn compute(graph: &EntityGraph, top_k: usize) -> Self {
        let mut component_sizes = weak_component_sizes(graph);
        component_sizes.sort_unstable_by(|a, b| b.cmp(a));

        let top = |score: fn(&crate::types::EntityMetrics) -> f64| {
            let mut ranked: Vec<EntityScore> = graph
                .entities()
                .iter()
                .map(|e| EntityScore {
                    entity_id: e.id.clone(),
                    score: score(&e.metrics),
                })
                .collect();
            ranked.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.entity_id.cmp(&b.entity_id))
            });
            ranked.truncate(top_k);
            ranked
        };

        let mut sizes: BTreeMap<u32, usize> = BTreeMap::new();
        for entity in graph.entities() {
            if let Some(c) = entity.metrics.community_id {
                *sizes.entry(c).or_insert(0) += 1;
            }
        }
        let communities = (!sizes.is_empty()).then(|| CommunitySummary {
            count: sizes.len(),
            sizes,
        });

        Self {
            nodes: graph.num_nodes(),
            edges: graph.num_edges(),
            density: graph.density(),
            is_weakly_connected: component_sizes.len() == 1,
            component_count: component_sizes.len(),
            component_sizes,
            top_entities: TopEntities {
                degree_centrality: top(|m| m.degree_centrality),
                betweenness_centrality: top(|m| m.betweenness_centrality),
                closeness_centrality: top(|m| m.closeness_centrality),
            },
            communities,
        }
    }
}

/// Sizes of weakly connected components, in order of smallest member.
fn weak_component_sizes(graph: &EntityGraph) -> Vec<usize> {
    let n = graph.num_nodes();
    let mut visited = vec![false; n];
    let mut sizes = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut stack = vec![start];
        let mut size = 0usize;

        while let Some(v) = stack.pop() {
            size += 1;
            for w in graph.successors(v).chain(graph.predecessors(v)) {
                if !visited[w] {
                    visited[w] = true;
                    stack.push(w);
                }
            }
        }
        sizes.push(size);
    }

    sizes
}
