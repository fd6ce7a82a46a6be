//! Simple directed cycle enumeration.
//!
//! Every cycle is rooted at its smallest node index: the search from `root`
//! only visits nodes with a larger index, so each cycle is reported exactly
//! once, as the rotation that starts at its minimum. Self-loops are cycles
//! of length 1.
//!
//! The search is exponential in the worst case and always runs under a
//! `WorkBudget`. Every root visit and every edge expansion is one step. When
//! a cap is hit the cycles found so far are returned together with the
//! truncation reason.

use crate::types::{EntityGraph, NodeId};
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    budget::{BudgetMeter, WorkBudget},
    domain::Domain,
    error::{AnalysisError, TruncationReason},
    traits::Analyzer,
};

/// Cycles found by one enumeration.
#[derive(Debug, Clone, Default)]
pub struct CycleEnumeration {
    /// Each cycle as node indices, starting at its smallest index.
    pub cycles: Vec<Vec<NodeId>>,
    /// Why the search stopped early, if it did.
    pub truncation: Option<TruncationReason>,
    /// Root visits and edge expansions performed.
    pub steps: u64,
}

impl CycleEnumeration {
    /// True when the search stopped before exhausting the graph.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    /// Diagnostic error describing the truncation, if any.
    #[must_use]
    pub fn truncation_error(&self) -> Option<AnalysisError> {
        self.truncation
            .map(|reason| AnalysisError::CycleEnumerationTruncated {
                cycles: self.cycles.len(),
                reason,
            })
    }
}

/// Simple cycle enumerator.
#[derive(Debug, Clone)]
pub struct SimpleCycles {
    metadata: AnalyzerMetadata,
}

impl SimpleCycles {
    /// Create a new enumerator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("graph/simple-cycles", Domain::GraphAnalytics)
                .with_description("Budgeted simple directed cycle enumeration"),
        }
    }

    /// Enumerate simple cycles of at least `min_length` nodes.
    ///
    /// Shorter cycles are still traversed but do not count against the
    /// cycle cap.
    pub fn enumerate(graph: &EntityGraph, min_length: usize, budget: &WorkBudget) -> CycleEnumeration {
        let mut meter = budget.meter();
        let mut cycles = Vec::new();
        let mut truncation = None;
        let mut on_path = vec![false; graph.num_nodes()];

        for root in 0..graph.num_nodes() {
            let searched = meter.step().and_then(|()| {
                Self::search_from(graph, root, min_length, &mut meter, &mut on_path, &mut cycles)
            });
            if let Err(reason) = searched {
                truncation = Some(reason);
                break;
            }
        }

        if let Some(reason) = truncation {
            tracing::warn!(
                cycles = cycles.len(),
                steps = meter.steps(),
                reason = %reason,
                "Cycle enumeration truncated"
            );
        }

        CycleEnumeration {
            cycles,
            truncation,
            steps: meter.steps(),
        }
    }

    /// Iterative DFS over simple paths starting at `root`.
    ///
    /// `on_path` is shared across roots and left all-false on success; after
    /// an error the caller must not reuse it.
    fn search_from(
        graph: &EntityGraph,
        root: NodeId,
        min_length: usize,
        meter: &mut BudgetMeter<'_>,
        on_path: &mut [bool],
        cycles: &mut Vec<Vec<NodeId>>,
    ) -> Result<(), TruncationReason> {
        if graph.out_edges(root).is_empty() {
            return Ok(());
        }
        let max_length = meter.max_cycle_length();
        let mut path: Vec<NodeId> = vec![root];
        // Position of the next outgoing edge to try, per path entry
        let mut cursor: Vec<usize> = vec![0];
        on_path[root] = true;

        while let Some(&node) = path.last() {
            let depth = path.len() - 1;
            let out = graph.out_edges(node);

            if cursor[depth] >= out.len() {
                on_path[node] = false;
                path.pop();
                cursor.pop();
                continue;
            }

            let next = out[cursor[depth]].target;
            cursor[depth] += 1;
            meter.step()?;

            if next == root {
                if path.len() >= min_length {
                    meter.record_cycle()?;
                    cycles.push(path.clone());
                }
            } else if next > root
                && !on_path[next]
                && max_length.map_or(true, |max| path.len() < max)
            {
                on_path[next] = true;
                path.push(next);
                cursor.push(0);
            }
        }

        Ok(())
    }
}

impl Default for SimpleCycles {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SimpleCycles {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}
