//! Circular fund flow detection.
//!
//! Enumerates simple directed cycles under a `WorkBudget`, sums the merged
//! edge values along each cycle and keeps cycles whose total exceeds the
//! value threshold. A truncated enumeration still returns its alerts, flagged
//! as a lower bound.

use crate::types::{CircularFlowResult, CycleAlert, CycleHop};
use async_trait::async_trait;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    budget::WorkBudget,
    domain::Domain,
    error::{AnalysisError, Result},
    risk::RiskLevel,
    traits::{Analyzer, BatchAnalyzer},
};
use moneytrail_graph::cycles::SimpleCycles;
use moneytrail_graph::types::{EntityGraph, NodeId};
use std::cmp::Ordering;
use std::sync::Arc;

/// Circular-flow detector.
#[derive(Debug, Clone)]
pub struct CircularFlowDetector {
    metadata: AnalyzerMetadata,
    min_cycle_length: usize,
    value_threshold: f64,
    budget: WorkBudget,
}

impl CircularFlowDetector {
    /// Create a detector with minimum length 3, threshold 10000 and the default budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("compliance/circular-flow", Domain::Compliance)
                .with_description("Budgeted simple cycle search with value threshold"),
            min_cycle_length: 3,
            value_threshold: 10_000.0,
            budget: WorkBudget::default(),
        }
    }

    /// Set the minimum cycle length and value threshold.
    #[must_use]
    pub fn with_params(mut self, min_cycle_length: usize, value_threshold: f64) -> Self {
        self.min_cycle_length = min_cycle_length;
        self.value_threshold = value_threshold;
        self
    }

    /// Set the enumeration budget.
    #[must_use]
    pub fn with_budget(mut self, budget: WorkBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Detect circular flows.
    ///
    /// Alerts are sorted by total value descending, then cycle length
    /// ascending, then the entity id sequence.
    pub fn detect(
        graph: &EntityGraph,
        min_cycle_length: usize,
        value_threshold: f64,
        budget: &WorkBudget,
    ) -> CircularFlowResult {
        if graph.is_empty() {
            return CircularFlowResult::default();
        }

        let enumeration = SimpleCycles::enumerate(graph, min_cycle_length.max(1), budget);
        let cycles_examined = enumeration.cycles.len();

        let mut alerts: Vec<CycleAlert> = enumeration
            .cycles
            .iter()
            .filter_map(|cycle| Self::to_alert(graph, cycle, value_threshold))
            .collect();
        alerts.sort_by(compare_alerts);

        tracing::debug!(
            cycles = cycles_examined,
            alerts = alerts.len(),
            steps = enumeration.steps,
            truncated = enumeration.is_truncated(),
            "Circular flow detection complete"
        );

        CircularFlowResult {
            alerts,
            truncated: enumeration.is_truncated(),
            truncation: enumeration.truncation,
            cycles_examined,
        }
    }

    fn to_alert(graph: &EntityGraph, cycle: &[NodeId], value_threshold: f64) -> Option<CycleAlert> {
        let mut edges = Vec::with_capacity(cycle.len());
        for (i, &from) in cycle.iter().enumerate() {
            let to = cycle[(i + 1) % cycle.len()];
            let edge = graph.edge(from, to)?;
            edges.push(CycleHop {
                from: graph.entity(from)?.id.clone(),
                to: graph.entity(to)?.id.clone(),
                value: edge.total_value,
                transaction_count: edge.transaction_count,
            });
        }

        let total_value: f64 = edges.iter().map(|hop| hop.value).sum();
        if total_value <= value_threshold {
            return None;
        }

        let risk_level = if total_value > 5.0 * value_threshold {
            RiskLevel::Critical
        } else {
            RiskLevel::High
        };

        Some(CycleAlert {
            entities: edges.iter().map(|hop| hop.from.clone()).collect(),
            cycle_length: cycle.len(),
            total_value,
            avg_value: total_value / cycle.len() as f64,
            edges,
            risk_level,
        })
    }
}

fn compare_alerts(a: &CycleAlert, b: &CycleAlert) -> Ordering {
    b.total_value
        .total_cmp(&a.total_value)
        .then_with(|| a.cycle_length.cmp(&b.cycle_length))
        .then_with(|| a.entities.cmp(&b.entities))
}

impl Default for CircularFlowDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CircularFlowDetector {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        if self.min_cycle_length == 0 {
            return Err(AnalysisError::config("min_cycle_length must be at least 1"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<EntityGraph>, CircularFlowResult> for CircularFlowDetector {
    async fn execute(&self, input: Arc<EntityGraph>) -> Result<CircularFlowResult> {
        self.validate()?;
        Ok(Self::detect(
            &input,
            self.min_cycle_length,
            self.value_threshold,
            &self.budget,
        ))
    }
}
