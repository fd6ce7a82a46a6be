//! Structuring (value fractionation) detection.
//!
//! Transfers are grouped by sender and calendar day. A group of three or
//! more near-uniform amounts whose sum exceeds the reporting threshold is
//! the classic signature of a large transfer split to stay under it.

use crate::stats;
use crate::types::StructuringAlert;
use async_trait::async_trait;
use chrono::NaiveDate;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    domain::Domain,
    error::{AnalysisError, Result},
    risk::RiskLevel,
    traits::{Analyzer, BatchAnalyzer},
    transaction::TransactionRecord,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Minimum group size for a structuring alert.
pub const MIN_GROUP_SIZE: usize = 3;

/// Day key of a transfer group. Undated transfers sort after every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DateBucket {
    Day(NaiveDate),
    Undated,
}

impl DateBucket {
    fn of(record: &TransactionRecord) -> Self {
        record
            .timestamp
            .map_or(DateBucket::Undated, |ts| DateBucket::Day(ts.date()))
    }

    fn date(self) -> Option<NaiveDate> {
        match self {
            DateBucket::Day(date) => Some(date),
            DateBucket::Undated => None,
        }
    }
}

/// Structuring detector.
#[derive(Debug, Clone)]
pub struct StructuringDetector {
    metadata: AnalyzerMetadata,
    threshold: f64,
    tolerance: f64,
}

impl StructuringDetector {
    /// Create a detector with the default threshold (10000) and tolerance (0.1).
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("compliance/structuring", Domain::Compliance)
                .with_description("Same-day near-uniform transfers summing above a threshold"),
            threshold: 10_000.0,
            tolerance: 0.1,
        }
    }

    /// Set the reporting threshold and coefficient-of-variation tolerance.
    #[must_use]
    pub fn with_params(mut self, threshold: f64, tolerance: f64) -> Self {
        self.threshold = threshold;
        self.tolerance = tolerance;
        self
    }

    /// Detect structuring groups.
    ///
    /// Output is ordered by sender id, then day, undated groups last.
    pub fn detect(
        transactions: &[TransactionRecord],
        threshold: f64,
        tolerance: f64,
    ) -> Vec<StructuringAlert> {
        let mut groups: BTreeMap<(&str, DateBucket), Vec<f64>> = BTreeMap::new();
        for record in transactions {
            groups
                .entry((record.source(), DateBucket::of(record)))
                .or_default()
                .push(record.amount);
        }

        let mut alerts = Vec::new();
        for ((entity_id, bucket), values) in groups {
            if values.len() < MIN_GROUP_SIZE {
                continue;
            }
            let (Some(avg_value), Some(std_value)) =
                (stats::mean(&values), stats::population_std(&values))
            else {
                continue;
            };
            if avg_value == 0.0 {
                continue;
            }

            let coefficient_of_variation = std_value / avg_value;
            let total_value: f64 = values.iter().sum();
            if coefficient_of_variation >= tolerance || total_value <= threshold {
                continue;
            }

            let risk_level = if total_value > 2.0 * threshold {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };

            alerts.push(StructuringAlert {
                entity_id: entity_id.to_string(),
                date: bucket.date(),
                transaction_count: values.len(),
                values,
                total_value,
                avg_value,
                std_value,
                coefficient_of_variation,
                risk_level,
            });
        }

        tracing::debug!(
            transactions = transactions.len(),
            alerts = alerts.len(),
            threshold,
            tolerance,
            "Structuring detection complete"
        );
        alerts
    }
}

impl Default for StructuringDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for StructuringDetector {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(AnalysisError::config("structuring threshold must be non-negative"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AnalysisError::config("structuring tolerance must be positive"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<[TransactionRecord]>, Vec<StructuringAlert>> for StructuringDetector {
    async fn execute(&self, input: Arc<[TransactionRecord]>) -> Result<Vec<StructuringAlert>> {
        self.validate()?;
        Ok(Self::detect(&input, self.threshold, self.tolerance))
    }
}
