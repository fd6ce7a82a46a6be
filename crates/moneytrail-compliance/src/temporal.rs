//! Weekend and night activity.

use crate::types::{TemporalBucket, TemporalPattern};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    domain::Domain,
    error::Result,
    traits::{Analyzer, BatchAnalyzer},
    transaction::TransactionRecord,
};
use std::sync::Arc;

/// True on Saturday and Sunday.
pub fn is_weekend(ts: &NaiveDateTime) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True from 22:00 through 05:59.
pub fn is_night(ts: &NaiveDateTime) -> bool {
    let hour = ts.hour();
    hour >= 22 || hour <= 5
}

/// Temporal pattern detector. Undated transfers are ignored.
#[derive(Debug, Clone)]
pub struct TemporalDetector {
    metadata: AnalyzerMetadata,
}

impl TemporalDetector {
    /// Create a new detector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("compliance/temporal", Domain::Compliance)
                .with_description("Weekend and night transfer activity"),
        }
    }

    /// One pattern per non-empty bucket, weekend first.
    pub fn detect(transactions: &[TransactionRecord]) -> Vec<TemporalPattern> {
        let buckets: [(TemporalBucket, fn(&NaiveDateTime) -> bool); 2] = [
            (TemporalBucket::WeekendActivity, is_weekend),
            (TemporalBucket::NightActivity, is_night),
        ];

        let patterns: Vec<TemporalPattern> = buckets
            .into_iter()
            .filter_map(|(label, in_bucket)| {
                let (count, total_value) = transactions
                    .iter()
                    .filter(|t| t.timestamp.as_ref().is_some_and(in_bucket))
                    .fold((0usize, 0.0f64), |(n, sum), t| (n + 1, sum + t.amount));
                (count > 0).then(|| TemporalPattern {
                    label,
                    count,
                    total_value,
                    avg_value: total_value / count as f64,
                })
            })
            .collect();

        tracing::debug!(
            transactions = transactions.len(),
            patterns = patterns.len(),
            "Temporal detection complete"
        );
        patterns
    }
}

impl Default for TemporalDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for TemporalDetector {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<[TransactionRecord]>, Vec<TemporalPattern>> for TemporalDetector {
    async fn execute(&self, input: Arc<[TransactionRecord]>) -> Result<Vec<TemporalPattern>> {
        Ok(Self::detect(&input))
    }
}
