//! Value outlier and transaction frequency detection.

use crate::stats;
use crate::types::UnusualPattern;
use async_trait::async_trait;
use moneytrail_core::{
    analyzer::AnalyzerMetadata,
    domain::Domain,
    error::Result,
    traits::{Analyzer, BatchAnalyzer},
    transaction::TransactionRecord,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Quantile of per-sender counts above which a sender is flagged.
pub const FREQUENCY_QUANTILE: f64 = 0.9;

#[derive(Default)]
struct SenderActivity<'a> {
    count: usize,
    total: f64,
    counterparties: BTreeSet<&'a str>,
}

/// Outlier and frequency detector.
#[derive(Debug, Clone)]
pub struct OutlierDetector {
    metadata: AnalyzerMetadata,
}

impl OutlierDetector {
    /// Create a new detector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AnalyzerMetadata::new("compliance/outliers", Domain::Compliance)
                .with_description("IQR value outliers and high-frequency senders"),
        }
    }

    /// Detect unusual transfers and senders.
    ///
    /// Value outliers come first in input order, followed by high-frequency
    /// senders by count descending.
    pub fn detect(transactions: &[TransactionRecord]) -> Vec<UnusualPattern> {
        let mut patterns = Self::value_outliers(transactions);
        let outliers = patterns.len();
        patterns.extend(Self::high_frequency(transactions));

        tracing::debug!(
            transactions = transactions.len(),
            value_outliers = outliers,
            high_frequency = patterns.len() - outliers,
            "Outlier detection complete"
        );
        patterns
    }

    fn value_outliers(transactions: &[TransactionRecord]) -> Vec<UnusualPattern> {
        if transactions.len() < 2 {
            return Vec::new();
        }

        let amounts = stats::sorted(transactions.iter().map(|t| t.amount));
        let (Some(q1), Some(q3)) = (
            stats::quantile_sorted(&amounts, 0.25),
            stats::quantile_sorted(&amounts, 0.75),
        ) else {
            return Vec::new();
        };
        let cutoff = q3 + IQR_MULTIPLIER * (q3 - q1);
        let n = amounts.len() as f64;

        transactions
            .iter()
            .filter(|t| t.amount > cutoff)
            .map(|t| {
                let below = amounts.partition_point(|&a| a < t.amount);
                UnusualPattern::HighValueOutlier {
                    entity_id: t.source().to_string(),
                    counterparty_id: t.target().to_string(),
                    value: t.amount,
                    percentile: below as f64 / n * 100.0,
                    origin_index: t.origin_index,
                    timestamp: t.timestamp,
                }
            })
            .collect()
    }

    fn high_frequency(transactions: &[TransactionRecord]) -> Vec<UnusualPattern> {
        let mut senders: BTreeMap<&str, SenderActivity<'_>> = BTreeMap::new();
        for t in transactions {
            let activity = senders.entry(t.source()).or_default();
            activity.count += 1;
            activity.total += t.amount;
            activity.counterparties.insert(t.target());
        }

        let counts = stats::sorted(senders.values().map(|a| a.count as f64));
        let Some(cutoff) = stats::quantile_sorted(&counts, FREQUENCY_QUANTILE) else {
            return Vec::new();
        };

        let mut flagged: Vec<(&str, SenderActivity<'_>)> = senders
            .into_iter()
            .filter(|(_, a)| a.count as f64 > cutoff)
            .collect();
        // Stable sort keeps ascending ids among equal counts
        flagged.sort_by(|a, b| b.1.count.cmp(&a.1.count));

        flagged
            .into_iter()
            .map(|(entity_id, a)| UnusualPattern::HighFrequency {
                entity_id: entity_id.to_string(),
                transaction_count: a.count,
                avg_value: a.total / a.count as f64,
                total_value: a.total,
                distinct_counterparties: a.counterparties.len(),
            })
            .collect()
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for OutlierDetector {
    fn metadata(&self) -> &AnalyzerMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchAnalyzer<Arc<[TransactionRecord]>, Vec<UnusualPattern>> for OutlierDetector {
    async fn execute(&self, input: Arc<[TransactionRecord]>) -> Result<Vec<UnusualPattern>> {
        Ok(Self::detect(&input))
    }
}
