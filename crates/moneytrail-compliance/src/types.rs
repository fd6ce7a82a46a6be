//! Alert and pattern types emitted by the detectors.

use chrono::{NaiveDate, NaiveDateTime};
use moneytrail_core::error::TruncationReason;
use moneytrail_core::risk::RiskLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Structuring
// ============================================================================

/// Near-uniform same-day transfers from one entity summing above a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuringAlert {
    /// Sending entity.
    pub entity_id: String,
    /// Calendar day of the group, `None` for the undated bucket.
    pub date: Option<NaiveDate>,
    /// Number of transfers in the group.
    pub transaction_count: usize,
    /// Amounts in input order.
    pub values: Vec<f64>,
    /// Sum of amounts.
    pub total_value: f64,
    /// Mean amount.
    pub avg_value: f64,
    /// Population standard deviation.
    pub std_value: f64,
    /// `std_value / avg_value`.
    pub coefficient_of_variation: f64,
    /// `High` above twice the threshold, else `Medium`.
    pub risk_level: RiskLevel,
}

// ============================================================================
// Circular Flows
// ============================================================================

/// One hop of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleHop {
    /// Sending entity.
    pub from: String,
    /// Receiving entity.
    pub to: String,
    /// Merged edge value.
    pub value: f64,
    /// Transactions merged into the edge.
    pub transaction_count: usize,
}

/// A directed cycle of transfers returning to its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAlert {
    /// Entities in cycle order, starting at the smallest id.
    pub entities: Vec<String>,
    /// Number of entities (and hops).
    pub cycle_length: usize,
    /// Sum of hop values.
    pub total_value: f64,
    /// `total_value / cycle_length`.
    pub avg_value: f64,
    /// Hops in cycle order, closing back on the first entity.
    pub edges: Vec<CycleHop>,
    /// `Critical` above five times the threshold, else `High`.
    pub risk_level: RiskLevel,
}

/// Output of the circular-flow detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircularFlowResult {
    /// Alerts, largest total first.
    pub alerts: Vec<CycleAlert>,
    /// True when enumeration stopped early and `alerts` is a lower bound.
    pub truncated: bool,
    /// Which budget stopped the enumeration.
    pub truncation: Option<TruncationReason>,
    /// Cycles of sufficient length inspected before filtering by value.
    pub cycles_examined: usize,
}

// ============================================================================
// Hubs
// ============================================================================

/// Composite centrality ranking of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubRecord {
    /// Entity id.
    pub entity_id: String,
    /// Distinct counterparties in both directions.
    pub total_connections: usize,
    /// Distinct senders.
    pub in_connections: usize,
    /// Distinct receivers.
    pub out_connections: usize,
    /// `in_flow + out_flow`.
    pub total_flow: f64,
    /// Value received.
    pub in_flow: f64,
    /// Value sent.
    pub out_flow: f64,
    /// `in_flow - out_flow`.
    pub net_flow: f64,
    /// Transactions in both directions.
    pub total_transactions: usize,
    /// Weighted heuristic score.
    pub centrality_score: f64,
    /// Tier derived from the score.
    pub risk_level: RiskLevel,
}

// ============================================================================
// Unusual Patterns
// ============================================================================

/// Statistically unusual transaction or entity behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnusualPattern {
    /// A single transfer above the IQR fence.
    HighValueOutlier {
        /// Sending entity.
        entity_id: String,
        /// Receiving entity.
        counterparty_id: String,
        /// Transfer amount.
        value: f64,
        /// Percentage of transfers strictly smaller.
        percentile: f64,
        /// Position of the transfer in the caller's input.
        origin_index: u64,
        /// Transfer time, when known.
        timestamp: Option<NaiveDateTime>,
    },
    /// An entity sending far more often than its peers.
    HighFrequency {
        /// Sending entity.
        entity_id: String,
        /// Transfers sent.
        transaction_count: usize,
        /// Mean amount sent.
        avg_value: f64,
        /// Total amount sent.
        total_value: f64,
        /// Distinct receivers.
        distinct_counterparties: usize,
    },
}

impl UnusualPattern {
    /// Entity the pattern is about.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            UnusualPattern::HighValueOutlier { entity_id, .. }
            | UnusualPattern::HighFrequency { entity_id, .. } => entity_id,
        }
    }

    /// True for value outliers.
    #[must_use]
    pub fn is_value_outlier(&self) -> bool {
        matches!(self, UnusualPattern::HighValueOutlier { .. })
    }

    /// Human-readable one-line description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            UnusualPattern::HighValueOutlier {
                value, percentile, ..
            } => format!("Transaction {value:.2} is an outlier (above {percentile:.1}% of transactions)"),
            UnusualPattern::HighFrequency {
                entity_id,
                transaction_count,
                ..
            } => format!("{entity_id} sent {transaction_count} transactions (above normal)"),
        }
    }
}

// ============================================================================
// Temporal Patterns
// ============================================================================

/// Time bucket a temporal pattern covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalBucket {
    /// Saturday or Sunday.
    WeekendActivity,
    /// Hours 22:00 to 05:59.
    NightActivity,
}

impl TemporalBucket {
    /// Returns the bucket label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TemporalBucket::WeekendActivity => "weekend_activity",
            TemporalBucket::NightActivity => "night_activity",
        }
    }
}

impl fmt::Display for TemporalBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate of transfers falling in an unusual time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPattern {
    /// Bucket covered.
    pub label: TemporalBucket,
    /// Transfers in the bucket.
    pub count: usize,
    /// Sum of amounts.
    pub total_value: f64,
    /// Mean amount.
    pub avg_value: f64,
}

impl TemporalPattern {
    /// Human-readable one-line description.
    #[must_use]
    pub fn description(&self) -> String {
        match self.label {
            TemporalBucket::WeekendActivity => format!("{} transactions on weekends", self.count),
            TemporalBucket::NightActivity => format!("{} transactions at night", self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unusual_pattern_serializes_tagged() {
        let pattern = UnusualPattern::HighFrequency {
            entity_id: "ACME".to_string(),
            transaction_count: 42,
            avg_value: 10.0,
            total_value: 420.0,
            distinct_counterparties: 3,
        };
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["type"], "high_frequency");
        assert_eq!(json["entity_id"], "ACME");
        assert_eq!(pattern.description(), "ACME sent 42 transactions (above normal)");
    }

    #[test]
    fn test_temporal_labels() {
        let pattern = TemporalPattern {
            label: TemporalBucket::NightActivity,
            count: 2,
            total_value: 30.0,
            avg_value: 15.0,
        };
        assert_eq!(pattern.label.to_string(), "night_activity");
        assert_eq!(pattern.description(), "2 transactions at night");
        assert_eq!(
            serde_json::to_value(&pattern).unwrap()["label"],
            "night_activity"
        );
    }
}
