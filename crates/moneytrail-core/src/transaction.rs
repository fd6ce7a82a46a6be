//! Canonical transaction record.
//!
//! Records are produced by an external normalizer. The core never guesses
//! column names: callers map their fields onto this struct explicitly.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A single normalized money movement between two entities.
///
/// Records are immutable once created and shared across detectors behind
/// an `Arc<[TransactionRecord]>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Originating entity.
    pub source_id: String,
    /// Receiving entity.
    pub target_id: String,
    /// Transferred amount, non-negative.
    pub amount: f64,
    /// When the transaction happened, if known. Offsets are normalized to UTC.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    /// Position of the record in the caller's input.
    #[serde(default)]
    pub origin_index: u64,
}

impl TransactionRecord {
    /// Create an undated record.
    pub fn new(
        origin_index: u64,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            amount,
            timestamp: None,
            origin_index,
        }
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Source id with surrounding whitespace removed.
    pub fn source(&self) -> &str {
        self.source_id.trim()
    }

    /// Target id with surrounding whitespace removed.
    pub fn target(&self) -> &str {
        self.target_id.trim()
    }

    /// True when source and target name the same entity.
    pub fn is_self_loop(&self) -> bool {
        self.source() == self.target()
    }
}

/// Naive date-time formats accepted after RFC 3339.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp.
///
/// Values carrying `Z` or a `+hh:mm` offset are converted to UTC wall time;
/// values without an offset are taken as-is, with either `T` or a space
/// between date and time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_trimmed_ids() {
        let record = TransactionRecord::new(0, "  ACME ", "ACME", 10.0);
        assert_eq!(record.source(), "ACME");
        assert!(record.is_self_loop());
    }

    #[test]
    fn test_deserialize_iso_timestamp() {
        let json = r#"{"source_id":"A","target_id":"B","amount":9500.0,"timestamp":"2024-03-02T23:15:00"}"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(23, 15, 0)
            .unwrap();
        assert_eq!(record.timestamp, Some(expected));
        assert_eq!(record.origin_index, 0);
    }

    fn timestamp_of(raw: &str) -> Option<NaiveDateTime> {
        let json = format!(
            r#"{{"source_id":"A","target_id":"B","amount":1.0,"timestamp":"{raw}"}}"#
        );
        serde_json::from_str::<TransactionRecord>(&json)
            .unwrap()
            .timestamp
    }

    #[test]
    fn test_deserialize_offset_timestamps() {
        let at = |h, m| {
            NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_opt(h, m, 0)
        };
        assert_eq!(timestamp_of("2024-03-02T23:15:00Z"), at(23, 15));
        assert_eq!(timestamp_of("2024-03-02T23:15:00+02:00"), at(21, 15));
        assert_eq!(timestamp_of("2024-03-02 23:15:00"), at(23, 15));
        assert_eq!(timestamp_of("2024-03-02T23:15:00.250"), at(23, 15).map(|t| t + chrono::Duration::milliseconds(250)));
    }

    #[test]
    fn test_deserialize_missing_and_invalid_timestamp() {
        let json = r#"{"source_id":"A","target_id":"B","amount":1.0,"timestamp":null}"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp, None);

        let json = r#"{"source_id":"A","target_id":"B","amount":1.0}"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp, None);

        let json = r#"{"source_id":"A","target_id":"B","amount":1.0,"timestamp":"yesterday"}"#;
        assert!(serde_json::from_str::<TransactionRecord>(json).is_err());
    }

    #[test]
    fn test_serialized_timestamp_reads_back() {
        let record = TransactionRecord::new(3, "A", "B", 5.0).with_timestamp(
            NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(serde_json::from_str::<TransactionRecord>(&json).unwrap(), record);
    }
}
