//! Integration tests for MoneyTrail
//!
//! These tests run whole investigations through the public pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use moneytrail::prelude::*;

fn tx(i: u64, s: &str, t: &str, amount: f64) -> TransactionRecord {
    TransactionRecord::new(i, s, t, amount)
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

fn pipeline_with(f: impl FnOnce(AnalysisConfigBuilder) -> AnalysisConfigBuilder) -> InvestigationPipeline {
    let config = f(AnalysisConfigBuilder::new()).build().unwrap();
    InvestigationPipeline::new(config).unwrap()
}

fn default_pipeline() -> InvestigationPipeline {
    pipeline_with(|b| b)
}

/// A small mixed data set: a ring, a fan-out and some background transfers.
fn sample_records() -> Vec<TransactionRecord> {
    vec![
        tx(0, "ACME", "SHELL-1", 40_000.0).with_timestamp(at(4, 23)),
        tx(1, "SHELL-1", "SHELL-2", 39_000.0).with_timestamp(at(5, 1)),
        tx(2, "SHELL-2", "ACME", 38_000.0).with_timestamp(at(6, 10)),
        tx(3, "BROKER", "R1", 120.0).with_timestamp(at(6, 11)),
        tx(4, "BROKER", "R2", 80.0).with_timestamp(at(6, 12)),
        tx(5, "BROKER", "R3", 95.0),
        tx(6, "R1", "R2", 60.0).with_timestamp(at(7, 9)),
        tx(7, "R2", "R3", 70.0).with_timestamp(at(7, 10)),
        tx(8, "ACME", "BROKER", 150.0).with_timestamp(at(8, 14)),
    ]
}

// ============================================================================
// Graph Properties
// ============================================================================

#[test]
fn test_permutation_idempotence() {
    let records = sample_records();
    let mut shuffled = records.clone();
    shuffled.reverse();
    shuffled.swap(1, 5);

    let pipeline = default_pipeline();
    let a = pipeline.prepare(&records);
    let b = pipeline.prepare(&shuffled);

    assert_eq!(a.graph.num_nodes(), b.graph.num_nodes());
    assert_eq!(a.graph.num_edges(), b.graph.num_edges());
    for (ea, eb) in a.graph.entities().iter().zip(b.graph.entities()) {
        assert_eq!(ea.id, eb.id);
        assert!((ea.metrics.in_flow - eb.metrics.in_flow).abs() < 1e-9);
        assert!((ea.metrics.out_flow - eb.metrics.out_flow).abs() < 1e-9);
        assert_eq!(ea.metrics.total_degree, eb.metrics.total_degree);
        assert!((ea.metrics.betweenness_centrality - eb.metrics.betweenness_centrality).abs() < 1e-9);
        assert!((ea.metrics.closeness_centrality - eb.metrics.closeness_centrality).abs() < 1e-9);
        assert!((ea.metrics.eigenvector_centrality - eb.metrics.eigenvector_centrality).abs() < 1e-9);
        assert_eq!(ea.metrics.community_id, eb.metrics.community_id);
    }
    for (ea, eb) in a.graph.edges().iter().zip(b.graph.edges()) {
        assert_eq!((ea.source, ea.target), (eb.source, eb.target));
        assert_eq!(ea.transaction_count, eb.transaction_count);
        assert!((ea.total_value - eb.total_value).abs() < 1e-9);
    }
}

#[test]
fn test_flow_conservation() {
    let snapshot = default_pipeline().prepare(&sample_records());
    let graph = &snapshot.graph;

    for (node, entity) in graph.entities().iter().enumerate() {
        let incoming: f64 = graph.in_edges(node).map(|e| e.total_value).sum();
        let outgoing: f64 = graph.out_edges(node).iter().map(|e| e.total_value).sum();
        assert!((entity.metrics.in_flow - incoming).abs() < 1e-9);
        assert!((entity.metrics.out_flow - outgoing).abs() < 1e-9);
    }
    for edge in graph.edges() {
        let sum: f64 = edge.transactions.iter().map(|t| t.amount).sum();
        assert!((edge.total_value - sum).abs() < 1e-9);
        assert_eq!(edge.transaction_count, edge.transactions.len());
    }
}

// ============================================================================
// Detector Scenarios
// ============================================================================

#[tokio::test]
async fn test_structuring_boundary() {
    let pipeline = default_pipeline();
    let day = |n: usize, amount: f64| -> Vec<TransactionRecord> {
        (0..n)
            .map(|i| tx(i as u64, "E", &format!("R{i}"), amount).with_timestamp(at(10, 9 + i as u32)))
            .collect()
    };

    let below = pipeline.analyze(day(3, 3000.0)).await.unwrap();
    assert!(below.structuring.is_empty());

    let medium = pipeline.analyze(day(4, 3000.0)).await.unwrap();
    assert_eq!(medium.structuring.len(), 1);
    assert_eq!(medium.structuring[0].risk_level, RiskLevel::Medium);
    assert!((medium.structuring[0].total_value - 12_000.0).abs() < 1e-9);

    let high = pipeline.analyze(day(5, 5000.0)).await.unwrap();
    assert_eq!(high.structuring.len(), 1);
    assert_eq!(high.structuring[0].risk_level, RiskLevel::High);
}

#[tokio::test]
async fn test_simple_cycle() {
    let pipeline = pipeline_with(|b| b.alert_threshold(200.0).min_cycle_length(3));
    let records = vec![tx(0, "A", "B", 100.0), tx(1, "B", "C", 100.0), tx(2, "C", "A", 100.0)];

    let report = pipeline.analyze(records).await.unwrap();
    assert_eq!(report.circular.len(), 1);
    assert_eq!(report.circular[0].cycle_length, 3);
    assert!((report.circular[0].total_value - 300.0).abs() < 1e-9);
    assert!(!report.metadata.cycle_enumeration_truncated);
}

#[tokio::test]
async fn test_single_value_outlier() {
    let records: Vec<TransactionRecord> = [10.0, 12.0, 11.0, 13.0, 9.0, 1000.0]
        .iter()
        .enumerate()
        .map(|(i, &a)| tx(i as u64, &format!("S{i}"), "SINK", a))
        .collect();

    let report = default_pipeline().analyze(records).await.unwrap();
    let outliers: Vec<&UnusualPattern> =
        report.unusual.iter().filter(|p| p.is_value_outlier()).collect();
    assert_eq!(outliers.len(), 1);
    assert!(matches!(
        outliers[0],
        UnusualPattern::HighValueOutlier { value, .. } if *value == 1000.0
    ));
}

#[tokio::test]
async fn test_sample_report() {
    let report = default_pipeline().analyze(sample_records()).await.unwrap();

    // ACME -> SHELL-1 -> SHELL-2 -> ACME carries 117000
    assert_eq!(report.circular.len(), 1);
    assert_eq!(report.circular[0].entities, vec!["ACME", "SHELL-1", "SHELL-2"]);
    assert_eq!(report.circular[0].risk_level, RiskLevel::Critical);

    // BROKER sends three of nine transfers
    assert_eq!(report.unusual.len(), 1);
    assert_eq!(report.unusual[0].entity_id(), "BROKER");
    assert!(report.structuring.is_empty());

    assert_eq!(report.risk_score, 20);
    assert_eq!(report.risk_band, RiskLevel::Medium);

    // 2024-05-04 and 05 fall on a weekend, both transfers after 22:00 or before 06:00
    assert_eq!(report.temporal.len(), 2);
    assert_eq!(report.temporal[0].label, TemporalBucket::WeekendActivity);
    assert_eq!(report.temporal[0].count, 2);
    assert_eq!(report.temporal[1].label, TemporalBucket::NightActivity);
    assert_eq!(report.temporal[1].count, 2);

    assert_eq!(report.hubs[0].entity_id, "BROKER");
    assert_eq!(report.hubs.len(), 7);

    let executive = &report.summary.executive;
    assert_eq!(executive.total_transactions, 9);
    assert_eq!(executive.unique_entities, 7);
    assert_eq!(executive.total_edges, 9);
    assert_eq!(executive.circular_alerts, 1);
    assert!(report.summary.graph.is_weakly_connected);
    assert_eq!(report.metadata.skipped_records, 0);
    assert!(!report.metadata.cycle_enumeration_truncated);
}

// ============================================================================
// Scoring and Degradation
// ============================================================================

#[test]
fn test_score_tracks_alert_count() {
    let pipeline = pipeline_with(|b| b.alert_threshold(0.0).min_cycle_length(2));
    let mut previous = 0u8;

    // Each extra two-party ring adds one circular alert
    for rings in 0..12u64 {
        let records: Vec<TransactionRecord> = (0..rings)
            .flat_map(|r| {
                let a = format!("A{r:02}");
                let b = format!("B{r:02}");
                vec![tx(2 * r, &a, &b, 5.0), tx(2 * r + 1, &b, &a, 5.0)]
            })
            .collect();
        let report = pipeline.analyze_blocking(&records);

        assert_eq!(report.circular.len(), rings as usize);
        let expected = risk_score(report.structuring.len(), report.circular.len(), report.unusual.len());
        assert_eq!(report.risk_score, expected);
        assert!(report.risk_score >= previous);
        assert!(report.risk_score <= 100);
        previous = report.risk_score;
    }
    assert_eq!(previous, 100);
}

#[tokio::test]
async fn test_empty_input() {
    let report = default_pipeline().analyze(Vec::new()).await.unwrap();

    assert_eq!(report.risk_score, 0);
    assert_eq!(report.risk_band, RiskLevel::Low);
    assert!(report.is_clean());
    assert!(report.hubs.is_empty());
    assert!(report.metadata.empty_graph);
    assert_eq!(report.summary.executive.unique_entities, 0);
}

#[tokio::test]
async fn test_only_invalid_records() {
    let records = vec![tx(0, "A", "B", -10.0), tx(1, " ", "B", 10.0)];
    let report = default_pipeline().analyze(records).await.unwrap();

    assert!(report.metadata.empty_graph);
    assert_eq!(report.metadata.skipped_records, 2);
    assert_eq!(
        report.metadata.rejected.iter().map(|r| r.origin_index).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(report.risk_score, 0);
}

#[tokio::test]
async fn test_cycle_budget_truncation() {
    let pipeline = pipeline_with(|b| {
        b.alert_threshold(0.0)
            .min_cycle_length(3)
            .cycle_budget(|c| CycleBudgetConfig { max_cycles: 5, ..c })
    });

    let names: Vec<String> = (0..7).map(|i| format!("N{i}")).collect();
    let mut records = Vec::new();
    for a in &names {
        for b in &names {
            if a != b {
                records.push(tx(records.len() as u64, a, b, 100.0));
            }
        }
    }

    let report = pipeline.analyze(records).await.unwrap();
    assert!(report.circular.len() <= 5);
    assert!(report.metadata.cycle_enumeration_truncated);
    assert_eq!(report.metadata.truncation_reason, Some(TruncationReason::CycleLimit));
    assert_eq!(report.metadata.cycles_examined, 5);
    assert!(report
        .metadata
        .diagnostics
        .iter()
        .any(|d| d.contains("truncated")));
}

// ============================================================================
// Communities and Output
// ============================================================================

#[tokio::test]
async fn test_communities_split_bridged_cliques() {
    let pipeline = pipeline_with(|b| b.community(CommunityMethod::Louvain));

    let mut records = Vec::new();
    for group in [["A1", "A2", "A3", "A4"], ["B1", "B2", "B3", "B4"]] {
        for a in group {
            for b in group {
                if a < b {
                    records.push(tx(records.len() as u64, a, b, 1000.0));
                }
            }
        }
    }
    records.push(tx(records.len() as u64, "A1", "B1", 10.0));

    let snapshot = pipeline.prepare(&records);
    let community = |id: &str| snapshot.graph.entity_by_id(id).unwrap().metrics.community_id;

    assert!(community("A1").is_some());
    assert_eq!(community("A1"), community("A4"));
    assert_eq!(community("B1"), community("B4"));
    assert_ne!(community("A1"), community("B1"));

    let report = pipeline.analyze(records).await.unwrap();
    let communities = report.summary.graph.communities.unwrap();
    assert_eq!(communities.count, 2);
    assert_eq!(communities.sizes.values().copied().collect::<Vec<_>>(), vec![4, 4]);
}

#[tokio::test]
async fn test_report_serializes() {
    let report = default_pipeline().analyze(sample_records()).await.unwrap();
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["risk_band"], "MEDIUM");
    assert_eq!(value["circular"][0]["risk_level"], "CRITICAL");
    assert_eq!(value["unusual"][0]["type"], "high_frequency");
    assert_eq!(value["temporal"][0]["label"], "weekend_activity");

    let parsed = InvestigationReport::from_json(&json).unwrap();
    assert_eq!(parsed.report_id, report.report_id);
    assert_eq!(parsed.circular, report.circular);
}
