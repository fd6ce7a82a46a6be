//! Analysis Configuration
//!
//! Provides unified configuration for an investigation run including:
//! - Detector thresholds
//! - Cycle enumeration budget
//! - Graph construction and centrality parameters
//! - Logging
//!
//! # Example
//!
//! ```rust,ignore
//! use moneytrail_core::config::AnalysisConfig;
//!
//! // Load from environment
//! let config = AnalysisConfig::from_env()?;
//!
//! // Or load from file
//! let config = AnalysisConfig::from_file("config/moneytrail.toml")?;
//! ```

use crate::budget::WorkBudget;
use crate::error::{AnalysisError, Result};
use crate::logging::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "MONEYTRAIL_";

// ============================================================================
// Sub-configurations
// ============================================================================

/// How the graph builder treats records whose source equals their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfLoopPolicy {
    /// Keep self-loops as edges (cycles of length 1).
    #[default]
    Allow,
    /// Reject them as invalid records.
    Reject,
}

impl FromStr for SelfLoopPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("Invalid self-loop policy: {}", s)),
        }
    }
}

/// Community detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityMethod {
    /// Multilevel Louvain optimisation.
    #[default]
    Louvain,
    /// Agglomerative greedy modularity (Clauset-Newman-Moore).
    GreedyModularity,
    /// Deterministic label propagation.
    LabelPropagation,
    /// Skip community detection.
    Disabled,
}

impl CommunityMethod {
    /// Returns the method name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Louvain => "louvain",
            Self::GreedyModularity => "greedy_modularity",
            Self::LabelPropagation => "label_propagation",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for CommunityMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "louvain" => Ok(Self::Louvain),
            "greedy" | "greedy_modularity" => Ok(Self::GreedyModularity),
            "label_propagation" | "lpa" => Ok(Self::LabelPropagation),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            _ => Err(format!("Invalid community method: {}", s)),
        }
    }
}

/// Caps for simple-cycle enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleBudgetConfig {
    /// Maximum cycles to enumerate.
    pub max_cycles: usize,
    /// Maximum DFS edge expansions.
    pub max_steps: u64,
    /// Wall-clock limit in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CycleBudgetConfig {
    fn default() -> Self {
        Self {
            max_cycles: 10_000,
            max_steps: 5_000_000,
            timeout_ms: 5_000,
        }
    }
}

impl CycleBudgetConfig {
    /// Wall-clock limit as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Power-iteration parameters for eigenvector centrality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenvectorConfig {
    /// Iteration cap.
    pub max_iterations: u32,
    /// Per-node convergence tolerance; scaled by node count.
    pub tolerance: f64,
}

impl Default for EigenvectorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }
}

// ============================================================================
// Analysis Configuration
// ============================================================================

/// Configuration threaded through every stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum total value for a circular-flow alert.
    pub alert_threshold: f64,
    /// Minimum daily total for a structuring alert.
    pub structuring_threshold: f64,
    /// Maximum coefficient of variation for a structuring alert.
    pub structuring_tolerance: f64,
    /// Shortest cycle reported.
    pub min_cycle_length: usize,
    /// Longest cycle explored, unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycle_length: Option<usize>,
    /// Hubs returned; 0 returns every entity.
    pub top_n_hubs: usize,
    /// Cycle enumeration caps.
    pub cycle_budget: CycleBudgetConfig,
    /// Self-loop handling.
    pub self_loops: SelfLoopPolicy,
    /// Community detection strategy.
    pub community: CommunityMethod,
    /// Eigenvector centrality parameters.
    pub eigenvector: EigenvectorConfig,
    /// Entities listed per centrality in the graph summary.
    pub summary_top_k: usize,
    /// Logging.
    pub logging: LogConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alert_threshold: 10_000.0,
            structuring_threshold: 10_000.0,
            structuring_tolerance: 0.1,
            min_cycle_length: 3,
            max_cycle_length: None,
            top_n_hubs: 10,
            cycle_budget: CycleBudgetConfig::default(),
            self_loops: SelfLoopPolicy::Allow,
            community: CommunityMethod::Louvain,
            eigenvector: EigenvectorConfig::default(),
            summary_top_k: 10,
            logging: LogConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create development configuration
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            ..Default::default()
        }
    }

    /// Create production configuration
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `MONEYTRAIL_CONFIG` names an optional TOML file used as the base;
    /// individual `MONEYTRAIL_*` variables override it.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(format!("{ENV_PREFIX}CONFIG")) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => match std::env::var(format!("{ENV_PREFIX}ENV")).as_deref() {
                Ok("production") | Ok("prod") => Self::production(),
                _ => Self::development(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MONEYTRAIL_*` overrides from a lookup function.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = get("ALERT_THRESHOLD") {
            self.alert_threshold = parse_var("ALERT_THRESHOLD", &v)?;
        }
        if let Some(v) = get("STRUCTURING_THRESHOLD") {
            self.structuring_threshold = parse_var("STRUCTURING_THRESHOLD", &v)?;
        }
        if let Some(v) = get("STRUCTURING_TOLERANCE") {
            self.structuring_tolerance = parse_var("STRUCTURING_TOLERANCE", &v)?;
        }
        if let Some(v) = get("MIN_CYCLE_LENGTH") {
            self.min_cycle_length = parse_var("MIN_CYCLE_LENGTH", &v)?;
        }
        if let Some(v) = get("MAX_CYCLE_LENGTH") {
            self.max_cycle_length = Some(parse_var("MAX_CYCLE_LENGTH", &v)?);
        }
        if let Some(v) = get("TOP_N_HUBS") {
            self.top_n_hubs = parse_var("TOP_N_HUBS", &v)?;
        }
        if let Some(v) = get("MAX_CYCLES") {
            self.cycle_budget.max_cycles = parse_var("MAX_CYCLES", &v)?;
        }
        if let Some(v) = get("MAX_STEPS") {
            self.cycle_budget.max_steps = parse_var("MAX_STEPS", &v)?;
        }
        if let Some(v) = get("CYCLE_TIMEOUT_MS") {
            self.cycle_budget.timeout_ms = parse_var("CYCLE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("SELF_LOOPS") {
            self.self_loops = v.parse().map_err(AnalysisError::ConfigError)?;
        }
        if let Some(v) = get("COMMUNITY") {
            self.community = v.parse().map_err(AnalysisError::ConfigError)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v.parse::<LogLevel>().map_err(AnalysisError::ConfigError)?;
        }
        if let Some(v) = get("LOG_JSON") {
            self.logging.structured = parse_var("LOG_JSON", &v)?;
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            AnalysisError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        non_negative("alert_threshold", self.alert_threshold)?;
        non_negative("structuring_threshold", self.structuring_threshold)?;
        if !(self.structuring_tolerance.is_finite() && self.structuring_tolerance > 0.0) {
            return Err(AnalysisError::config(
                "structuring_tolerance must be a positive number",
            ));
        }
        if self.min_cycle_length == 0 {
            return Err(AnalysisError::config("min_cycle_length must be at least 1"));
        }
        if let Some(max_len) = self.max_cycle_length {
            if max_len < self.min_cycle_length {
                return Err(AnalysisError::config(format!(
                    "max_cycle_length ({}) is below min_cycle_length ({})",
                    max_len, self.min_cycle_length
                )));
            }
        }
        if self.cycle_budget.max_cycles == 0 || self.cycle_budget.max_steps == 0 {
            return Err(AnalysisError::config(
                "cycle_budget limits must be greater than zero",
            ));
        }
        if self.cycle_budget.timeout_ms == 0 {
            return Err(AnalysisError::config("cycle_budget.timeout_ms must be > 0"));
        }
        if self.eigenvector.max_iterations == 0 {
            return Err(AnalysisError::config(
                "eigenvector.max_iterations must be at least 1",
            ));
        }
        if !(self.eigenvector.tolerance.is_finite() && self.eigenvector.tolerance > 0.0) {
            return Err(AnalysisError::config(
                "eigenvector.tolerance must be a positive number",
            ));
        }

        if self.max_cycle_length.is_none() && self.cycle_budget.max_steps == u64::MAX {
            tracing::warn!("Cycle enumeration has neither a length cap nor a step cap");
        }

        Ok(())
    }

    /// Work budget for one cycle enumeration, with its deadline starting now.
    pub fn cycle_work_budget(&self) -> WorkBudget {
        WorkBudget::new(self.cycle_budget.max_cycles, self.cycle_budget.max_steps)
            .with_timeout(self.cycle_budget.timeout())
            .with_max_cycle_length(self.max_cycle_length)
    }

    /// Set the circular-flow alert threshold
    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    /// Set structuring threshold and tolerance
    pub fn with_structuring(mut self, threshold: f64, tolerance: f64) -> Self {
        self.structuring_threshold = threshold;
        self.structuring_tolerance = tolerance;
        self
    }

    /// Set the community detection method
    pub fn with_community(mut self, method: CommunityMethod) -> Self {
        self.community = method;
        self
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        AnalysisError::ConfigError(format!("Invalid {ENV_PREFIX}{name} '{}': {}", value, e))
    })
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::config(format!(
            "{} must be a non-negative number",
            name
        )))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configuration builder
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from production preset
    pub fn production() -> Self {
        Self {
            config: AnalysisConfig::production(),
        }
    }

    /// Start from development preset
    pub fn development() -> Self {
        Self {
            config: AnalysisConfig::development(),
        }
    }

    /// Set the circular-flow alert threshold
    pub fn alert_threshold(mut self, threshold: f64) -> Self {
        self.config.alert_threshold = threshold;
        self
    }

    /// Set the structuring threshold
    pub fn structuring_threshold(mut self, threshold: f64) -> Self {
        self.config.structuring_threshold = threshold;
        self
    }

    /// Set the structuring tolerance
    pub fn structuring_tolerance(mut self, tolerance: f64) -> Self {
        self.config.structuring_tolerance = tolerance;
        self
    }

    /// Set the minimum cycle length
    pub fn min_cycle_length(mut self, len: usize) -> Self {
        self.config.min_cycle_length = len;
        self
    }

    /// Set the maximum cycle length
    pub fn max_cycle_length(mut self, len: usize) -> Self {
        self.config.max_cycle_length = Some(len);
        self
    }

    /// Set the number of hubs returned; 0 returns all
    pub fn top_n_hubs(mut self, n: usize) -> Self {
        self.config.top_n_hubs = n;
        self
    }

    /// Configure the cycle budget
    pub fn cycle_budget(mut self, f: impl FnOnce(CycleBudgetConfig) -> CycleBudgetConfig) -> Self {
        self.config.cycle_budget = f(self.config.cycle_budget);
        self
    }

    /// Set the self-loop policy
    pub fn self_loops(mut self, policy: SelfLoopPolicy) -> Self {
        self.config.self_loops = policy;
        self
    }

    /// Set the community method
    pub fn community(mut self, method: CommunityMethod) -> Self {
        self.config.community = method;
        self
    }

    /// Configure eigenvector centrality
    pub fn eigenvector(mut self, f: impl FnOnce(EigenvectorConfig) -> EigenvectorConfig) -> Self {
        self.config.eigenvector = f(self.config.eigenvector);
        self
    }

    /// Set how many entities the summary lists per centrality
    pub fn summary_top_k(mut self, k: usize) -> Self {
        self.config.summary_top_k = k;
        self
    }

    /// Configure logging
    pub fn logging(mut self, f: impl FnOnce(LogConfig) -> LogConfig) -> Self {
        self.config.logging = f(self.config.logging);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AnalysisConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build without validation
    pub fn build_unchecked(self) -> AnalysisConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.alert_threshold, 10_000.0);
        assert_eq!(config.structuring_threshold, 10_000.0);
        assert_eq!(config.structuring_tolerance, 0.1);
        assert_eq!(config.min_cycle_length, 3);
        assert_eq!(config.max_cycle_length, None);
        assert_eq!(config.top_n_hubs, 10);
        assert_eq!(config.cycle_budget.max_cycles, 10_000);
        assert_eq!(config.cycle_budget.max_steps, 5_000_000);
        assert_eq!(config.cycle_budget.timeout_ms, 5_000);
        assert_eq!(config.self_loops, SelfLoopPolicy::Allow);
        assert_eq!(config.community, CommunityMethod::Louvain);
        assert_eq!(config.eigenvector.max_iterations, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AnalysisConfigBuilder::production()
            .alert_threshold(500.0)
            .max_cycle_length(6)
            .cycle_budget(|b| CycleBudgetConfig {
                max_cycles: 5,
                ..b
            })
            .community(CommunityMethod::LabelPropagation)
            .build()
            .unwrap();

        assert_eq!(config.alert_threshold, 500.0);
        assert_eq!(config.max_cycle_length, Some(6));
        assert_eq!(config.cycle_budget.max_cycles, 5);
        assert!(config.logging.structured);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_tolerance = AnalysisConfigBuilder::new()
            .structuring_tolerance(0.0)
            .build();
        assert!(matches!(bad_tolerance, Err(AnalysisError::ConfigError(_))));

        let inverted = AnalysisConfigBuilder::new()
            .min_cycle_length(5)
            .max_cycle_length(3)
            .build();
        assert!(inverted.is_err());

        let negative = AnalysisConfigBuilder::new().alert_threshold(-1.0).build();
        assert!(negative.is_err());

        // Unchecked build keeps the bad value
        let unchecked = AnalysisConfigBuilder::new()
            .alert_threshold(-1.0)
            .build_unchecked();
        assert_eq!(unchecked.alert_threshold, -1.0);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MONEYTRAIL_ALERT_THRESHOLD", "2500"),
            ("MONEYTRAIL_MAX_CYCLES", "42"),
            ("MONEYTRAIL_SELF_LOOPS", "reject"),
            ("MONEYTRAIL_COMMUNITY", "greedy"),
            ("MONEYTRAIL_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AnalysisConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.alert_threshold, 2500.0);
        assert_eq!(config.cycle_budget.max_cycles, 42);
        assert_eq!(config.self_loops, SelfLoopPolicy::Reject);
        assert_eq!(config.community, CommunityMethod::GreedyModularity);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = AnalysisConfig::default();
        let result = config.apply_overrides(|k| {
            (k == "MONEYTRAIL_MIN_CYCLE_LENGTH").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(AnalysisError::ConfigError(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "moneytrail-config-{}.toml",
            std::process::id()
        ));
        let config = AnalysisConfigBuilder::new()
            .max_cycle_length(8)
            .community(CommunityMethod::Disabled)
            .build()
            .unwrap();

        config.to_file(&path).unwrap();
        let loaded = AnalysisConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            alert_threshold = 750.0

            [cycle_budget]
            max_cycles = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.alert_threshold, 750.0);
        assert_eq!(config.cycle_budget.max_cycles, 20);
        assert_eq!(config.cycle_budget.max_steps, 5_000_000);
        assert_eq!(config.top_n_hubs, 10);
    }

    #[test]
    fn test_cycle_work_budget() {
        let config = AnalysisConfigBuilder::new()
            .max_cycle_length(4)
            .build_unchecked();
        let budget = config.cycle_work_budget();
        assert_eq!(budget.max_cycles, 10_000);
        assert_eq!(budget.max_cycle_length, Some(4));
        assert!(budget.deadline.is_some());
    }
}
