//! Analyzer metadata.
//!
//! Each pipeline stage (builder, metrics calculator, detectors, ranker,
//! aggregator) carries an `AnalyzerMetadata` describing what it is.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};

/// Descriptive metadata for a pipeline stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerMetadata {
    /// Unique analyzer identifier (e.g., "compliance/structuring").
    pub id: String,

    /// Domain the analyzer belongs to.
    pub domain: Domain,

    /// Human-readable description.
    pub description: String,

    /// Version of the analyzer implementation.
    pub version: u32,
}

impl AnalyzerMetadata {
    /// Create new analyzer metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            domain,
            description: String::new(),
            version: 1,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Short display name derived from the id.
    ///
    /// `"compliance/circular-flow"` becomes `"CircularFlow"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.id.rsplit('/').next().unwrap_or(&self.id);
        to_pascal_case(name)
    }
}

/// Convert a kebab-case or snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split(|c| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder_methods() {
        let meta = AnalyzerMetadata::new("compliance/structuring", Domain::Compliance)
            .with_description("Same-day near-equal transfers")
            .with_version(2);

        assert_eq!(meta.id, "compliance/structuring");
        assert_eq!(meta.domain, Domain::Compliance);
        assert_eq!(meta.version, 2);
    }

    #[test]
    fn test_display_name() {
        let meta = AnalyzerMetadata::new("compliance/circular-flow", Domain::Compliance);
        assert_eq!(meta.display_name(), "CircularFlow");

        let meta = AnalyzerMetadata::new("graph/node_metrics", Domain::GraphAnalytics);
        assert_eq!(meta.display_name(), "NodeMetrics");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("hubs"), "Hubs");
        assert_eq!(to_pascal_case("mixed-snake_case"), "MixedSnakeCase");
    }
}
