//! Domain definitions for analyzer categorization.
//!
//! Every pipeline stage belongs to one domain. Domains group stages in logs
//! and in the report metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analytical domain of a pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Graph construction and structure: builder, node metrics, communities, cycles.
    GraphAnalytics,

    /// Compliance analytics: structuring, circular flows, outliers, timing, hubs, scoring.
    Compliance,
}

impl Domain {
    /// All available domains.
    pub const ALL: &'static [Domain] = &[Domain::GraphAnalytics, Domain::Compliance];

    /// Returns the domain name as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::GraphAnalytics => "GraphAnalytics",
            Domain::Compliance => "Compliance",
        }
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GraphAnalytics" => Ok(Domain::GraphAnalytics),
            "Compliance" => Ok(Domain::Compliance),
            _ => Err(format!("Unknown domain: {}", s)),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_from_str() {
        assert_eq!("GraphAnalytics".parse::<Domain>(), Ok(Domain::GraphAnalytics));
        assert_eq!("Compliance".parse::<Domain>(), Ok(Domain::Compliance));
        assert!("Unknown".parse::<Domain>().is_err());
    }

    #[test]
    fn test_domain_display() {
        for domain in Domain::ALL {
            assert_eq!(domain.to_string(), domain.as_str());
        }
    }
}
