//! Core analyzer traits.
//!
//! This module defines the traits every pipeline stage implements:
//! - `Analyzer`: Base trait exposing metadata and configuration validation
//! - `BatchAnalyzer`: Async request/response execution over an input snapshot

use crate::analyzer::AnalyzerMetadata;
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Base trait for all pipeline stages.
pub trait Analyzer: Send + Sync + Debug {
    /// Returns the analyzer metadata.
    fn metadata(&self) -> &AnalyzerMetadata;

    /// Validate analyzer configuration.
    ///
    /// Called by the pipeline before a run starts.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Returns the analyzer ID.
    fn id(&self) -> &str {
        &self.metadata().id
    }
}

/// Trait for stages executed as a single batch over an immutable input.
///
/// # Type Parameters
///
/// - `I`: Input type
/// - `O`: Output type
#[async_trait]
pub trait BatchAnalyzer<I, O>: Analyzer
where
    I: Send + Sync,
    O: Send + Sync,
{
    /// Execute the analyzer with the given input.
    async fn execute(&self, input: I) -> Result<O>;

    /// Validate the input before execution.
    fn validate_input(&self, _input: &I) -> Result<()> {
        Ok(())
    }

    /// Execute the analyzer with a timeout.
    ///
    /// Returns `AnalysisError::Timeout` when the deadline passes first.
    async fn execute_with_timeout(&self, input: I, timeout: Duration) -> Result<O>
    where
        I: 'async_trait,
    {
        match tokio::time::timeout(timeout, self.execute(input)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(AnalysisError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[derive(Debug)]
    struct Doubler {
        metadata: AnalyzerMetadata,
    }

    impl Analyzer for Doubler {
        fn metadata(&self) -> &AnalyzerMetadata {
            &self.metadata
        }
    }

    #[async_trait]
    impl BatchAnalyzer<u32, u32> for Doubler {
        async fn execute(&self, input: u32) -> Result<u32> {
            self.validate_input(&input)?;
            Ok(input * 2)
        }

        fn validate_input(&self, input: &u32) -> Result<()> {
            if *input > 1000 {
                return Err(AnalysisError::validation("input too large"));
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Sleeper {
        metadata: AnalyzerMetadata,
    }

    impl Analyzer for Sleeper {
        fn metadata(&self) -> &AnalyzerMetadata {
            &self.metadata
        }
    }

    #[async_trait]
    impl BatchAnalyzer<(), ()> for Sleeper {
        async fn execute(&self, _input: ()) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_execute_and_validate() {
        let analyzer = Doubler {
            metadata: AnalyzerMetadata::new("test/doubler", Domain::Compliance),
        };
        assert_eq!(analyzer.id(), "test/doubler");
        assert_eq!(analyzer.execute(21).await.unwrap(), 42);
        assert!(analyzer.execute(5000).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_timeout() {
        let analyzer = Sleeper {
            metadata: AnalyzerMetadata::new("test/sleeper", Domain::Compliance),
        };
        let result = analyzer
            .execute_with_timeout((), Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(AnalysisError::Timeout(_))));
    }
}
