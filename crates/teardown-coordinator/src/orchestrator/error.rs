//! Aggregated teardown failures

use crate::engine::EngineError;
use std::fmt;
use thiserror::Error;

/// One engine's failure within a teardown cycle
#[derive(Debug, Error)]
#[error("{engine}: {error}")]
pub struct EngineFailure {
    pub engine: String,
    #[source]
    pub error: EngineError,
}

/// Every engine failure of one cycle.
///
/// The engines that succeeded still contributed their items to the cycle's
/// report.
#[derive(Debug, Error)]
pub struct TeardownError {
    pub failures: Vec<EngineFailure>,
    /// Number of engines that ran
    pub attempted: usize,
}

impl TeardownError {
    /// Names of the failed engines, in registration order
    pub fn failed_engines(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.engine.as_str()).collect()
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} resource engines failed",
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_every_engine() {
        let err = TeardownError {
            failures: vec![
                EngineFailure {
                    engine: "rds-instance".into(),
                    error: EngineError::Describe {
                        what: "database instances",
                        source: anyhow::anyhow!("AccessDenied"),
                    },
                },
                EngineFailure {
                    engine: "s3-bucket".into(),
                    error: EngineError::Cancelled,
                },
            ],
            attempted: 5,
        };

        let text = err.to_string();
        assert!(text.starts_with("2 of 5 resource engines failed"));
        assert!(text.contains("rds-instance: failed to describe database instances: AccessDenied"));
        assert!(text.contains("s3-bucket: cancelled before completion"));
        assert_eq!(err.failed_engines(), ["rds-instance", "s3-bucket"]);
    }
}
