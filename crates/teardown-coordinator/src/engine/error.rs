//! Errors raised by a single resource engine
//!
//! Messages start with a fixed prefix naming the failed stage, followed by
//! the full cause chain, so callers can match on the prefix.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Listing resources failed
    #[error("failed to describe {what}: {source:#}")]
    Describe {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A follow-up detail lookup for already listed resources failed
    #[error("cannot get {what} output: {source:#}")]
    Output {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Reading one resource's tags failed
    #[error("failed to list tags for {what} {id}: {source:#}")]
    DescribeTags {
        what: &'static str,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to disable deletion protection for {what} {id}: {source:#}")]
    DisableProtection {
        what: &'static str,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Requesting deletion failed; the remaining resources were not attempted
    #[error("failed to delete {what} {id}: {source:#}")]
    Delete {
        what: &'static str,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled before completion")]
    Cancelled,

    #[error("engine task panicked: {0}")]
    Panicked(String),
}
