//! AWS test utilities
//!
//! Provides region detection and unique cluster ids for AWS integration tests.

use chrono::Utc;

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-east-1
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-1".to_string())
}

/// Generate a unique cluster id for live tests.
///
/// Format: `teardown-test-{timestamp_ms}-{counter}`. No real resource carries
/// it, so a live dry run against it must come back empty.
pub fn test_cluster_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("teardown-test-{}-{}", ts, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_id_format() {
        let id = test_cluster_id();
        let parts: Vec<&str> = id
            .strip_prefix("teardown-test-")
            .unwrap()
            .split('-')
            .collect();
        assert_eq!(parts.len(), 2);
        parts[0].parse::<i64>().expect("Should be valid timestamp");
        parts[1].parse::<u32>().expect("Should be valid counter");
    }

    #[test]
    fn test_cluster_id_unique() {
        assert_ne!(test_cluster_id(), test_cluster_id());
    }
}
