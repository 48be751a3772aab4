//! Default configuration values shared between the CLI and library callers

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default initial delay between watch polls, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default cap on the delay between watch polls, in seconds
pub const DEFAULT_MAX_POLL_INTERVAL_SECS: u64 = 120;

/// Default limit on a whole watch loop, in seconds (1 hour)
pub const DEFAULT_WATCH_TIMEOUT_SECS: u64 = 3600;

/// Default deadline for a single teardown cycle, in seconds
pub const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 300;

/// Maximum number of keys S3 accepts in one DeleteObjects request
pub const S3_DELETE_BATCH_SIZE: usize = 1000;
