//! Repeated polling with exponential backoff and cancellation support.
//!
//! Drives the watch loop: a teardown cycle is re-run until it reports that
//! nothing is left, the overall deadline passes, or the user cancels.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use teardown_common::defaults::{
    DEFAULT_MAX_POLL_INTERVAL_SECS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WATCH_TIMEOUT_SECS,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for polling with exponential backoff.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time before giving up
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_delay: Duration::from_secs(DEFAULT_MAX_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_WATCH_TIMEOUT_SECS),
        }
    }
}

/// How a polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The check reported completion
    Done { attempts: u32 },
    TimedOut { attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Run `check` until it returns `Ok(true)`.
///
/// Returns `Err` only when `check` itself fails. Running out of time or
/// being cancelled is reported through [`PollOutcome`].
///
/// # Example
/// ```ignore
/// let outcome = poll_until(PollConfig::default(), &cancel, || async {
///     let report = run_cycle().await?;
///     Ok(report.is_empty())
/// }, "cluster teardown").await?;
/// ```
pub async fn poll_until<F, Fut>(
    config: PollConfig,
    cancel: &CancellationToken,
    check: F,
    what: &str,
) -> Result<PollOutcome>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let mut attempts = 0u32;

    let backoff = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .without_max_times()
        .build();

    let mut delays = backoff.into_iter();

    loop {
        if cancel.is_cancelled() {
            return Ok(PollOutcome::Cancelled { attempts });
        }

        if start.elapsed() >= config.timeout {
            warn!(what, attempts, timeout = ?config.timeout, "Gave up polling");
            return Ok(PollOutcome::TimedOut { attempts });
        }

        attempts += 1;
        if check().await? {
            debug!(what, attempts, "Polling finished");
            return Ok(PollOutcome::Done { attempts });
        }

        // Never sleep past the deadline
        let remaining = config.timeout.saturating_sub(start.elapsed());
        let delay = delays.next().unwrap_or(config.max_delay).min(remaining);
        debug!(
            what,
            attempt = attempts,
            delay_ms = delay.as_millis(),
            "Not finished, polling again"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                return Ok(PollOutcome::Cancelled { attempts });
            }
        }
    }
}
