//! Polling of long-running remote operations (exponential backoff)
//!
//! Only the status check is repeated. The mutating call that started the
//! operation is never retried here.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Backoff settings for status polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the second status check (milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for the delay between checks (milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential multiplier
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl PollConfig {
    /// Delay (milliseconds) after the given zero-based attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        (delay as u64).min(self.max_delay_ms)
    }
}

/// Status reported by one status check
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus<T> {
    /// The operation finished successfully
    Done(T),
    /// Still running
    Pending,
    /// The operation finished unsuccessfully
    Failed { status: String, message: String },
}

/// Repeat `check` with backoff until it reports completion or `timeout` elapses
///
/// A `Failed` status becomes [`CloudError::OperationFailed`]; running out of
/// time becomes [`CloudError::Timeout`]. Errors from `check` itself are
/// returned as-is.
pub async fn poll_until<T, F, Fut>(
    config: &PollConfig,
    timeout: Duration,
    operation: &str,
    identity: &str,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        match check().await? {
            PollStatus::Done(value) => {
                tracing::debug!(
                    "{} for {} completed after {} checks",
                    operation,
                    identity,
                    attempt + 1
                );
                return Ok(value);
            }
            PollStatus::Failed { status, message } => {
                return Err(CloudError::OperationFailed {
                    operation: operation.to_string(),
                    identity: identity.to_string(),
                    status,
                    message,
                });
            }
            PollStatus::Pending => {}
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(CloudError::Timeout {
                operation: operation.to_string(),
                identity: identity.to_string(),
                waited: elapsed,
            });
        }

        let delay = Duration::from_millis(config.delay_for_attempt(attempt)).min(timeout - elapsed);
        tracing::debug!(
            "{} for {} still in progress, checking again in {:?}",
            operation,
            identity,
            delay
        );
        sleep(delay).await;
        attempt += 1;
    }
}
