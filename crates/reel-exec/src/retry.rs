//! Bounded fixed-interval retry polling.
//!
//! Services in the demoed stack may still be starting when the first
//! health checks go out, so health-check commands are repeated until they
//! succeed or the attempt budget runs out. Attempts are strictly
//! sequential with a fixed sleep between them; there is deliberately no
//! jitter or backoff growth because the total wall-clock budget is small.

use std::time::Duration;

use crate::executor::{CommandRunner, ExecError};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Attempt budget and inter-attempt sleep for a retried command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed. Always >= 1.
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// The policy used for stack health checks: 30 attempts, 1.5 s apart.
    pub fn health_check() -> Self {
        Self::new(30, Duration::from_millis(1500))
    }
}

// ---------------------------------------------------------------------------
// run_with_retry
// ---------------------------------------------------------------------------

/// Run `command` until it succeeds or `policy.max_attempts` is exhausted.
///
/// A success returns immediately without consuming the remaining budget or
/// sleeping again. Exhaustion returns [`ExecError::RetryExhausted`]
/// carrying the last observed failure as its source.
pub async fn run_with_retry(
    runner: &dyn CommandRunner,
    command: &str,
    policy: RetryPolicy,
) -> Result<String, ExecError> {
    let mut last: Option<ExecError> = None;

    for attempt in 1..=policy.max_attempts {
        match runner.run(command).await {
            Ok(out) => {
                if attempt > 1 {
                    tracing::info!(command = command, attempt = attempt, "command recovered");
                }
                return Ok(out);
            }
            Err(e) => {
                tracing::debug!(
                    command = command,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "attempt failed"
                );
                last = Some(e);
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    // `last` is always set here: max_attempts >= 1 guarantees at least one
    // failed attempt before we fall through.
    let last = last.unwrap_or_else(|| ExecError::Spawn {
        command: command.to_string(),
        source: std::io::Error::other("no attempt recorded"),
    });

    Err(ExecError::RetryExhausted {
        command: command.to_string(),
        attempts: policy.max_attempts,
        last: Box::new(last),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
