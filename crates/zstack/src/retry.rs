//! Bounded retries for bootstrap steps.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, ZStackError};

/// Per-attempt timeout and attempt budget of a retried step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub attempts: u32,
}

/// Run `attempt` until it succeeds, the budget is spent, or `deadline` passes.
///
/// Each attempt receives its own deadline, never later than `deadline`. The
/// last error is returned wrapped with `step`.
pub(crate) async fn retry<T, F, Fut>(
    policy: RetryPolicy,
    deadline: Instant,
    step: &str,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(Instant) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;
    let mut attempted = 0;

    while attempted < policy.attempts {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        attempted += 1;

        let attempt_deadline = (now + policy.attempt_timeout).min(deadline);
        match attempt(attempt_deadline).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(step, attempt = attempted, error = %e, "attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(ZStackError::RetryExhausted {
        step: step.to_string(),
        attempts: attempted,
        source: Box::new(last_error.unwrap_or(ZStackError::DeadlineExceeded("retrying"))),
    })
}
