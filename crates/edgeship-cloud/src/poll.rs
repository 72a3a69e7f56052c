//! Bounded polling
//!
//! Fixed interval, fixed attempt budget, no backoff. Shared by every wait in the
//! deployment flow (stack settle, certificate validation options, issuance).

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Interval and attempt budget of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound of the time spent sleeping
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T, S> {
    /// Done; stop polling
    Ready(T),
    /// Not yet; `S` is the status observed on this attempt
    Pending(S),
}

/// Result of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, S> {
    Ready(T),
    TimedOut { attempts: u32, last: Option<S> },
}

/// Probe until it reports [`Poll::Ready`] or the attempt budget is spent
///
/// A probe error aborts the loop immediately. No sleep follows the final attempt.
pub async fn poll_until<T, S, E, F, Fut>(
    policy: &PollPolicy,
    mut probe: F,
) -> Result<PollOutcome<T, S>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Poll<T, S>, E>>,
{
    let mut last = None;

    for attempt in 0..policy.max_attempts {
        match probe(attempt).await? {
            Poll::Ready(value) => return Ok(PollOutcome::Ready(value)),
            Poll::Pending(status) => {
                tracing::debug!(
                    "poll attempt {}/{} pending",
                    attempt + 1,
                    policy.max_attempts
                );
                last = Some(status);
            }
        }

        // 最後の試行でなければ待機
        if attempt + 1 < policy.max_attempts && !policy.interval.is_zero() {
            sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::TimedOut {
        attempts: policy.max_attempts,
        last,
    })
}
