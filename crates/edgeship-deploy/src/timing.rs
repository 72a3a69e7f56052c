//! Poll cadences of the deployment flow

use edgeship_cloud::PollPolicy;
use std::time::Duration;

/// Interval and attempt budget of every wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Stack create/update/delete settle
    pub stack: PollPolicy,

    /// Waiting for the CA to expose DNS challenge records
    pub certificate_options: PollPolicy,

    /// Interval between issuance checks; the budget derives from the wait minutes
    pub certificate_issuance_interval: Duration,

    /// Time allowed to empty and delete an orphaned bucket
    pub orphan_cleanup_budget: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            stack: PollPolicy::new(Duration::from_secs(15), 160),
            certificate_options: PollPolicy::new(Duration::from_secs(2), 30),
            certificate_issuance_interval: Duration::from_secs(30),
            orphan_cleanup_budget: Duration::from_secs(30),
        }
    }
}

impl Timings {
    /// Zero intervals with the default attempt budgets
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            stack: PollPolicy::new(Duration::ZERO, defaults.stack.max_attempts),
            certificate_options: PollPolicy::new(
                Duration::ZERO,
                defaults.certificate_options.max_attempts,
            ),
            certificate_issuance_interval: Duration::ZERO,
            orphan_cleanup_budget: defaults.orphan_cleanup_budget,
        }
    }

    /// Issuance polling: two attempts per minute of allowed wait
    pub fn certificate_issuance(&self, wait_minutes: u32) -> PollPolicy {
        PollPolicy::new(
            self.certificate_issuance_interval,
            wait_minutes.saturating_mul(2).max(1),
        )
    }
}
