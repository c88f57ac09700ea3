//! Dispatch policy knobs
//!
//! All of these are off or permissive by default; the server fills them
//! from [`Config`](crate::core::Config).

use std::time::Duration;

/// Default settlement retry budget
pub const DEFAULT_SETTLEMENT_MAX_RETRIES: u32 = 5;
/// Default first backoff, doubled on every retry
pub const DEFAULT_SETTLEMENT_BACKOFF_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// A driver who rejected an order may not accept it within this window
    pub reject_cooldown: Option<Duration>,
    /// Pending orders older than this are cancelled by the sweeper
    pub pending_expiry: Option<Duration>,
    /// Orders sitting in `driver_assigned` longer than this are cancelled by the sweeper
    pub assigned_expiry: Option<Duration>,
    pub settlement_max_retries: u32,
    pub settlement_backoff: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            reject_cooldown: None,
            pending_expiry: None,
            assigned_expiry: None,
            settlement_max_retries: DEFAULT_SETTLEMENT_MAX_RETRIES,
            settlement_backoff: Duration::from_millis(DEFAULT_SETTLEMENT_BACKOFF_MS),
        }
    }
}

impl DispatchPolicy {
    /// Build from second counts where 0 means disabled
    pub fn from_secs(
        reject_cooldown_secs: u64,
        pending_expiry_secs: u64,
        assigned_expiry_secs: u64,
    ) -> Self {
        Self {
            reject_cooldown: secs(reject_cooldown_secs),
            pending_expiry: secs(pending_expiry_secs),
            assigned_expiry: secs(assigned_expiry_secs),
            ..Self::default()
        }
    }

    pub fn with_settlement_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.settlement_max_retries = max_retries;
        self.settlement_backoff = Duration::from_millis(backoff_ms);
        self
    }

    /// True when the sweeper has anything to do
    pub fn sweeper_enabled(&self) -> bool {
        self.pending_expiry.is_some() || self.assigned_expiry.is_some()
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}
