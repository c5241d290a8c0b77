use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rate-limit bookkeeping for one provider
///
/// `is_limited` implies `reset_at` is set. The limit is never cleared by a
/// timer; readers clear it lazily once `reset_at` has passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    /// Whether the provider is currently inside a cooldown window
    pub is_limited: bool,

    /// End of the cooldown window
    pub reset_at: Option<DateTime<Utc>>,

    /// Number of recorded failures (rate limits and other errors)
    pub errors: u32,
}

/// Tracks the health of a provider across requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    /// Whether the provider can run at all (credentials present)
    pub available: bool,

    pub rate_limit: RateLimitState,

    /// Timestamp of the last successful call
    pub last_success: Option<DateTime<Utc>>,
}

impl ProviderState {
    /// Creates a state with no recorded history
    pub fn new(available: bool) -> Self {
        Self {
            available,
            ..Default::default()
        }
    }

    /// Checks if the provider may be used at `now`
    ///
    /// An expired limit is cleared as a side effect, so the check mutates.
    ///
    /// # Returns
    ///
    /// * `true` - available and not inside a cooldown window
    /// * `false` - unavailable, or still rate limited
    pub fn check_usable(&mut self, now: DateTime<Utc>) -> bool {
        if !self.available {
            return false;
        }

        if self.rate_limit.is_limited {
            match self.rate_limit.reset_at {
                Some(reset_at) if now < reset_at => return false,
                _ => self.clear_rate_limit(),
            }
        }

        true
    }

    /// Records a successful call, ending any cooldown
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_success = Some(now);
        self.clear_rate_limit();
    }

    /// Marks the provider rate limited until `reset_at`
    pub fn mark_rate_limited(&mut self, reset_at: DateTime<Utc>) {
        self.rate_limit.is_limited = true;
        self.rate_limit.reset_at = Some(reset_at);
        self.rate_limit.errors = self.rate_limit.errors.saturating_add(1);
    }

    /// Counts a failure that does not start a cooldown
    pub fn record_error(&mut self) {
        self.rate_limit.errors = self.rate_limit.errors.saturating_add(1);
    }

    /// Leaves the cooldown window (the error count is kept)
    pub fn clear_rate_limit(&mut self) {
        self.rate_limit.is_limited = false;
        self.rate_limit.reset_at = None;
    }
}
