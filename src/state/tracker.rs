use super::ProviderState;
use crate::model::ProviderId;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Process-wide provider health, shared by every request
///
/// Each provider's state sits behind its own lock, so requests against
/// different providers never contend. All mutation goes through the
/// `record_*` methods; readers only get snapshots.
#[derive(Debug)]
pub struct ProviderStateTracker {
    states: HashMap<ProviderId, Mutex<ProviderState>>,
    cooldown: Duration,
}

impl ProviderStateTracker {
    /// Creates a tracker for the given providers
    ///
    /// # Arguments
    ///
    /// * `cooldown` - How long a provider stays unusable after a rate limit
    /// * `availability` - Each known provider and whether it can run at all
    pub fn new(cooldown: Duration, availability: impl IntoIterator<Item = (ProviderId, bool)>) -> Self {
        let states = availability
            .into_iter()
            .map(|(id, available)| (id, Mutex::new(ProviderState::new(available))))
            .collect();

        Self { states, cooldown }
    }

    /// Configured cooldown window
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Checks if a provider is available and not rate limited
    ///
    /// Unknown providers are never usable.
    pub fn is_usable(&self, provider: ProviderId) -> bool {
        self.is_usable_at(provider, Utc::now())
    }

    /// Same as [`is_usable`](Self::is_usable) with an explicit clock
    pub fn is_usable_at(&self, provider: ProviderId, now: DateTime<Utc>) -> bool {
        self.with_state(provider, |state| state.check_usable(now))
            .unwrap_or(false)
    }

    /// Records a successful call
    pub fn record_success(&self, provider: ProviderId) {
        self.record_success_at(provider, Utc::now());
    }

    pub fn record_success_at(&self, provider: ProviderId, now: DateTime<Utc>) {
        self.with_state(provider, |state| state.record_success(now));
    }

    /// Starts a cooldown window for a provider
    pub fn record_rate_limit(&self, provider: ProviderId) {
        self.record_rate_limit_at(provider, Utc::now());
    }

    pub fn record_rate_limit_at(&self, provider: ProviderId, now: DateTime<Utc>) {
        let cooldown = chrono::Duration::from_std(self.cooldown)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let reset_at = now + cooldown;

        self.with_state(provider, |state| state.mark_rate_limited(reset_at));
        tracing::warn!("Provider {} rate limited until {}", provider, reset_at);
    }

    /// Counts a non rate-limit failure
    pub fn record_error(&self, provider: ProviderId) {
        self.with_state(provider, ProviderState::record_error);
    }

    /// Copy of one provider's state
    pub fn state(&self, provider: ProviderId) -> Option<ProviderState> {
        self.with_state(provider, |state| state.clone())
    }

    /// Copies of all provider states, keyed by provider
    pub fn snapshot(&self) -> BTreeMap<ProviderId, ProviderState> {
        self.states
            .iter()
            .map(|(id, state)| (*id, lock(state).clone()))
            .collect()
    }

    /// Providers that are available and not rate limited right now
    pub fn usable_providers(&self) -> BTreeSet<ProviderId> {
        self.usable_providers_at(Utc::now())
    }

    pub fn usable_providers_at(&self, now: DateTime<Utc>) -> BTreeSet<ProviderId> {
        self.states
            .keys()
            .copied()
            .filter(|id| self.is_usable_at(*id, now))
            .collect()
    }

    fn with_state<R>(&self, provider: ProviderId, f: impl FnOnce(&mut ProviderState) -> R) -> Option<R> {
        self.states.get(&provider).map(|state| f(&mut lock(state)))
    }
}

/// Locks a state, recovering the data if a previous holder panicked
fn lock(state: &Mutex<ProviderState>) -> MutexGuard<'_, ProviderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
