//! Provider health tracking
//!
//! # Components
//!
//! - `ProviderState`: availability, rate-limit cooldown and last success of one provider
//! - `ProviderStateTracker`: the shared, per-provider locked collection of states
//!
//! The tracker is an explicit object owned by the `Extractor`, so tests can
//! build isolated instances.

mod provider_state;
mod tracker;

pub use provider_state::{ProviderState, RateLimitState};
pub use tracker::ProviderStateTracker;
