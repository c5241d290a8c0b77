use crate::model::{ProviderId, RequestOptions};
use crate::state::{ProviderState, ProviderStateTracker};
use crate::LensError;
use std::cmp::Reverse;

/// Backend with the strongest native HTML fidelity
const HTML_PREFERRED: ProviderId = ProviderId::Firecrawl;

/// Chooses the provider for a request
///
/// # Selection Order
///
/// 1. No usable provider at all → `NoProviderAvailable`
/// 2. HTML requested without a preference → the HTML-fidelity backend, if usable
/// 3. Usable preferred provider → that provider
/// 4. Unusable preferred provider with fallback disabled → `ProviderUnavailable`
/// 5. First usable provider in fixed priority order
/// 6. Most recent success, then fewest recorded errors
///
/// # Arguments
///
/// * `tracker` - Current provider health
/// * `options` - Request options carrying the preference and fallback flag
pub fn select_provider(tracker: &ProviderStateTracker, options: &RequestOptions) -> crate::Result<ProviderId> {
    let usable = tracker.usable_providers();
    if usable.is_empty() {
        return Err(LensError::NoProviderAvailable);
    }

    if options.html && options.provider.is_none() && usable.contains(&HTML_PREFERRED) {
        tracing::debug!("HTML requested, selecting {}", HTML_PREFERRED);
        return Ok(HTML_PREFERRED);
    }

    if let Some(preferred) = options.provider {
        if usable.contains(&preferred) {
            return Ok(preferred);
        }
        if !options.fallback {
            return Err(LensError::ProviderUnavailable {
                provider: preferred,
            });
        }
        tracing::info!("Preferred provider {} is not usable, selecting another", preferred);
    }

    if let Some(id) = ProviderId::ALL.iter().find(|id| usable.contains(id)) {
        return Ok(*id);
    }

    // Only reachable for providers outside the fixed priority list
    let snapshot = tracker.snapshot();
    usable
        .into_iter()
        .max_by_key(|id| health_rank(snapshot.get(id)))
        .ok_or(LensError::NoProviderAvailable)
}

/// Orders providers by most recent success, then by fewest errors
fn health_rank(state: Option<&ProviderState>) -> (Option<chrono::DateTime<chrono::Utc>>, Reverse<u32>) {
    match state {
        Some(state) => (state.last_success, Reverse(state.rate_limit.errors)),
        None => (None, Reverse(u32::MAX)),
    }
}
