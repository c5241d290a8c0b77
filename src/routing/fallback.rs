use crate::model::ProviderId;
use crate::providers::Provider;
use crate::state::ProviderStateTracker;
use crate::LensError;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Runs one adapter call and retries alternates on rate limits
///
/// Every attempt's outcome is recorded in the tracker: success, rate limit
/// (starts a cooldown) or plain error.
pub struct FallbackOrchestrator<'a> {
    tracker: &'a ProviderStateTracker,
    providers: &'a BTreeMap<ProviderId, Arc<dyn Provider>>,
}

impl<'a> FallbackOrchestrator<'a> {
    pub fn new(tracker: &'a ProviderStateTracker, providers: &'a BTreeMap<ProviderId, Arc<dyn Provider>>) -> Self {
        Self { tracker, providers }
    }

    /// Executes `op` against `primary`, falling back on rate limits
    ///
    /// # Behavior
    ///
    /// - Success: recorded and returned with the serving provider
    /// - Rate limit: recorded; with `fallback` set, the primary's usable
    ///   alternates are tried in order. The first success wins. When every
    ///   alternate fails, the primary's rate-limit error is returned.
    /// - Any other error: recorded and returned immediately
    ///
    /// # Arguments
    ///
    /// * `primary` - The selected provider
    /// * `fallback` - Whether alternates may be tried
    /// * `op` - The adapter call, invoked once per attempted provider
    pub async fn execute<T, F, Fut>(&self, primary: ProviderId, fallback: bool, op: F) -> crate::Result<(ProviderId, T)>
    where
        F: Fn(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        let provider = self
            .providers
            .get(&primary)
            .cloned()
            .ok_or(LensError::ProviderUnavailable { provider: primary })?;

        let original = match op(provider).await {
            Ok(value) => {
                self.tracker.record_success(primary);
                return Ok((primary, value));
            }
            Err(e) if e.is_rate_limit() => {
                self.tracker.record_rate_limit(primary);
                e
            }
            Err(e) => {
                self.tracker.record_error(primary);
                return Err(e);
            }
        };

        if !fallback {
            return Err(original);
        }

        for &alternate in primary.alternates() {
            if !self.tracker.is_usable(alternate) {
                continue;
            }
            let Some(provider) = self.providers.get(&alternate).cloned() else {
                continue;
            };

            tracing::warn!("Provider {} rate limited, falling back to {}", primary, alternate);
            match op(provider).await {
                Ok(value) => {
                    self.tracker.record_success(alternate);
                    tracing::info!("Fallback to {} succeeded", alternate);
                    return Ok((alternate, value));
                }
                Err(e) if e.is_rate_limit() => {
                    self.tracker.record_rate_limit(alternate);
                }
                Err(e) => {
                    tracing::debug!("Fallback to {} failed: {}", alternate, e);
                    self.tracker.record_error(alternate);
                }
            }
        }

        tracing::warn!("All alternates for {} exhausted", primary);
        Err(original)
    }
}
