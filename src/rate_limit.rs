//! Fixed-window rate limiting on the ephemeral store.
//!
//! Flow Overview:
//! 1) One atomic increment per attempt; the TTL set on creation opens the
//!    window, and the window resets entirely when it expires.
//! 2) A counter above the budget answers `Limited` with the window's
//!    remaining time.
//! 3) A store failure honours the configured policy. Fail-open trades a
//!    lost counter for availability and is the documented production
//!    default; fail-closed turns the fault into a hard error. Code
//!    lookups elsewhere always fail closed, so the asymmetry is contained
//!    here.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::RateLimitFailurePolicy;
use crate::error::Error;
use crate::store::EphemeralStore;

/// Outcome of a consume attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    /// Attempts left in the window after this one.
    pub remaining: u32,
    /// Time until the window resets.
    pub reset_in: Duration,
}

/// Fixed-window attempt counter keyed by operation + subject.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn EphemeralStore>,
    policy: RateLimitFailurePolicy,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, policy: RateLimitFailurePolicy) -> Self {
        Self { store, policy }
    }

    /// Count one attempt against `key` and report whether it is allowed.
    ///
    /// # Errors
    /// Returns [`Error::Store`] on store failure only under
    /// [`RateLimitFailurePolicy::FailClosed`].
    pub async fn check_and_consume(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> Result<RateLimitStatus, Error> {
        let count = match self.store.increment(key, window).await {
            Ok(count) => count,
            Err(err) => {
                return match self.policy {
                    RateLimitFailurePolicy::FailOpen => {
                        warn!("rate limit store failure, allowing (fail-open): {err}");
                        Ok(RateLimitStatus {
                            allowed: true,
                            remaining: max_attempts,
                            reset_in: window,
                        })
                    }
                    RateLimitFailurePolicy::FailClosed => Err(Error::Store(err)),
                };
            }
        };

        // The window opened when the counter was created; fall back to the
        // full window if the TTL probe fails mid-flight.
        let reset_in = self
            .store
            .ttl(key)
            .await
            .ok()
            .flatten()
            .unwrap_or(window);

        let max = u64::from(max_attempts);
        if count > max {
            Ok(RateLimitStatus {
                allowed: false,
                remaining: 0,
                reset_in,
            })
        } else {
            Ok(RateLimitStatus {
                allowed: true,
                remaining: u32::try_from(max - count).unwrap_or(0),
                reset_in,
            })
        }
    }

    /// Drop the counter for `key`, reopening the budget.
    ///
    /// Best effort: the window expires on its own, so a store failure
    /// here is logged, not propagated — it must not turn an already
    /// successful verification into an error.
    pub async fn reset(&self, key: &str) {
        if let Err(err) = self.store.delete(key).await {
            warn!("failed to clear rate limit counter: {err}");
        }
    }
}
