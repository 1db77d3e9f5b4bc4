//! Email/SMS one-time-code issuance and verification.
//!
//! Flow Overview:
//! 1) `generate`: profile destination check → issuance rate window →
//!    fresh code stored with its TTL, replacing any outstanding one.
//! 2) `verify`: verification rate window → load record → count the
//!    attempt through the store's atomic increment → constant-time
//!    compare.
//! 3) Success destroys the record and reopens the verification window;
//!    spending the attempt budget destroys the record terminally.

use std::sync::Arc;

use chrono::Utc;
use constant_time_eq::constant_time_eq;
use tracing::debug;

use crate::code;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::identity::{IdentityLookup, SubjectProfile};
use crate::rate_limit::RateLimiter;
use crate::store::{EphemeralStore, StoreError};

use super::models::{Channel, CodeIssue, VerificationRecord, Verified};

/// Generate/verify flow for one delivery channel.
pub struct ChannelVerifier {
    channel: Channel,
    store: Arc<dyn EphemeralStore>,
    identity: Arc<dyn IdentityLookup>,
    limiter: RateLimiter,
    config: EngineConfig,
}

impl ChannelVerifier {
    #[must_use]
    pub fn new(
        channel: Channel,
        store: Arc<dyn EphemeralStore>,
        identity: Arc<dyn IdentityLookup>,
        config: EngineConfig,
    ) -> Self {
        let limiter = RateLimiter::new(Arc::clone(&store), config.rate_limit_failure_policy());
        Self {
            channel,
            store,
            identity,
            limiter,
            config,
        }
    }

    fn code_key(&self, subject_id: &str) -> String {
        format!("2fa:code:{}:{subject_id}", self.channel.as_str())
    }

    fn attempts_key(&self, subject_id: &str) -> String {
        format!("2fa:code:{}:{subject_id}:attempts", self.channel.as_str())
    }

    fn generate_rate_key(&self, subject_id: &str) -> String {
        format!("2fa:rate:gen:{}:{subject_id}", self.channel.as_str())
    }

    fn verify_rate_key(&self, subject_id: &str) -> String {
        format!("2fa:rate:verify:{}:{subject_id}", self.channel.as_str())
    }

    /// Issue a fresh code for `subject_id`, bound to `destination`.
    ///
    /// Any previously outstanding code for this (subject, channel) is
    /// invalidated and the attempt budget restarts. The caller dispatches
    /// the returned code to the destination.
    ///
    /// # Errors
    /// `UnknownSubject`, `IdentityMismatch`, `RateLimited`, or an
    /// infrastructure failure.
    pub async fn generate(&self, subject_id: &str, destination: &str) -> Result<CodeIssue, Error> {
        let profile = self
            .identity
            .find_by_subject(subject_id)
            .await
            .map_err(Error::Identity)?
            .ok_or(Error::UnknownSubject)?;
        self.check_destination(&profile, destination)?;

        let status = self
            .limiter
            .check_and_consume(
                &self.generate_rate_key(subject_id),
                self.config.rate_limit_max(),
                self.config.rate_limit_window(),
            )
            .await?;
        if !status.allowed {
            return Err(Error::RateLimited {
                reset_in: status.reset_in,
            });
        }

        let generated = code::generate_numeric_code(self.config.code_digits());
        let record = VerificationRecord {
            code: generated.clone(),
            destination: destination.to_string(),
            created_at: Utc::now(),
            max_attempts: self.config.max_code_attempts(),
        };
        let payload = serde_json::to_string(&record).map_err(StoreError::from)?;
        self.store
            .set(&self.code_key(subject_id), &payload, self.config.code_ttl())
            .await?;
        // Fresh code, fresh attempt budget.
        self.store.delete(&self.attempts_key(subject_id)).await?;

        debug!(subject_id, channel = self.channel.as_str(), "issued verification code");
        Ok(CodeIssue {
            code: generated,
            expires_in: self.config.code_ttl(),
            remaining: status.remaining,
        })
    }

    /// Check `input_code` against the outstanding record.
    ///
    /// Every call consumes one attempt, counted through the store's
    /// atomic increment so concurrent calls cannot overspend the budget.
    ///
    /// # Errors
    /// `RateLimited`, `Expired` (no outstanding record), `InvalidCode`
    /// (attempts remain), `AttemptsExceeded` (terminal; the caller must
    /// regenerate), or an infrastructure failure.
    pub async fn verify(&self, subject_id: &str, input_code: &str) -> Result<Verified, Error> {
        let status = self
            .limiter
            .check_and_consume(
                &self.verify_rate_key(subject_id),
                self.config.rate_limit_max(),
                self.config.rate_limit_window(),
            )
            .await?;
        if !status.allowed {
            return Err(Error::RateLimited {
                reset_in: status.reset_in,
            });
        }

        let Some(payload) = self.store.get(&self.code_key(subject_id)).await? else {
            return Err(Error::Expired);
        };
        let record: VerificationRecord =
            serde_json::from_str(&payload).map_err(StoreError::from)?;

        let attempts = self
            .store
            .increment(&self.attempts_key(subject_id), self.config.code_ttl())
            .await?;
        let budget = u64::from(record.max_attempts);
        if attempts > budget {
            // Concurrent attempts raced past the budget; the record must go.
            self.destroy(subject_id).await?;
            return Err(Error::AttemptsExceeded);
        }

        if !constant_time_eq(record.code.as_bytes(), input_code.trim().as_bytes()) {
            if attempts >= budget {
                // That was the final slot; the code is now permanently unusable.
                self.destroy(subject_id).await?;
                return Err(Error::AttemptsExceeded);
            }
            return Err(Error::InvalidCode);
        }

        self.destroy(subject_id).await?;
        debug!(subject_id, channel = self.channel.as_str(), "verification code accepted");
        Ok(Verified {
            verified_at: Utc::now(),
        })
    }

    fn check_destination(
        &self,
        profile: &SubjectProfile,
        destination: &str,
    ) -> Result<(), Error> {
        match self.channel {
            Channel::Email => {
                if profile.email.as_deref() != Some(destination) {
                    return Err(Error::IdentityMismatch);
                }
            }
            Channel::Sms => {
                // A profile without a phone on file does not block issuance;
                // first-time numbers are vetted by the caller.
                if let Some(phone) = profile.phone_number.as_deref() {
                    if phone != destination {
                        return Err(Error::IdentityMismatch);
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove the record and its attempt counter, and reopen the
    /// verification window: it tracked a code that no longer exists, and
    /// issuance of the next one is rate limited on its own.
    async fn destroy(&self, subject_id: &str) -> Result<(), Error> {
        self.store.delete(&self.code_key(subject_id)).await?;
        self.store.delete(&self.attempts_key(subject_id)).await?;
        self.limiter.reset(&self.verify_rate_key(subject_id)).await;
        Ok(())
    }
}
