//! Authenticator-app (RFC 6238) enrollment and verification.
//!
//! Flow Overview:
//! 1) `generate_secret` parks a fresh secret in the ephemeral store; the
//!    user has ten minutes to scan it and come back with a first code.
//! 2) `confirm_setup` proves possession, persists the credential through
//!    the identity seam, and hands out one-time backup codes.
//! 3) `verify` checks the replay guard, then the ±skew window, then arms
//!    the guard so the accepted code stays rejected while it could still
//!    validate.
//!
//! Secrets are long-lived only inside the injected identity storage;
//! nothing in this module logs or re-exposes them.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::{debug, info};
use uuid::Uuid;

use crate::channel::Verified;
use crate::code;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::identity::IdentityLookup;
use crate::rate_limit::RateLimiter;
use crate::store::{EphemeralStore, StoreError};

use super::models::{SetupComplete, SetupSession, SetupStart, TotpState};

const TOTP_DIGITS: usize = 6;

/// Two-phase TOTP enrollment and steady-state verification.
pub struct TotpManager {
    store: Arc<dyn EphemeralStore>,
    identity: Arc<dyn IdentityLookup>,
    limiter: RateLimiter,
    config: EngineConfig,
}

impl TotpManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        identity: Arc<dyn IdentityLookup>,
        config: EngineConfig,
    ) -> Self {
        let limiter = RateLimiter::new(Arc::clone(&store), config.rate_limit_failure_policy());
        Self {
            store,
            identity,
            limiter,
            config,
        }
    }

    fn setup_key(subject_id: &str) -> String {
        format!("2fa:totp:setup:{subject_id}")
    }

    fn replay_key(subject_id: &str, totp_code: &str) -> String {
        format!("2fa:totp:used:{subject_id}:{totp_code}")
    }

    fn verify_rate_key(subject_id: &str) -> String {
        format!("2fa:rate:verify:totp:{subject_id}")
    }

    fn build_totp(&self, secret_bytes: Vec<u8>, account: &str) -> Result<TOTP, totp_rs::TotpUrlError> {
        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            self.config.totp_skew(),
            self.config.totp_step_seconds(),
            secret_bytes,
            Some(sanitize_label(self.config.issuer())),
            sanitize_label(account),
        )
    }

    /// Open a setup session: generate a secret and the otpauth URI for
    /// the enrollment screen. The persisted credential, if any, is left
    /// untouched until [`Self::confirm_setup`] succeeds.
    ///
    /// # Errors
    /// `UnknownSubject` or an infrastructure failure.
    pub async fn generate_secret(
        &self,
        subject_id: &str,
        label: Option<&str>,
    ) -> Result<SetupStart, Error> {
        let profile = self
            .identity
            .find_by_subject(subject_id)
            .await
            .map_err(Error::Identity)?
            .ok_or(Error::UnknownSubject)?;

        let secret_bytes = Secret::generate_secret()
            .to_bytes()
            .map_err(|err| Error::Internal(anyhow!("generated secret unusable: {err:?}")))?;
        let account = label
            .map(str::to_string)
            .or(profile.email)
            .unwrap_or_else(|| subject_id.to_string());
        let totp = self
            .build_totp(secret_bytes, &account)
            .map_err(|err| Error::Internal(anyhow!("TOTP construction failed: {err:?}")))?;

        let session = SetupSession {
            secret_base32: totp.get_secret_base32(),
            provisioning_uri: totp.get_url(),
            created_at: Utc::now(),
        };
        let payload = serde_json::to_string(&session).map_err(StoreError::from)?;
        self.store
            .set(
                &Self::setup_key(subject_id),
                &payload,
                self.config.setup_session_ttl(),
            )
            .await?;

        info!(subject_id, "opened totp setup session");
        Ok(SetupStart {
            secret_base32: session.secret_base32,
            provisioning_uri: session.provisioning_uri,
            expires_in: self.config.setup_session_ttl(),
        })
    }

    /// Confirm enrollment with the first code from the authenticator.
    ///
    /// On success the credential is persisted, the session is destroyed,
    /// and one-time backup codes are returned.
    ///
    /// # Errors
    /// `Expired` (no live setup session), `InvalidCode`, or an
    /// infrastructure failure.
    pub async fn confirm_setup(
        &self,
        subject_id: &str,
        totp_code: &str,
    ) -> Result<SetupComplete, Error> {
        let Some(payload) = self.store.get(&Self::setup_key(subject_id)).await? else {
            return Err(Error::Expired);
        };
        let session: SetupSession = serde_json::from_str(&payload).map_err(StoreError::from)?;

        let secret_bytes = Secret::Encoded(session.secret_base32.clone())
            .to_bytes()
            .map_err(|err| StoreError::codec(format!("setup session secret rejected: {err:?}")))?;
        let totp = self
            .build_totp(secret_bytes, subject_id)
            .map_err(|err| StoreError::codec(format!("setup session secret rejected: {err:?}")))?;

        if !totp.check_current(totp_code.trim()).unwrap_or(false) {
            // The session stays; the user may retry until it expires.
            return Err(Error::InvalidCode);
        }

        self.identity
            .persist_totp_credential(subject_id, &session.secret_base32)
            .await
            .map_err(Error::Identity)?;
        self.store.delete(&Self::setup_key(subject_id)).await?;

        info!(subject_id, "totp enabled");
        Ok(SetupComplete {
            batch_id: Uuid::new_v4(),
            backup_codes: code::generate_backup_codes(code::BACKUP_CODE_COUNT),
        })
    }

    /// Verify a steady-state code against the persisted credential.
    ///
    /// # Errors
    /// `RateLimited`, `NotConfigured`, `ReplayDetected`, `InvalidCode`,
    /// `UnknownSubject`, or an infrastructure failure.
    pub async fn verify(&self, subject_id: &str, totp_code: &str) -> Result<Verified, Error> {
        let status = self
            .limiter
            .check_and_consume(
                &Self::verify_rate_key(subject_id),
                self.config.rate_limit_max(),
                self.config.rate_limit_window(),
            )
            .await?;
        if !status.allowed {
            return Err(Error::RateLimited {
                reset_in: status.reset_in,
            });
        }

        let profile = self
            .identity
            .find_by_subject(subject_id)
            .await
            .map_err(Error::Identity)?
            .ok_or(Error::UnknownSubject)?;
        let Some(credential) = profile.totp.filter(|credential| credential.enabled) else {
            return Err(Error::NotConfigured);
        };

        let totp_code = totp_code.trim();
        // The code becomes part of a store key below; anything that is
        // not exactly six digits cannot be a valid code anyway.
        if totp_code.len() != TOTP_DIGITS || !totp_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCode);
        }

        if self
            .store
            .exists(&Self::replay_key(subject_id, totp_code))
            .await?
        {
            debug!(subject_id, "totp code replay rejected");
            return Err(Error::ReplayDetected);
        }

        let secret_bytes = Secret::Encoded(credential.secret_base32)
            .to_bytes()
            .map_err(|err| Error::Identity(anyhow!("persisted TOTP secret rejected: {err:?}")))?;
        let totp = self
            .build_totp(secret_bytes, subject_id)
            .map_err(|err| Error::Identity(anyhow!("persisted TOTP secret rejected: {err:?}")))?;

        if !totp.check_current(totp_code).unwrap_or(false) {
            return Err(Error::InvalidCode);
        }

        // Arm the guard before clearing the window so a racing duplicate
        // can never find both gates open.
        self.store
            .set(
                &Self::replay_key(subject_id, totp_code),
                &Utc::now().to_rfc3339(),
                self.config.replay_guard_ttl(),
            )
            .await?;
        self.limiter.reset(&Self::verify_rate_key(subject_id)).await;

        debug!(subject_id, "totp code accepted");
        Ok(Verified {
            verified_at: Utc::now(),
        })
    }

    /// Tear down TOTP for the subject: persisted credential and any
    /// residual setup session. Idempotent.
    ///
    /// # Errors
    /// Infrastructure failures only.
    pub async fn disable(&self, subject_id: &str) -> Result<(), Error> {
        self.identity
            .clear_totp_credential(subject_id)
            .await
            .map_err(Error::Identity)?;
        self.store.delete(&Self::setup_key(subject_id)).await?;
        info!(subject_id, "totp disabled");
        Ok(())
    }

    /// Current lifecycle state for the subject.
    ///
    /// # Errors
    /// `UnknownSubject` or an infrastructure failure.
    pub async fn state(&self, subject_id: &str) -> Result<TotpState, Error> {
        let profile = self
            .identity
            .find_by_subject(subject_id)
            .await
            .map_err(Error::Identity)?
            .ok_or(Error::UnknownSubject)?;
        if let Some(credential) = profile.totp.filter(|credential| credential.enabled) {
            return Ok(TotpState::Enabled {
                enabled_at: credential.enabled_at,
            });
        }
        if let Some(expires_in) = self.store.ttl(&Self::setup_key(subject_id)).await? {
            return Ok(TotpState::PendingConfirmation { expires_in });
        }
        Ok(TotpState::NotConfigured)
    }
}

fn sanitize_label(label: &str) -> String {
    // otpauth URIs reserve ':' as the issuer/account separator.
    label.replace(':', "-")
}
