//! Typed outcomes for verification flows.
//!
//! Business failures are returned as values for the caller to map onto its
//! own surface; only the `Store`, `Identity`, and `Internal` kinds signal
//! infrastructure trouble and should propagate as hard failures. Messages
//! never include the expected code or any secret material.

use std::time::Duration;
use thiserror::Error;

pub use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    /// The submitted destination does not match the subject's profile.
    #[error("destination does not match the subject profile")]
    IdentityMismatch,

    /// Attempt budget for the current window is spent.
    #[error("too many attempts; retry in {}s", reset_in.as_secs())]
    RateLimited { reset_in: Duration },

    /// No active code or setup session (never issued, already consumed,
    /// or expired by TTL).
    #[error("verification code expired or not found")]
    Expired,

    /// The submitted code does not match.
    #[error("invalid verification code")]
    InvalidCode,

    /// The code's attempt budget is exhausted; the caller must regenerate.
    #[error("maximum verification attempts exceeded")]
    AttemptsExceeded,

    /// The TOTP code was already accepted inside its validity window.
    #[error("one-time code already used")]
    ReplayDetected,

    /// No enabled TOTP credential exists for the subject.
    #[error("authenticator app is not configured")]
    NotConfigured,

    /// The subject has no profile in identity storage.
    #[error("unknown subject")]
    UnknownSubject,

    /// The ephemeral store failed or returned undecodable state.
    #[error("ephemeral store failure")]
    Store(#[from] StoreError),

    /// The injected identity collaborator failed.
    #[error("identity lookup failure")]
    Identity(#[source] anyhow::Error),

    /// An engine invariant broke (e.g. a freshly generated secret was
    /// rejected by the TOTP construction).
    #[error("internal engine failure")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    /// True for the kinds that represent infrastructure trouble rather
    /// than a business outcome.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Identity(_) | Self::Internal(_)
        )
    }
}
