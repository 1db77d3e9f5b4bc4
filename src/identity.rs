//! Seam to the external identity/profile storage.
//!
//! The engine never persists anything durable itself: the subject's
//! email, phone number, and confirmed TOTP credential are owned by the
//! embedding service and reached through this trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A confirmed, persisted authenticator credential.
#[derive(Clone, Debug)]
pub struct TotpCredential {
    pub secret_base32: String,
    pub enabled: bool,
    pub enabled_at: DateTime<Utc>,
}

/// The profile fields the engine needs for a subject.
#[derive(Clone, Debug, Default)]
pub struct SubjectProfile {
    pub subject_id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub totp: Option<TotpCredential>,
}

/// Profile lookup and TOTP credential persistence.
///
/// Implementations translate their own failures into `anyhow` errors;
/// the engine surfaces them as [`crate::Error::Identity`].
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Fetch the profile for a subject; `None` when the subject is unknown.
    async fn find_by_subject(&self, subject_id: &str) -> Result<Option<SubjectProfile>>;

    /// Persist a confirmed TOTP credential (enabled, effective now),
    /// replacing any previous one.
    async fn persist_totp_credential(&self, subject_id: &str, secret_base32: &str) -> Result<()>;

    /// Remove the persisted TOTP credential; a no-op when none exists.
    async fn clear_totp_credential(&self, subject_id: &str) -> Result<()>;
}
