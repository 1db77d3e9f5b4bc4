use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Setup-session payload parked in the ephemeral store between secret
/// generation and confirmation. Never returned to callers as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SetupSession {
    pub secret_base32: String,
    pub provisioning_uri: String,
    pub created_at: DateTime<Utc>,
}

/// Authenticator lifecycle for a subject.
///
/// `PendingConfirmation` reverts to `NotConfigured` on its own when the
/// setup session expires; `Enabled` only ends through an explicit
/// disable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TotpState {
    NotConfigured,
    PendingConfirmation { expires_in: Duration },
    Enabled { enabled_at: DateTime<Utc> },
}

/// Material for the enrollment screen: the secret for manual entry and
/// the otpauth URI to render as a QR code.
#[derive(Clone, Debug)]
pub struct SetupStart {
    pub secret_base32: String,
    pub provisioning_uri: String,
    pub expires_in: Duration,
}

/// Result of a confirmed enrollment. The backup codes are shown to the
/// user exactly once; this crate does not store them.
#[derive(Clone, Debug)]
pub struct SetupComplete {
    pub batch_id: Uuid,
    pub backup_codes: Vec<String>,
}
