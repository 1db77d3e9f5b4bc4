use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery channel for one-time codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

/// The one outstanding code for a (subject, channel) pair, as stored.
///
/// The attempt counter lives in a sibling store key driven by the
/// store's atomic increment, never by rewriting this record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct VerificationRecord {
    pub code: String,
    pub destination: String,
    pub created_at: DateTime<Utc>,
    pub max_attempts: u32,
}

/// A freshly issued code.
///
/// `code` is handed back because dispatching it to the email/SMS
/// transport is the caller's job; it must never be logged or stored
/// anywhere else.
#[derive(Clone, Debug, Serialize)]
pub struct CodeIssue {
    pub code: String,
    pub expires_in: Duration,
    /// Issuance budget left in the current rate window.
    pub remaining: u32,
}

/// Receipt for a successful verification.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Verified {
    pub verified_at: DateTime<Utc>,
}
