//! Read-only second-factor availability summary.
//!
//! Destinations are masked before they leave the engine; raw secrets and
//! codes never appear here at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Error;
use crate::identity::IdentityLookup;

/// Availability of one code channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FactorStatus {
    pub available: bool,
    pub destination_masked: Option<String>,
}

/// Authenticator-app status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TotpStatus {
    pub enabled: bool,
    pub enabled_at: Option<DateTime<Utc>>,
}

/// Per-subject second-factor overview.
#[derive(Clone, Debug, Serialize)]
pub struct TwoFactorStatus {
    pub email: FactorStatus,
    pub sms: FactorStatus,
    pub totp: TotpStatus,
}

/// Builds [`TwoFactorStatus`] from the identity profile.
pub struct StatusAggregator {
    identity: Arc<dyn IdentityLookup>,
}

impl StatusAggregator {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityLookup>) -> Self {
        Self { identity }
    }

    /// Summarize which factors the subject can use.
    ///
    /// # Errors
    /// `UnknownSubject` or an infrastructure failure.
    pub async fn status(&self, subject_id: &str) -> Result<TwoFactorStatus, Error> {
        let profile = self
            .identity
            .find_by_subject(subject_id)
            .await
            .map_err(Error::Identity)?
            .ok_or(Error::UnknownSubject)?;

        let totp = profile
            .totp
            .filter(|credential| credential.enabled)
            .map(|credential| credential.enabled_at);

        Ok(TwoFactorStatus {
            email: FactorStatus {
                available: profile.email.is_some(),
                destination_masked: profile.email.as_deref().map(mask_email),
            },
            sms: FactorStatus {
                available: profile.phone_number.is_some(),
                destination_masked: profile.phone_number.as_deref().map(mask_phone),
            },
            totp: TotpStatus {
                enabled: totp.is_some(),
                enabled_at: totp,
            },
        })
    }
}

/// Keep the first character of the local part and the domain.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        _ => "***".to_string(),
    }
}

/// Keep the first 3 and last 4 digits; everything else becomes `*`.
/// Short numbers are masked entirely.
fn mask_phone(phone: &str) -> String {
    let prefix = if phone.starts_with('+') { "+" } else { "" };
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let masked: String = if digits.len() > 7 {
        digits
            .iter()
            .enumerate()
            .map(|(idx, digit)| {
                if idx < 3 || idx >= digits.len() - 4 {
                    *digit
                } else {
                    '*'
                }
            })
            .collect()
    } else {
        "*".repeat(digits.len())
    };
    format!("{prefix}{masked}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{SubjectProfile, TotpCredential};
    use anyhow::Result;
    use async_trait::async_trait;

    struct OneProfile(Option<SubjectProfile>);

    #[async_trait]
    impl IdentityLookup for OneProfile {
        async fn find_by_subject(&self, _: &str) -> Result<Option<SubjectProfile>> {
            Ok(self.0.clone())
        }

        async fn persist_totp_credential(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn clear_totp_credential(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn mask_email_keeps_first_char_and_domain() {
        assert_eq!(mask_email("alice@example.com"), "a***@example.com");
        assert_eq!(mask_email("a@b.co"), "a***@b.co");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn mask_phone_keeps_first_three_and_last_four() {
        assert_eq!(mask_phone("+15551234567"), "+155****4567");
        assert_eq!(mask_phone("5551234567"), "555***4567");
        assert_eq!(mask_phone("1234567"), "*******");
    }

    #[tokio::test]
    async fn status_reflects_the_profile() {
        let profile = SubjectProfile {
            subject_id: "u1".to_string(),
            email: Some("alice@example.com".to_string()),
            phone_number: None,
            totp: Some(TotpCredential {
                secret_base32: "JBSWY3DPEHPK3PXP".to_string(),
                enabled: true,
                enabled_at: Utc::now(),
            }),
        };
        let aggregator = StatusAggregator::new(Arc::new(OneProfile(Some(profile))));

        let status = aggregator.status("u1").await.unwrap();
        assert!(status.email.available);
        assert_eq!(
            status.email.destination_masked.as_deref(),
            Some("a***@example.com")
        );
        assert!(!status.sms.available);
        assert_eq!(status.sms.destination_masked, None);
        assert!(status.totp.enabled);
        assert!(status.totp.enabled_at.is_some());
    }

    #[tokio::test]
    async fn disabled_credential_reads_as_not_enabled() {
        let profile = SubjectProfile {
            subject_id: "u1".to_string(),
            email: None,
            phone_number: Some("+15551234567".to_string()),
            totp: Some(TotpCredential {
                secret_base32: "JBSWY3DPEHPK3PXP".to_string(),
                enabled: false,
                enabled_at: Utc::now(),
            }),
        };
        let aggregator = StatusAggregator::new(Arc::new(OneProfile(Some(profile))));

        let status = aggregator.status("u1").await.unwrap();
        assert!(!status.totp.enabled);
        assert_eq!(status.totp.enabled_at, None);
        assert_eq!(
            status.sms.destination_masked.as_deref(),
            Some("+155****4567")
        );
    }

    #[tokio::test]
    async fn unknown_subject_errors() {
        let aggregator = StatusAggregator::new(Arc::new(OneProfile(None)));
        let err = aggregator.status("ghost").await.unwrap_err();
        assert!(matches!(err, Error::UnknownSubject));
    }

    #[tokio::test]
    async fn status_never_contains_the_secret() {
        let secret = "JBSWY3DPEHPK3PXP";
        let profile = SubjectProfile {
            subject_id: "u1".to_string(),
            email: Some("alice@example.com".to_string()),
            phone_number: Some("+15551234567".to_string()),
            totp: Some(TotpCredential {
                secret_base32: secret.to_string(),
                enabled: true,
                enabled_at: Utc::now(),
            }),
        };
        let aggregator = StatusAggregator::new(Arc::new(OneProfile(Some(profile))));

        let status = aggregator.status("u1").await.unwrap();
        let rendered = serde_json::to_string(&status).unwrap();
        assert!(!rendered.contains(secret));
    }
}
