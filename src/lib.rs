//! # Conferma (Second-Factor Verification Engine)
//!
//! `conferma` issues and validates short-lived one-time codes for
//! second-factor authentication across three channels: email, SMS, and
//! authenticator apps (RFC 6238 TOTP). It owns the security-sensitive
//! middle of a 2FA flow — attempt budgets, fixed-window rate limiting,
//! and replay prevention — and delegates everything durable or
//! transport-shaped to injected collaborators.
//!
//! ## Collaborators
//!
//! - [`store::EphemeralStore`]: a TTL key-value store (Redis-shaped). All
//!   verification state lives here and expires on its own; the crate ships
//!   [`store::MemoryStore`] for tests and single-instance deployments.
//! - [`identity::IdentityLookup`]: profile storage owning each subject's
//!   email, phone number, and persisted TOTP credential.
//! - Code delivery (email/SMS send) is the caller's job: `generate`
//!   returns the code, the caller dispatches it.
//!
//! ## Channels (email/SMS)
//!
//! [`channel::ChannelVerifier`] issues a 6-digit code bound to one
//! `(subject, channel)` pair at a time. Codes live five minutes, allow
//! five verification attempts, and are destroyed on success, on budget
//! exhaustion, or by TTL. Attempt accounting rides the store's atomic
//! increment so concurrent verifiers can never overspend the budget.
//!
//! ## Authenticator (TOTP)
//!
//! [`totp::TotpManager`] runs a two-phase enrollment: a provisioning
//! secret parks in the ephemeral store for ten minutes, and only a correct
//! first code promotes it into the durable credential. Steady-state
//! verification uses a ±2-step window with a short-lived replay guard so
//! an accepted code cannot be presented twice.
//!
//! ## Rate limiting
//!
//! [`rate_limit::RateLimiter`] counts attempts in fixed windows (five per
//! fifteen minutes per operation). Its behavior when the store is down is
//! a configurable policy ([`config::RateLimitFailurePolicy`]), defaulting
//! to fail-open: availability wins over strictness for the counter, while
//! code lookups always fail closed.
//!
//! ## Error model
//!
//! Business outcomes (`InvalidCode`, `Expired`, `RateLimited`, ...) are
//! ordinary [`error::Error`] values for the caller to map onto its own
//! surface. Only store/identity infrastructure faults are hard failures,
//! and no error message ever carries a code or secret.

pub mod channel;
pub mod code;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod rate_limit;
pub mod status;
pub mod store;
pub mod totp;

pub use channel::{Channel, ChannelVerifier, CodeIssue, Verified};
pub use config::{EngineConfig, RateLimitFailurePolicy};
pub use engine::TwoFactorEngine;
pub use error::Error;
pub use identity::{IdentityLookup, SubjectProfile, TotpCredential};
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use status::{FactorStatus, StatusAggregator, TotpStatus, TwoFactorStatus};
pub use store::{EphemeralStore, MemoryStore, StoreError};
pub use totp::{SetupComplete, SetupStart, TotpManager, TotpState};
