//! Ephemeral TTL key-value storage.
//!
//! All verification state is partitioned by subject and expires on its
//! own; running the engine as multiple stateless instances only requires
//! pointing them at the same store.
//!
//! ## Key patterns
//!
//! ```text
//! 2fa:code:{channel}:{subject}           → verification record JSON
//! 2fa:code:{channel}:{subject}:attempts  → attempt counter
//! 2fa:rate:{op}:{subject}                → rate-limit counter
//! 2fa:totp:setup:{subject}               → TOTP setup session JSON
//! 2fa:totp:used:{subject}:{code}         → replay guard
//! ```

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure at the storage seam.
///
/// `Unavailable` is connectivity/timeout trouble; `Codec` means a value
/// came back in a shape the engine cannot read. Neither is ever folded
/// into a code-validity verdict.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ephemeral store unavailable: {message}")]
    Unavailable { message: String },
    #[error("stored value could not be decoded: {message}")]
    Codec { message: String },
}

impl StoreError {
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::codec(err.to_string())
    }
}

/// TTL key-value contract the engine runs on.
///
/// A `get` returning `None` is a business outcome ("no active code"),
/// not a failure; failures are `StoreError`.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring
    /// after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch the live value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`; a no-op when absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remaining time to live, `None` when the key does not exist.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Whether a live value exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically create-or-increment a counter in a single round trip.
    /// The TTL applies only when the call creates the key; an existing
    /// counter keeps its expiry.
    async fn increment(&self, key: &str, ttl_if_new: Duration) -> Result<u64, StoreError>;
}
