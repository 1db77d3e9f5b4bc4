//! In-process store for tests and single-instance deployments.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{EphemeralStore, StoreError};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Keeps entries in a mutex-guarded map and expires them lazily on
/// access. Time flows through `tokio::time`, so tests can pause and
/// advance it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
    if entries.get(key).is_some_and(|entry| !entry.live(now)) {
        entries.remove(key);
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        purge_expired(&mut entries, key, now);
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        purge_expired(&mut entries, key, now);
        Ok(entries.get(key).map(|entry| entry.expires_at - now))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn increment(&self, key: &str, ttl_if_new: Duration) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        purge_expired(&mut entries, key, now);
        if let Some(entry) = entries.get_mut(key) {
            let current: u64 = entry.value.parse().map_err(|_| {
                StoreError::codec(format!("counter at {key} holds a non-numeric value"))
            })?;
            let next = current + 1;
            // The entry keeps its expiry: fixed window, not sliding.
            entry.value = next.to_string();
            Ok(next)
        } else {
            entries.insert(
                key.to_string(),
                Entry {
                    value: 1.to_string(),
                    expires_at: now + ttl_if_new,
                },
            );
            Ok(1)
        }
    }
}
