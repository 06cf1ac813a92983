//! Two-tier corpus cache with TTL expiry and quota spill-over.
//!
//! Tiers are consulted in a fixed priority order: the persistent
//! [`DiskTier`] first, then the session-scoped [`MemoryTier`]. Each record
//! is a JSON-encoded [`CacheRecord`] stored under
//! `corpus_<repoId>_<fileName>`.
//!
//! ```text
//! get:  disk ──(miss/expired)──▶ memory ──(miss/expired)──▶ not found
//! put:  disk ──(quota)──▶ memory ──(quota)──▶ sweep expired ──▶ disk (once)
//! ```
//!
//! A record is valid while `now - timestamp < ttl`. Expired and corrupt
//! records are evicted lazily when read. A put that fails every tier is
//! not an error for the caller; the content is simply not cached.

pub mod disk;
pub mod memory;

pub use disk::DiskTier;
pub use memory::MemoryTier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prefix shared by every corpus cache key.
pub const KEY_PREFIX: &str = "corpus_";

#[derive(Debug, thiserror::Error)]
pub enum TierError {
    #[error("{tier} quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded {
        tier: String,
        needed: u64,
        available: u64,
    },

    #[error("{tier} storage error: {message}")]
    Io { tier: String, message: String },
}

/// A single key/value storage tier.
///
/// Values are opaque strings; expiry and record encoding are handled by
/// [`TieredCache`].
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Short name used in logs and size reports (e.g. `"disk"`).
    fn name(&self) -> &str;

    async fn get_raw(&self, key: &str) -> Result<Option<String>, TierError>;

    /// Store a value. Fails with [`TierError::QuotaExceeded`] when the tier is full.
    async fn set_raw(&self, key: &str, value: &str) -> Result<(), TierError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), TierError>;

    async fn keys(&self) -> Result<Vec<String>, TierError>;
}

/// Cached corpus content plus the URL it was fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub content: String,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
    pub url: String,
}

/// Current time in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// Storage key for a repository file: `corpus_<repoId>_<fileName>`.
pub fn storage_key(repo_id: &str, file_name: &str) -> String {
    format!("{}{}_{}", KEY_PREFIX, repo_id, file_name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierSize {
    pub tier: String,
    pub item_count: usize,
    pub bytes: u64,
}

/// Item and byte counts for `corpus_` keys across all tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SizeInfo {
    pub item_count: usize,
    pub total_bytes: u64,
    pub per_tier: Vec<TierSize>,
}

/// Ordered tiers sharing one TTL.
pub struct TieredCache {
    tiers: Vec<Box<dyn CacheTier>>,
    ttl_ms: i64,
    clock: Clock,
}

impl TieredCache {
    /// Tiers are tried in the given order on both read and write.
    pub fn new(tiers: Vec<Box<dyn CacheTier>>, ttl_ms: i64) -> Self {
        Self {
            tiers,
            ttl_ms,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn is_fresh(&self, record: &CacheRecord) -> bool {
        (self.clock)() - record.timestamp < self.ttl_ms
    }

    /// Return the first fresh record, evicting expired or corrupt ones on the way.
    pub async fn get(&self, key: &str) -> Option<CacheRecord> {
        for tier in &self.tiers {
            let raw = match tier.get_raw(key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(tier = tier.name(), key, error = %e, "cache read failed");
                    continue;
                }
            };

            match serde_json::from_str::<CacheRecord>(&raw) {
                Ok(record) if self.is_fresh(&record) => {
                    tracing::debug!(tier = tier.name(), key, "cache hit");
                    return Some(record);
                }
                Ok(_) => {
                    tracing::debug!(tier = tier.name(), key, "evicting expired record");
                    self.evict(tier.as_ref(), key).await;
                }
                Err(e) => {
                    tracing::debug!(tier = tier.name(), key, error = %e, "evicting corrupt record");
                    self.evict(tier.as_ref(), key).await;
                }
            }
        }
        None
    }

    /// Cache content under `key`. Returns whether any tier accepted it.
    pub async fn put(&self, key: &str, content: &str, url: &str) -> bool {
        let record = CacheRecord {
            content: content.to_string(),
            timestamp: (self.clock)(),
            url: url.to_string(),
        };
        let value = match serde_json::to_string(&record) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode cache record");
                return false;
            }
        };

        for (idx, tier) in self.tiers.iter().enumerate() {
            match tier.set_raw(key, &value).await {
                Ok(()) => {
                    self.drop_shadowed(idx, key).await;
                    return true;
                }
                Err(e) => {
                    tracing::debug!(tier = tier.name(), key, error = %e, "cache write rejected");
                }
            }
        }

        let Some(primary) = self.tiers.first() else {
            return false;
        };

        let swept = self.cleanup_expired().await;
        tracing::debug!(key, swept, "all tiers full; retrying primary after sweep");

        match primary.set_raw(key, &value).await {
            Ok(()) => {
                self.drop_shadowed(0, key).await;
                true
            }
            Err(e) => {
                tracing::debug!(key, error = %e, "content not cached");
                false
            }
        }
    }

    /// Remove every key starting with `prefix` from every tier.
    pub async fn clear(&self, prefix: &str) -> usize {
        let mut removed = 0;
        for tier in &self.tiers {
            let keys = match tier.keys().await {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::warn!(tier = tier.name(), error = %e, "failed to list cache keys");
                    continue;
                }
            };
            for key in keys.iter().filter(|k| k.starts_with(prefix)) {
                match tier.remove(key).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(tier = tier.name(), key = %key, error = %e, "failed to remove cache entry")
                    }
                }
            }
        }
        removed
    }

    /// Evict every expired or corrupt `corpus_` record in every tier.
    pub async fn cleanup_expired(&self) -> usize {
        let mut evicted = 0;
        for tier in &self.tiers {
            let Ok(keys) = tier.keys().await else {
                continue;
            };
            for key in keys.iter().filter(|k| k.starts_with(KEY_PREFIX)) {
                let stale = match tier.get_raw(key).await {
                    Ok(Some(raw)) => serde_json::from_str::<CacheRecord>(&raw)
                        .map(|r| !self.is_fresh(&r))
                        .unwrap_or(true),
                    _ => false,
                };
                if stale && tier.remove(key).await.is_ok() {
                    evicted += 1;
                }
            }
        }
        evicted
    }

    pub async fn size_info(&self) -> SizeInfo {
        let mut info = SizeInfo::default();
        for tier in &self.tiers {
            let mut size = TierSize {
                tier: tier.name().to_string(),
                ..Default::default()
            };
            if let Ok(keys) = tier.keys().await {
                for key in keys.iter().filter(|k| k.starts_with(KEY_PREFIX)) {
                    if let Ok(Some(raw)) = tier.get_raw(key).await {
                        size.item_count += 1;
                        size.bytes += (key.len() + raw.len()) as u64;
                    }
                }
            }
            info.item_count += size.item_count;
            info.total_bytes += size.bytes;
            info.per_tier.push(size);
        }
        info
    }

    async fn evict(&self, tier: &dyn CacheTier, key: &str) {
        if let Err(e) = tier.remove(key).await {
            tracing::warn!(tier = tier.name(), key, error = %e, "failed to evict cache entry");
        }
    }

    /// Remove copies of `key` in every tier other than `kept`, so a fresh
    /// write is never hidden behind an older record in a higher tier.
    async fn drop_shadowed(&self, kept: usize, key: &str) {
        for (idx, tier) in self.tiers.iter().enumerate() {
            if idx != kept {
                self.evict(tier.as_ref(), key).await;
            }
        }
    }
}
