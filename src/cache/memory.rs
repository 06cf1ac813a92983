//! Session-scoped [`CacheTier`] held in process memory.
//!
//! Lives as long as the owning engine. Capacity is a byte quota over
//! key + value lengths; writes beyond it fail with
//! [`TierError::QuotaExceeded`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{CacheTier, TierError};

struct MemoryState {
    entries: HashMap<String, String>,
    used: u64,
}

pub struct MemoryTier {
    name: String,
    quota_bytes: u64,
    state: Mutex<MemoryState>,
}

impl MemoryTier {
    pub fn new(name: &str, quota_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            quota_bytes,
            state: Mutex::new(MemoryState {
                entries: HashMap::new(),
                used: 0,
            }),
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.state.lock().used
    }
}

fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, TierError> {
        Ok(self.state.lock().entries.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<(), TierError> {
        let mut state = self.state.lock();
        let replaced = state
            .entries
            .get(key)
            .map(|old| entry_size(key, old))
            .unwrap_or(0);
        let needed = entry_size(key, value);
        let available = self.quota_bytes.saturating_sub(state.used - replaced);
        if needed > available {
            return Err(TierError::QuotaExceeded {
                tier: self.name.clone(),
                needed,
                available,
            });
        }
        state.used = state.used - replaced + needed;
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), TierError> {
        let mut state = self.state.lock();
        if let Some(old) = state.entries.remove(key) {
            state.used -= entry_size(key, &old);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, TierError> {
        Ok(self.state.lock().entries.keys().cloned().collect())
    }
}
