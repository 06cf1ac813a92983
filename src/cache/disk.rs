//! Persistent [`CacheTier`] backed by a directory of files.
//!
//! Each key is stored in its own file named by the hex encoding of the
//! key, so keys can be listed back without a separate index. Keys too long
//! for a portable file name are stored under `sha256-<digest>` instead,
//! with the key itself on the first line of the file. Writes go to a
//! temporary file first and are renamed into place.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{CacheTier, TierError};

const TMP_SUFFIX: &str = ".tmp";
const HASHED_PREFIX: &str = "sha256-";
/// Longest hex file name used as-is; most filesystems stop at 255 bytes.
const MAX_HEX_NAME: usize = 200;

pub struct DiskTier {
    dir: PathBuf,
    quota_bytes: u64,
    /// Held across the quota check and the write.
    write_lock: Mutex<()>,
}

/// Where a key lives on disk.
struct Slot {
    path: PathBuf,
    hashed: bool,
}

impl DiskTier {
    pub fn new(dir: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes,
            write_lock: Mutex::new(()),
        }
    }

    fn slot(&self, key: &str) -> Slot {
        let name = hex::encode(key.as_bytes());
        if name.len() <= MAX_HEX_NAME {
            return Slot {
                path: self.dir.join(name),
                hashed: false,
            };
        }
        let digest = Sha256::digest(key.as_bytes());
        Slot {
            path: self.dir.join(format!("{}{}", HASHED_PREFIX, hex::encode(digest))),
            hashed: true,
        }
    }

    fn io_err(&self, e: std::io::Error) -> TierError {
        TierError::Io {
            tier: self.name().to_string(),
            message: format!("{}: {}", self.dir.display(), e),
        }
    }

    /// Bytes used by every stored entry except `exclude`.
    async fn used_bytes(&self, exclude: &Path) -> Result<u64, TierError> {
        let mut total = 0;
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(self.io_err(e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.io_err(e))? {
            if entry.path() == exclude {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }

    async fn read(&self, path: &Path) -> Result<Option<String>, TierError> {
        match tokio::fs::read_to_string(path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

#[async_trait]
impl CacheTier for DiskTier {
    fn name(&self) -> &str {
        "disk"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, TierError> {
        let slot = self.slot(key);
        let Some(body) = self.read(&slot.path).await? else {
            return Ok(None);
        };
        if !slot.hashed {
            return Ok(Some(body));
        }
        Ok(match body.split_once('\n') {
            Some((stored, value)) if stored == key => Some(value.to_string()),
            _ => None,
        })
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<(), TierError> {
        let slot = self.slot(key);
        let body = if slot.hashed {
            format!("{}\n{}", key, value)
        } else {
            value.to_string()
        };

        let _guard = self.write_lock.lock().await;
        let needed = body.len() as u64;
        let available = self
            .quota_bytes
            .saturating_sub(self.used_bytes(&slot.path).await?);
        if needed > available {
            return Err(TierError::QuotaExceeded {
                tier: self.name().to_string(),
                needed,
                available,
            });
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.io_err(e))?;
        let mut tmp = slot.path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.io_err(e))?;
        tokio::fs::rename(&tmp, &slot.path)
            .await
            .map_err(|e| self.io_err(e))
    }

    async fn remove(&self, key: &str) -> Result<(), TierError> {
        match tokio::fs::remove_file(self.slot(key).path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, TierError> {
        let mut keys = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(self.io_err(e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.io_err(e))? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.ends_with(TMP_SUFFIX) {
                continue;
            }
            if name.starts_with(HASHED_PREFIX) {
                if let Ok(Some(body)) = self.read(&entry.path()).await {
                    if let Some((key, _)) = body.split_once('\n') {
                        keys.push(key.to_string());
                    }
                }
                continue;
            }
            // Foreign files do not decode as keys.
            let Ok(bytes) = hex::decode(name) else {
                continue;
            };
            if let Ok(key) = String::from_utf8(bytes) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stores_and_lists_keys() {
        let tmp = TempDir::new().unwrap();
        let tier = DiskTier::new(tmp.path().join("cache"), 1 << 20);

        assert!(tier.keys().await.unwrap().is_empty());
        assert!(tier.get_raw("corpus_a_b.json").await.unwrap().is_none());

        tier.set_raw("corpus_a_b.json", "{}").await.unwrap();
        tier.set_raw("corpus_a_c d.txt", "[]").await.unwrap();
        std::fs::write(tmp.path().join("cache").join("README"), "not a key").unwrap();

        assert_eq!(
            tier.keys().await.unwrap(),
            vec!["corpus_a_b.json".to_string(), "corpus_a_c d.txt".to_string()]
        );
        assert_eq!(
            tier.get_raw("corpus_a_c d.txt").await.unwrap().as_deref(),
            Some("[]")
        );

        tier.remove("corpus_a_b.json").await.unwrap();
        tier.remove("corpus_a_b.json").await.unwrap();
        assert_eq!(tier.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enforces_quota_excluding_overwritten_entry() {
        let tmp = TempDir::new().unwrap();
        let tier = DiskTier::new(tmp.path(), 16);

        tier.set_raw("k1", "0123456789").await.unwrap();
        tier.set_raw("k1", "0123456789abcdef").await.unwrap();

        let err = tier.set_raw("k2", "x").await.unwrap_err();
        assert!(matches!(err, TierError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn concurrent_writes_share_one_quota() {
        let tmp = TempDir::new().unwrap();
        let tier = DiskTier::new(tmp.path(), 100);
        let value = "v".repeat(60);
        let keys: Vec<String> = (0..5).map(|i| format!("corpus_r_{}.txt", i)).collect();

        let outcomes =
            futures::future::join_all(keys.iter().map(|k| tier.set_raw(k, &value))).await;

        let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(accepted, 1);
        assert!(outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .all(|e| matches!(e, TierError::QuotaExceeded { .. })));

        let on_disk: u64 = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().metadata().unwrap().len())
            .sum();
        assert!(on_disk <= 100, "{} bytes on disk", on_disk);
    }

    #[tokio::test]
    async fn long_keys_are_hashed_and_listed() {
        let tmp = TempDir::new().unwrap();
        let tier = DiskTier::new(tmp.path(), 1 << 20);
        let long_key = format!("corpus_archive_{}.xml", "papyrus-".repeat(30));

        tier.set_raw(&long_key, "hieratic").await.unwrap();
        tier.set_raw("corpus_a_short.txt", "demotic").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| n.len() <= 255));
        assert!(names.iter().any(|n| n.starts_with(HASHED_PREFIX)));

        assert_eq!(
            tier.get_raw(&long_key).await.unwrap().as_deref(),
            Some("hieratic")
        );
        let mut expected = vec![long_key.clone(), "corpus_a_short.txt".to_string()];
        expected.sort();
        assert_eq!(tier.keys().await.unwrap(), expected);

        tier.remove(&long_key).await.unwrap();
        assert!(tier.get_raw(&long_key).await.unwrap().is_none());
        assert_eq!(tier.keys().await.unwrap(), vec!["corpus_a_short.txt".to_string()]);
    }
}
