//! The corpus engine: one explicit instance owning config, cache, fetcher,
//! parser registry, and the loaded texts.
//!
//! Collaborators receive the engine by reference; there is no global
//! state. Loading needs `&mut self`, so a load and a search never overlap
//! on the same engine.
//!
//! # Example
//!
//! ```rust,no_run
//! # use corpus_search::engine::CorpusEngine;
//! # use corpus_search::progress::NoProgress;
//! # use corpus_search_core::search::SearchOptions;
//! # async fn example() -> anyhow::Result<()> {
//! let mut engine = CorpusEngine::init("config/corpora.json".as_ref())?;
//! engine.load_selected_repos(&["eddas".to_string()], &NoProgress).await?;
//! let hits = engine.search("Yggdrasil", &SearchOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use corpus_search_core::models::{LoadedText, MatchRecord, SharedText};
use corpus_search_core::parser::{CorpusParser, ParserKey, ParserRegistry};
use corpus_search_core::search::{search_texts, SearchOptions};

use crate::cache::{DiskTier, MemoryTier, SizeInfo, TieredCache, KEY_PREFIX};
use crate::config::{load_config, Config, RepositoryDescriptor};
use crate::error::{EngineError, Result};
use crate::fetch::{FetchOptions, HttpFetcher, TextFetcher};
use crate::loader::{resolve_tasks, BatchLoader, LoadCounters};
use crate::progress::LoadObserver;
use crate::stats::EngineStats;

const MB: u64 = 1024 * 1024;

pub struct CorpusEngine {
    config: Config,
    cache: TieredCache,
    fetcher: Arc<dyn TextFetcher>,
    parsers: ParserRegistry,
    texts: Vec<SharedText>,
    index: HashMap<String, usize>,
    counters: LoadCounters,
}

impl CorpusEngine {
    /// Build an engine from explicit parts.
    pub fn new(config: Config, cache: TieredCache, fetcher: Arc<dyn TextFetcher>) -> Self {
        Self {
            config,
            cache,
            fetcher,
            parsers: ParserRegistry::new(),
            texts: Vec::new(),
            index: HashMap::new(),
            counters: LoadCounters::default(),
        }
    }

    /// Load configuration from `path` and build the default stack:
    /// disk + memory cache tiers and an HTTP fetcher.
    pub fn init(path: &Path) -> Result<Self> {
        let config = load_config(path).map_err(|e| EngineError::Config(format!("{:#}", e)))?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let cache = default_cache(&config);
        let fetcher = HttpFetcher::new(FetchOptions::from_config(&config))
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(Self::new(config, cache, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repositories(&self) -> &[RepositoryDescriptor] {
        &self.config.repositories
    }

    /// Register a custom parser; see [`ParserRegistry::resolve`] for lookup order.
    pub fn register_parser(&mut self, key: ParserKey, parser: Arc<dyn CorpusParser>) {
        self.parsers.register(key, parser);
    }

    /// Load every file of the given repositories, cache first.
    ///
    /// Returns the number of files loaded. Per-file failures go to
    /// `observer.on_error`; `observer.on_complete` fires once at the end.
    pub async fn load_selected_repos(
        &mut self,
        repo_ids: &[String],
        observer: &dyn LoadObserver,
    ) -> Result<usize> {
        let tasks = resolve_tasks(&self.config, repo_ids);
        if tasks.is_empty() {
            return Err(EngineError::NoSelection);
        }

        let loader = BatchLoader {
            config: &self.config,
            cache: &self.cache,
            fetcher: self.fetcher.as_ref(),
            counters: &self.counters,
        };
        let texts = &mut self.texts;
        let index = &mut self.index;
        let loaded = loader
            .run(&tasks, observer, |text| insert_text(texts, index, text))
            .await;

        let keys = self.loaded_keys();
        tracing::info!(loaded, total = tasks.len(), "batch load complete");
        observer.on_complete(loaded, &keys);
        Ok(loaded)
    }

    /// Search all loaded texts.
    ///
    /// The scan runs on a blocking thread over shared snapshots of the
    /// loaded texts, so large documents do not stall the async runtime.
    pub async fn search(&self, term: &str, options: &SearchOptions) -> Result<Vec<MatchRecord>> {
        if self.texts.is_empty() {
            return Err(EngineError::NoTextsLoaded);
        }
        let terms = options.resolve_terms(term);
        if terms.is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        let texts = self.texts.clone();
        let parsers = self.parsers.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || search_texts(&texts, &parsers, &terms, &options))
            .await
            .map_err(|e| EngineError::Internal(format!("search task failed: {}", e)))
    }

    /// Remove every cached corpus entry from every tier and drop all loaded texts.
    ///
    /// Safe to call repeatedly. Returns the number of cache entries removed.
    pub async fn clear_cache(&mut self) -> usize {
        self.texts.clear();
        self.index.clear();
        self.cache.clear(KEY_PREFIX).await
    }

    /// Sweep expired cache entries from every tier.
    pub async fn cleanup_expired(&self) -> usize {
        self.cache.cleanup_expired().await
    }

    pub async fn cache_info(&self) -> SizeInfo {
        self.cache.size_info().await
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            repositories: self.config.repositories.len(),
            total_files: self.config.repositories.iter().map(|r| r.files.len()).sum(),
            loaded_texts: self.texts.len(),
            loaded_bytes: self.texts.iter().map(|t| t.content.len() as u64).sum(),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            fetch_failures: self.counters.fetch_failures.load(Ordering::Relaxed),
        }
    }

    /// Loaded-text keys (`"<repoId>:<fileName>"`) in insertion order.
    pub fn loaded_keys(&self) -> Vec<String> {
        self.texts.iter().map(|t| t.key()).collect()
    }

    pub fn loaded_text(&self, key: &str) -> Option<&LoadedText> {
        self.index.get(key).map(|&i| self.texts[i].as_ref())
    }
}

/// Insert or replace a loaded text, keeping a replaced key's original position.
fn insert_text(texts: &mut Vec<SharedText>, index: &mut HashMap<String, usize>, text: LoadedText) {
    let key = text.key();
    let text = Arc::new(text);
    match index.get(&key) {
        Some(&i) => texts[i] = text,
        None => {
            index.insert(key, texts.len());
            texts.push(text);
        }
    }
}

fn default_cache(config: &Config) -> TieredCache {
    let dir = config
        .cache
        .dir
        .clone()
        .unwrap_or_else(|| ".corpus-cache".into());
    TieredCache::new(
        vec![
            Box::new(DiskTier::new(dir, config.cache.persistent_quota_mb * MB)),
            Box::new(MemoryTier::new(
                "session",
                config.cache.session_quota_mb * MB,
            )),
        ],
        config.cache_ttl_ms(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_search_core::models::TextMetadata;

    fn text(repo: &str, file: &str, content: &str) -> LoadedText {
        LoadedText {
            content: content.to_string(),
            metadata: TextMetadata {
                repo_id: repo.to_string(),
                file_name: file.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn reinsert_keeps_position_and_replaces_content() {
        let mut texts = Vec::new();
        let mut index = HashMap::new();
        insert_text(&mut texts, &mut index, text("a", "1", "first"));
        insert_text(&mut texts, &mut index, text("b", "2", "second"));
        insert_text(&mut texts, &mut index, text("a", "1", "updated"));

        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].content, "updated");
        assert_eq!(texts[1].key(), "b:2");
        assert_eq!(index.get("a:1"), Some(&0));
    }
}
