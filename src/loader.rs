//! Windowed batch loading of repository files.
//!
//! Workflow:
//! 1. Resolve every `(repository, file)` pair of the selected repositories.
//! 2. Split the tasks into windows of at most `max_concurrent_fetches`.
//! 3. Run each window concurrently through the cache-then-fetch path and
//!    wait for the whole window to settle before starting the next.
//! 4. Hand each window's successes to the caller in task order.
//!
//! A failed task is reported to the observer and never aborts its siblings
//! or later windows.

use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};

use corpus_search_core::models::{LoadedText, TextMetadata};

use crate::cache::{storage_key, TieredCache};
use crate::config::{Config, FileDescriptor, RepositoryDescriptor};
use crate::fetch::{FetchError, TextFetcher};
use crate::progress::{LoadFailure, LoadObserver, LoadProgress};

/// One file to load.
#[derive(Debug, Clone, Copy)]
pub struct LoadTask<'a> {
    pub repo: &'a RepositoryDescriptor,
    pub file: &'a FileDescriptor,
}

/// Counters shared across concurrent tasks.
#[derive(Debug, Default)]
pub struct LoadCounters {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub fetch_failures: AtomicU64,
}

/// Every file of every selected repository, in selection then file order.
///
/// Unknown repository ids are ignored; an id listed twice is loaded once.
pub fn resolve_tasks<'a>(config: &'a Config, repo_ids: &[String]) -> Vec<LoadTask<'a>> {
    let mut tasks = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for id in repo_ids {
        let Some(repo) = config.find_repository(id) else {
            tracing::warn!(repo = %id, "unknown repository id; skipping");
            continue;
        };
        if seen.contains(&repo.id.as_str()) {
            continue;
        }
        seen.push(&repo.id);
        tasks.extend(repo.files.iter().map(|file| LoadTask { repo, file }));
    }
    tasks
}

pub struct BatchLoader<'a> {
    pub config: &'a Config,
    pub cache: &'a TieredCache,
    pub fetcher: &'a dyn TextFetcher,
    pub counters: &'a LoadCounters,
}

impl BatchLoader<'_> {
    /// Load `tasks` window by window, passing each window's successes to
    /// `on_loaded` in task order. Returns the number of successes.
    pub async fn run(
        &self,
        tasks: &[LoadTask<'_>],
        observer: &dyn LoadObserver,
        mut on_loaded: impl FnMut(LoadedText),
    ) -> usize {
        let window_size = self.config.max_concurrent_fetches.max(1);
        let total = tasks.len();
        let mut loaded = 0;

        for (window_idx, window) in tasks.chunks(window_size).enumerate() {
            let offset = window_idx * window_size;
            let outcomes = join_all(
                window
                    .iter()
                    .enumerate()
                    .map(|(i, task)| self.load_one(*task, offset + i + 1, total, observer)),
            )
            .await;

            for (task, outcome) in window.iter().zip(outcomes) {
                match outcome {
                    Ok(text) => {
                        loaded += 1;
                        on_loaded(text);
                    }
                    Err(e) => {
                        self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            repo = %task.repo.id,
                            file = %task.file.name,
                            error = %e,
                            "failed to load corpus file"
                        );
                        observer.on_error(&LoadFailure {
                            repo_name: task.repo.display_name().to_string(),
                            file_name: task.file.name.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        loaded
    }

    async fn load_one(
        &self,
        task: LoadTask<'_>,
        n: usize,
        total: usize,
        observer: &dyn LoadObserver,
    ) -> Result<LoadedText, FetchError> {
        let LoadTask { repo, file } = task;
        observer.on_progress(&LoadProgress {
            n,
            total,
            repo_name: repo.display_name().to_string(),
            file_display: file.display_name().to_string(),
        });

        let key = storage_key(&repo.id, &file.name);
        let url = repo.file_url(&self.config.api_settings.raw_base_url, &file.name);

        let content = match self.cache.get(&key).await {
            Some(record) if record.url == url => {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                record.content
            }
            cached => {
                if cached.is_some() {
                    tracing::debug!(key = %key, url = %url, "cached URL differs from configured URL; refetching");
                }
                self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
                let content = self.fetcher.fetch_text(&url).await?;
                self.cache.put(&key, &content, &url).await;
                content
            }
        };

        Ok(LoadedText {
            content,
            metadata: text_metadata(repo, file, url),
        })
    }
}

fn text_metadata(repo: &RepositoryDescriptor, file: &FileDescriptor, url: String) -> TextMetadata {
    TextMetadata {
        repo_id: repo.id.clone(),
        repo_name: repo.display_name().to_string(),
        file_name: file.name.clone(),
        file_display: file.display_name().to_string(),
        language: file.language.clone(),
        format: file.format.clone(),
        description: file.description.clone(),
        parser_type: file.parser_type().to_string(),
        url,
    }
}
