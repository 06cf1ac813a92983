//! # Corpus Search CLI (`corpus`)
//!
//! ## Usage
//!
//! ```bash
//! corpus --config ./config/corpora.json <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `corpus repos` | List configured repositories and their files |
//! | `corpus search "<term>"` | Load repositories (cache first) and search them |
//! | `corpus cache info` | Show cached entries per tier |
//! | `corpus cache clear` | Remove every cached corpus entry |
//! | `corpus cache cleanup` | Remove expired cache entries |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (e.g. `RUST_LOG=corpus_search=debug`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use corpus_search::engine::CorpusEngine;
use corpus_search::progress::{FailureLog, ProgressMode};
use corpus_search::stats;
use corpus_search_core::models::MatchRecord;
use corpus_search_core::search::SearchOptions;

/// Corpus Search CLI: fetch, cache, and search primary-source text corpora.
#[derive(Parser)]
#[command(
    name = "corpus",
    about = "Corpus Search — fetch, cache, and search primary-source text corpora",
    version
)]
struct Cli {
    /// Path to the configuration file (`.json`, otherwise TOML).
    #[arg(long, global = true, default_value = "./config/corpora.json")]
    config: PathBuf,

    /// Load progress on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured repositories and their files.
    Repos,

    /// Load repositories and search their texts.
    ///
    /// Loads every file of the selected repositories (all repositories when
    /// none are given), reusing cached copies, then searches them in order.
    Search {
        /// The search term.
        term: String,

        /// Repository id to load; repeat for several. Defaults to all.
        #[arg(long = "repo")]
        repos: Vec<String>,

        /// Explicit search terms; repeat for several. Overrides `term`.
        #[arg(long = "term")]
        terms: Vec<String>,

        /// Require every term to match instead of any term.
        #[arg(long)]
        match_all: bool,

        #[arg(long)]
        case_sensitive: bool,

        /// Maximum number of results across all texts.
        #[arg(long, default_value_t = 100)]
        max_results: usize,

        /// Words of context on each side of a match.
        #[arg(long, default_value_t = 10)]
        context_words: usize,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Print engine stats after searching.
        #[arg(long)]
        stats: bool,
    },

    /// Inspect or clear the corpus cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts and sizes per tier.
    Info,
    /// Remove every cached corpus entry. Safe to repeat.
    Clear,
    /// Remove cache entries older than `cache_duration_minutes`.
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut engine = CorpusEngine::init(&cli.config)?;

    match cli.command {
        Commands::Repos => print_repos(&engine),
        Commands::Search {
            term,
            repos,
            terms,
            match_all,
            case_sensitive,
            max_results,
            context_words,
            json,
            stats: show_stats,
        } => {
            let repo_ids = if repos.is_empty() {
                engine.repositories().iter().map(|r| r.id.clone()).collect()
            } else {
                repos
            };

            let mode = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
            let reporter = mode.observer();
            let log = FailureLog::new(reporter.as_ref());
            engine.load_selected_repos(&repo_ids, &log).await?;

            let failures = log.into_failures();
            if !failures.is_empty() {
                eprintln!("Failed to load {} file(s):", failures.len());
                for f in &failures {
                    eprintln!("  {}: {}  ({})", f.repo_name, f.file_name, f.message);
                }
            }

            let options = SearchOptions {
                case_sensitive,
                max_results,
                context_words,
                match_all,
                terms,
            };
            let results = engine.search(&term, &options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
            if show_stats {
                stats::print_stats(&engine.stats());
            }
        }
        Commands::Cache { action } => match action {
            CacheAction::Info => {
                stats::print_cache_info(&engine.cache_info().await);
            }
            CacheAction::Clear => {
                let removed = engine.clear_cache().await;
                println!("Removed {} cached entr{}.", removed, plural_y(removed));
            }
            CacheAction::Cleanup => {
                let removed = engine.cleanup_expired().await;
                println!("Removed {} expired entr{}.", removed, plural_y(removed));
            }
        },
    }

    Ok(())
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

fn print_repos(engine: &CorpusEngine) {
    if engine.repositories().is_empty() {
        println!("No repositories configured.");
        return;
    }
    for repo in engine.repositories() {
        let category = repo
            .category
            .as_deref()
            .map(|c| format!("  [{}]", c))
            .unwrap_or_default();
        println!("{}  {}{}", repo.id, repo.display_name(), category);
        println!("  {}/{}@{}", repo.owner, repo.repo, repo.branch);
        for file in &repo.files {
            println!(
                "    {:<28} {:<6} {:<4} {}",
                file.name,
                file.format,
                file.language,
                file.display_name()
            );
        }
    }
}

fn print_results(results: &[MatchRecord]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{}] {} — {}  (matched \"{}\")",
            i + 1,
            r.corpus_name,
            r.translation,
            r.text_name,
            r.matched_term
        );
        println!("   {}", r.context);
        if let Some(url) = &r.url {
            println!("   {}", url);
        }
    }
    println!();
    println!("{} result(s).", results.len());
}
