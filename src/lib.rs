//! # Corpus Search
//!
//! Fetch, cache, and search primary-source religious and mythological
//! text corpora hosted as raw files in remote repositories.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Batch loader │──▶│ Tiered cache │──▶│ HTTP fetcher │
//! │  (windows)   │   │ disk → memory│   │ retry+backoff│
//! └──────┬───────┘   └──────────────┘   └──────────────┘
//!        ▼
//! ┌──────────────┐   ┌──────────────────────────────┐
//! │ Loaded texts │──▶│ Orchestrator → parser registry│
//! │ (insertion   │   │ json │ xml/tei │ txt │ custom │
//! │   order)     │   └──────────────────────────────┘
//! └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! corpus repos
//! corpus search "Yggdrasil" --repo eddas
//! corpus search thunder --term zeus --term thunder --match-all
//! corpus cache info
//! corpus cache clear
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | JSON/TOML configuration and repository descriptors |
//! | [`cache`] | Two-tier cache with TTL and quota spill-over |
//! | [`fetch`] | Fetch-with-retry over HTTP |
//! | [`loader`] | Windowed batch loading |
//! | [`progress`] | Load observers (human, JSON, off) |
//! | [`engine`] | The engine façade |
//! | [`stats`] | Engine and cache reporting |
//! | [`error`] | Engine error taxonomy |

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod progress;
pub mod stats;
