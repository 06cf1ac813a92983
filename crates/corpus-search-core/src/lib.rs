//! # Corpus Search Core
//!
//! Pure logic for corpus search: match records, term matching and
//! context extraction, the parser contract with its three built-in
//! formats, the typed parser registry, and the search orchestrator.
//!
//! This crate performs no network, filesystem, or async I/O. Fetching,
//! caching, and batch loading live in the `corpus-search` crate.

pub mod matcher;
pub mod models;
pub mod parser;
pub mod search;
