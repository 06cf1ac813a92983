//! Search orchestration across loaded texts.
//!
//! The orchestrator walks loaded texts in insertion order, resolves a
//! parser for each through the [`ParserRegistry`], and accumulates match
//! records until the overall result cap is reached.
//!
//! # Budgeting
//!
//! Each parser is invoked with the remaining budget
//! (`max_results - results_so_far`), so no single text can push the total
//! past the cap. Once the cap is hit no further texts are consulted.
//!
//! A parser failure (e.g. malformed markup) is logged and counts as zero
//! results for that text; it never aborts the search.

use crate::models::{MatchRecord, ParseOptions, SharedText};
use crate::parser::ParserRegistry;

/// Caller-facing search options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Cap on total results across all texts.
    pub max_results: usize,
    pub context_words: usize,
    pub match_all: bool,
    /// Explicit term list; when empty the query term is used alone.
    pub terms: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            max_results: 100,
            context_words: 10,
            match_all: false,
            terms: Vec::new(),
        }
    }
}

impl SearchOptions {
    /// The effective term list for a query: `terms` when given, else `[term]`.
    ///
    /// Blank terms are dropped, so an all-blank query yields an empty list.
    /// Other terms are kept verbatim, surrounding whitespace included.
    pub fn resolve_terms(&self, term: &str) -> Vec<String> {
        let source: Vec<String> = if self.terms.is_empty() {
            vec![term.to_string()]
        } else {
            self.terms.clone()
        };
        source
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect()
    }
}

/// Search every text with its resolved parser, up to `options.max_results`.
pub fn search_texts(
    texts: &[SharedText],
    registry: &ParserRegistry,
    terms: &[String],
    options: &SearchOptions,
) -> Vec<MatchRecord> {
    let mut results: Vec<MatchRecord> = Vec::new();

    for text in texts {
        if results.len() >= options.max_results {
            break;
        }

        let meta = &text.metadata;
        let parser = registry.resolve(&meta.repo_id, &meta.parser_type, &meta.format);
        let parse_options = ParseOptions {
            case_sensitive: options.case_sensitive,
            max_results: options.max_results - results.len(),
            context_words: options.context_words,
            match_all: options.match_all,
            corpus_name: meta.repo_name.clone(),
            metadata: meta.clone(),
        };

        match parser.search(&text.content, terms, &parse_options) {
            Ok(mut found) => {
                found.truncate(parse_options.max_results);
                tracing::debug!(
                    key = %text.key(),
                    parser = parser.name(),
                    hits = found.len(),
                    "searched text"
                );
                results.append(&mut found);
            }
            Err(e) => {
                tracing::warn!(
                    key = %text.key(),
                    parser = parser.name(),
                    error = %e,
                    "parser failed; treating as zero results"
                );
            }
        }
    }

    results
}
