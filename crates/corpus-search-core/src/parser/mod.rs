//! Format-specific corpus parsers and the typed parser registry.
//!
//! Every parser implements [`CorpusParser`]: it takes raw text content and
//! a set of search terms and returns the matching units as
//! [`MatchRecord`]s. Built-in and custom parsers are interchangeable; the
//! orchestrator does not distinguish between them.
//!
//! # Resolution order
//!
//! ```text
//! (repo_id, parser_type) ──▶ (*, parser_type) ──▶ built-in by format
//! ```
//!
//! | Format | Built-in |
//! |--------|----------|
//! | `json` | [`StructuredDocumentParser`] |
//! | `xml`, `tei` | [`MarkupParser`] |
//! | `txt`, `text` | [`PlainTextParser`] |
//! | anything else | [`StructuredDocumentParser`] |

mod markup;
mod plain;
mod structured;

pub use markup::MarkupParser;
pub use plain::PlainTextParser;
pub use structured::StructuredDocumentParser;

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{MatchRecord, ParseOptions};

/// Content could not be parsed in the parser's format.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON document: {0}")]
    Json(String),

    #[error("invalid markup at byte {position}: {message}")]
    Markup { position: u64, message: String },
}

/// A corpus parser: raw content plus terms in, match records out.
///
/// Implementations must stop producing records once
/// [`ParseOptions::max_results`] is reached.
pub trait CorpusParser: Send + Sync {
    /// Short identifier used in logs (e.g. `"json"`).
    fn name(&self) -> &str;

    fn search(
        &self,
        content: &str,
        terms: &[String],
        options: &ParseOptions,
    ) -> Result<Vec<MatchRecord>, ParseError>;
}

/// Registry key: an optional repository scope plus a parser type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParserKey {
    pub repo_id: Option<String>,
    pub format: String,
}

impl ParserKey {
    /// Parser applied to one repository only.
    pub fn scoped(repo_id: &str, format: &str) -> Self {
        Self {
            repo_id: Some(repo_id.to_string()),
            format: format.to_lowercase(),
        }
    }

    /// Parser applied to every repository.
    pub fn global(format: &str) -> Self {
        Self {
            repo_id: None,
            format: format.to_lowercase(),
        }
    }
}

/// Custom parsers layered over the three built-ins.
#[derive(Clone)]
pub struct ParserRegistry {
    custom: HashMap<ParserKey, Arc<dyn CorpusParser>>,
    structured: Arc<dyn CorpusParser>,
    markup: Arc<dyn CorpusParser>,
    plain: Arc<dyn CorpusParser>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            structured: Arc::new(StructuredDocumentParser),
            markup: Arc::new(MarkupParser),
            plain: Arc::new(PlainTextParser),
        }
    }

    /// Register a custom parser, replacing any parser under the same key.
    pub fn register(&mut self, key: ParserKey, parser: Arc<dyn CorpusParser>) {
        self.custom.insert(key, parser);
    }

    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    /// Resolve the parser for a text.
    ///
    /// `parser_type` is the file's explicit parser name, or its format when
    /// none is declared.
    pub fn resolve(&self, repo_id: &str, parser_type: &str, format: &str) -> Arc<dyn CorpusParser> {
        if let Some(p) = self.custom.get(&ParserKey::scoped(repo_id, parser_type)) {
            return Arc::clone(p);
        }
        if let Some(p) = self.custom.get(&ParserKey::global(parser_type)) {
            return Arc::clone(p);
        }
        self.builtin(format)
    }

    /// Built-in parser for a declared format.
    pub fn builtin(&self, format: &str) -> Arc<dyn CorpusParser> {
        match format.to_lowercase().as_str() {
            "xml" | "tei" => Arc::clone(&self.markup),
            "txt" | "text" => Arc::clone(&self.plain),
            _ => Arc::clone(&self.structured),
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
