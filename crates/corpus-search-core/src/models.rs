//! Core data models shared by the parsers and the search orchestrator.
//!
//! These types describe a loaded corpus text and the match records that
//! parsers produce from it. They carry no I/O and are cheap to clone.

use serde::Serialize;
use std::sync::Arc;

/// Descriptive metadata attached to every loaded text.
///
/// Copied into each [`MatchRecord`] so consumers can attribute a match
/// without a second lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextMetadata {
    pub repo_id: String,
    pub repo_name: String,
    pub file_name: String,
    pub file_display: String,
    pub language: String,
    pub format: String,
    pub description: String,
    /// Parser type used for dispatch: the file's explicit parser, else its format.
    pub parser_type: String,
    /// Resolved remote URL the content was fetched from.
    pub url: String,
}

/// An immutable snapshot of fetched corpus content.
#[derive(Debug, Clone)]
pub struct LoadedText {
    pub content: String,
    pub metadata: TextMetadata,
}

impl LoadedText {
    /// Key under which the text is stored: `"<repoId>:<fileName>"`.
    pub fn key(&self) -> String {
        text_key(&self.metadata.repo_id, &self.metadata.file_name)
    }
}

/// Build the loaded-text key for a repository/file pair.
pub fn text_key(repo_id: &str, file_name: &str) -> String {
    format!("{}:{}", repo_id, file_name)
}

/// One search hit inside a corpus text.
///
/// `book` and `chapter` are only set by the structured-document parser.
/// `verse` carries the verse key (structured documents) or the line number
/// (plain text); markup units leave it unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub corpus_name: String,
    pub text_id: String,
    pub text_name: String,
    pub matched_term: String,
    pub context: String,
    pub full_verse: String,
    pub book: Option<String>,
    pub chapter: Option<String>,
    pub verse: Option<String>,
    pub language: String,
    pub translation: String,
    pub metadata: TextMetadata,
    pub url: Option<String>,
}

/// Options passed to a single parser invocation.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub case_sensitive: bool,
    /// Remaining result budget for this text.
    pub max_results: usize,
    /// Words of context on either side of the match.
    pub context_words: usize,
    /// Require every term to match instead of any term.
    pub match_all: bool,
    pub corpus_name: String,
    pub metadata: TextMetadata,
}

impl ParseOptions {
    /// Options with default tuning for the given text.
    pub fn for_text(metadata: &TextMetadata) -> Self {
        Self {
            case_sensitive: false,
            max_results: 100,
            context_words: 10,
            match_all: false,
            corpus_name: metadata.repo_name.clone(),
            metadata: metadata.clone(),
        }
    }

    /// Start a match record pre-filled with the fields every parser shares.
    pub(crate) fn record(
        &self,
        text_id: String,
        text_name: String,
        matched_term: &str,
        context: String,
        full_verse: &str,
    ) -> MatchRecord {
        MatchRecord {
            corpus_name: self.corpus_name.clone(),
            text_id,
            text_name,
            matched_term: matched_term.to_string(),
            context,
            full_verse: full_verse.to_string(),
            book: None,
            chapter: None,
            verse: None,
            language: self.metadata.language.clone(),
            translation: self.metadata.file_display.clone(),
            metadata: self.metadata.clone(),
            url: None,
        }
    }
}

/// Shared handle to a loaded text; loaded texts are never mutated.
pub type SharedText = Arc<LoadedText>;
