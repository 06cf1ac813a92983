//! Term matching and context extraction shared by every parser.
//!
//! Matching is plain substring search after optional case folding. The
//! term reported for a unit is the first term (in caller order) found in
//! it, not the longest or best one.

/// Characters kept by the fallback context when no word contains the term.
const FALLBACK_CONTEXT_CHARS: usize = 200;

/// Pre-normalized search terms for one query.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    terms: Vec<String>,
    normalized: Vec<String>,
    case_sensitive: bool,
    match_all: bool,
}

impl TermMatcher {
    pub fn new(terms: &[String], case_sensitive: bool, match_all: bool) -> Self {
        let terms: Vec<String> = terms
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect();
        let normalized = terms
            .iter()
            .map(|t| normalize(t, case_sensitive))
            .collect();
        Self {
            terms,
            normalized,
            case_sensitive,
            match_all,
        }
    }

    /// Whether the text unit satisfies the query.
    ///
    /// An empty term list never matches.
    pub fn matches(&self, text: &str) -> bool {
        if self.normalized.is_empty() {
            return false;
        }
        let haystack = normalize(text, self.case_sensitive);
        if self.match_all {
            self.normalized.iter().all(|t| haystack.contains(t.as_str()))
        } else {
            self.normalized.iter().any(|t| haystack.contains(t.as_str()))
        }
    }

    /// The first term, in caller order, that occurs in the text.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let haystack = normalize(text, self.case_sensitive);
        self.normalized
            .iter()
            .position(|t| haystack.contains(t.as_str()))
            .map(|i| self.terms[i].as_str())
    }
}

fn normalize(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// Extract a window of `context_words` words either side of the first word
/// containing `term` (case-insensitive).
///
/// The window is prefixed/suffixed with `...` when clipped. Falls back to
/// the first 200 characters when no single word contains the term.
pub fn extract_context(text: &str, term: &str, context_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let needle = term.to_lowercase();

    let hit = if needle.is_empty() {
        None
    } else {
        words
            .iter()
            .position(|w| w.to_lowercase().contains(needle.as_str()))
    };

    match hit {
        Some(idx) => {
            let start = idx.saturating_sub(context_words);
            let end = idx
                .saturating_add(context_words)
                .saturating_add(1)
                .min(words.len());
            let mut out = String::new();
            if start > 0 {
                out.push_str("...");
            }
            out.push_str(&words[start..end].join(" "));
            if end < words.len() {
                out.push_str("...");
            }
            out
        }
        None => truncate_chars(text, FALLBACK_CONTEXT_CHARS),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
