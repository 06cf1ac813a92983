use super::{CorpusParser, ParseError};
use crate::matcher::TermMatcher;
use crate::models::{MatchRecord, ParseOptions};

/// Lines of context kept on each side of a matching line.
const CONTEXT_LINES: usize = 2;

/// Line-oriented parser: each non-blank line is one candidate unit.
pub struct PlainTextParser;

impl CorpusParser for PlainTextParser {
    fn name(&self) -> &str {
        "text"
    }

    fn search(
        &self,
        content: &str,
        terms: &[String],
        options: &ParseOptions,
    ) -> Result<Vec<MatchRecord>, ParseError> {
        let matcher = TermMatcher::new(terms, options.case_sensitive, options.match_all);
        let lines: Vec<&str> = content
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        let mut results = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if results.len() >= options.max_results {
                break;
            }
            if line.trim().is_empty() || !matcher.matches(line) {
                continue;
            }
            let Some(term) = matcher.first_match(line) else {
                continue;
            };

            let line_no = idx + 1;
            let mut record = options.record(
                format!("{}_line_{}", options.metadata.file_name, line_no),
                options.metadata.file_display.clone(),
                term,
                line_context(&lines, idx),
                line,
            );
            record.verse = Some(line_no.to_string());
            results.push(record);
        }

        Ok(results)
    }
}

fn line_context(lines: &[&str], idx: usize) -> String {
    let start = idx.saturating_sub(CONTEXT_LINES);
    let end = (idx + CONTEXT_LINES + 1).min(lines.len());
    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&lines[start..end].join(" "));
    if end < lines.len() {
        out.push_str("...");
    }
    out
}
