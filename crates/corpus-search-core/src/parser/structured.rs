use serde_json::Value;

use super::{CorpusParser, ParseError};
use crate::matcher::{extract_context, TermMatcher};
use crate::models::{MatchRecord, ParseOptions};

/// Parser for `book → chapter → verse → text` JSON documents.
///
/// Object order is preserved, so results follow document order. Levels
/// that are not objects and leaves that are not strings are skipped.
pub struct StructuredDocumentParser;

impl CorpusParser for StructuredDocumentParser {
    fn name(&self) -> &str {
        "json"
    }

    fn search(
        &self,
        content: &str,
        terms: &[String],
        options: &ParseOptions,
    ) -> Result<Vec<MatchRecord>, ParseError> {
        let doc: Value =
            serde_json::from_str(content).map_err(|e| ParseError::Json(e.to_string()))?;
        let matcher = TermMatcher::new(terms, options.case_sensitive, options.match_all);
        let mut results = Vec::new();

        if options.max_results == 0 {
            return Ok(results);
        }

        let Some(books) = doc.as_object() else {
            return Ok(results);
        };

        for (book, chapters) in books {
            let Some(chapters) = chapters.as_object() else {
                continue;
            };
            for (chapter, verses) in chapters {
                let Some(verses) = verses.as_object() else {
                    continue;
                };
                for (verse, text) in verses {
                    let Some(text) = text.as_str() else {
                        continue;
                    };
                    if !matcher.matches(text) {
                        continue;
                    }
                    let Some(term) = matcher.first_match(text) else {
                        continue;
                    };

                    let mut record = options.record(
                        format!("{}.{}.{}", book, chapter, verse),
                        format!("{} {}:{}", book, chapter, verse),
                        term,
                        extract_context(text, term, options.context_words),
                        text,
                    );
                    record.book = Some(book.clone());
                    record.chapter = Some(chapter.clone());
                    record.verse = Some(verse.clone());
                    record.url = Some(lookup_url(&options.metadata.url, book, chapter, verse));
                    results.push(record);

                    if results.len() >= options.max_results {
                        return Ok(results);
                    }
                }
            }
        }

        Ok(results)
    }
}

fn lookup_url(source_url: &str, book: &str, chapter: &str, verse: &str) -> String {
    format!(
        "{}#{}.{}.{}",
        source_url,
        book.replace(' ', "%20"),
        chapter,
        verse
    )
}
