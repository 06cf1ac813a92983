use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{CorpusParser, ParseError};
use crate::matcher::{extract_context, TermMatcher};
use crate::models::{MatchRecord, ParseOptions};

/// Elements treated as candidate text units (local names, prefix ignored).
const UNIT_ELEMENTS: &[&[u8]] = &[b"p", b"l", b"ab", b"seg", b"verse", b"line"];

/// Attributes that identify a location in the document, in priority order.
const IDENT_ATTRS: &[&[u8]] = &[b"n", b"xml:id", b"id"];

/// Parser for XML and TEI documents.
///
/// Streams the document with quick-xml, keeping a stack of open elements
/// so each unit can be labelled from its nearest identified ancestor.
pub struct MarkupParser;

struct Frame {
    name: String,
    ident: Option<String>,
    /// Collected descendant text; `Some` only for unit elements.
    text: Option<String>,
    index: usize,
}

impl CorpusParser for MarkupParser {
    fn name(&self) -> &str {
        "markup"
    }

    fn search(
        &self,
        content: &str,
        terms: &[String],
        options: &ParseOptions,
    ) -> Result<Vec<MatchRecord>, ParseError> {
        let matcher = TermMatcher::new(terms, options.case_sensitive, options.match_all);
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Frame> = Vec::new();
        let mut results = Vec::new();
        let mut unit_count = 0usize;

        if options.max_results == 0 {
            return Ok(results);
        }

        loop {
            let event = reader.read_event().map_err(|e| ParseError::Markup {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;

            match event {
                Event::Start(e) => {
                    let frame = open_frame(&e, &mut unit_count).map_err(|message| {
                        ParseError::Markup {
                            position: reader.buffer_position() as u64,
                            message,
                        }
                    })?;
                    stack.push(frame);
                }
                Event::Empty(e) => {
                    // Self-closing units carry no text but still take an index.
                    if is_unit(e.local_name().as_ref()) {
                        unit_count += 1;
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| ParseError::Markup {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    append_text(&mut stack, &text);
                }
                Event::CData(c) => {
                    let bytes: &[u8] = &c;
                    append_text(&mut stack, &String::from_utf8_lossy(bytes));
                }
                Event::End(_) => {
                    let Some(frame) = stack.pop() else {
                        continue;
                    };
                    if let Some(record) = evaluate(&frame, &stack, &matcher, options) {
                        results.push(record);
                        if results.len() >= options.max_results {
                            return Ok(results);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::Markup {
                position: reader.buffer_position() as u64,
                message: format!("unclosed element <{}>", open.name),
            });
        }

        Ok(results)
    }
}

fn is_unit(local_name: &[u8]) -> bool {
    UNIT_ELEMENTS.iter().any(|u| *u == local_name)
}

fn open_frame(e: &BytesStart<'_>, unit_count: &mut usize) -> Result<Frame, String> {
    let local = e.local_name();
    let name = String::from_utf8_lossy(local.as_ref()).into_owned();

    let mut ident: Option<(usize, String)> = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = attr.key.as_ref();
        let Some(rank) = IDENT_ATTRS.iter().position(|k| *k == key) else {
            continue;
        };
        let value = attr
            .unescape_value()
            .map_err(|err| err.to_string())?
            .into_owned();
        if ident.as_ref().map_or(true, |(r, _)| rank < *r) {
            ident = Some((rank, value));
        }
    }

    let (text, index) = if is_unit(local.as_ref()) {
        let idx = *unit_count;
        *unit_count += 1;
        (Some(String::new()), idx)
    } else {
        (None, 0)
    };

    Ok(Frame {
        name,
        ident: ident.map(|(_, v)| v),
        text,
        index,
    })
}

fn append_text(stack: &mut [Frame], text: &str) {
    for frame in stack.iter_mut() {
        if let Some(buf) = frame.text.as_mut() {
            buf.push_str(text);
        }
    }
}

fn evaluate(
    frame: &Frame,
    ancestors: &[Frame],
    matcher: &TermMatcher,
    options: &ParseOptions,
) -> Option<MatchRecord> {
    let raw = frame.text.as_ref()?;
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() || !matcher.matches(&text) {
        return None;
    }
    let term = matcher.first_match(&text)?;

    let mut record = options.record(
        format!("{}_node_{}", options.metadata.file_name, frame.index),
        location_label(frame, ancestors)
            .unwrap_or_else(|| options.metadata.file_display.clone()),
        term,
        extract_context(&text, term, options.context_words),
        &text,
    );
    if !options.metadata.url.is_empty() {
        record.url = Some(options.metadata.url.clone());
    }
    Some(record)
}

/// Nearest element, starting at the unit itself, that carries an identifying attribute.
fn location_label(frame: &Frame, ancestors: &[Frame]) -> Option<String> {
    std::iter::once(frame)
        .chain(ancestors.iter().rev())
        .find_map(|f| f.ident.as_ref().map(|id| format!("{} {}", f.name, id)))
}
