//! Legacy markdown importer.
//!
//! The legacy format is a message string plus offset-addressed entity
//! annotations, not CommonMark: `**bold**`, `*italic*`/`_italic_`, backslash
//! escapes for `- * _ +`, `- `/`N. ` list lines, `Table:`/`---` fenced pipe
//! tables, and bare newlines as line breaks. Raw tags and `#` headings stay
//! literal text.
//!
//! Annotated spans are validated against the message and spliced out as
//! private-use placeholder tokens before any tokenization, so their content
//! never participates in markdown parsing.

use serde_json::Value;

use crate::document::{Document, ElementKind, Format, NodeId};
use crate::error::{Error, Result};
use crate::parser::DEFAULT_VERSION;
use crate::provider::DataProvider;

const TABLE_LEAD: &str = "Table:";
const DELIMITER: &str = "---";

// Placeholder frame for spliced entity spans.
const SPLICE_OPEN: char = '\u{E000}';
const SPLICE_CLOSE: char = '\u{E001}';

/// Import a legacy message into a document tree.
pub(crate) fn import(
    text: &str,
    entities: Option<&Value>,
    provider: &dyn DataProvider,
) -> Result<Document> {
    let mut doc = Document::new(Format::MessageML, DEFAULT_VERSION);
    if text.is_empty() {
        return Ok(doc);
    }

    // NBSP normalizes to a plain space without disturbing offsets.
    let normalized: String = text
        .chars()
        .map(|c| if c == '\u{A0}' { ' ' } else { c })
        .collect();

    let annotations = collect_annotations(&normalized, entities)?;
    let spliced = splice(&normalized, &annotations);

    let mut importer = Importer {
        annotations: &annotations,
        provider,
        index: 0,
    };
    importer.parse_blocks(&mut doc, &spliced)?;
    Ok(doc)
}

/// One validated entity annotation.
struct Annotation {
    kind: AnnotationKind,
    start: usize,
    end: usize,
    /// Expected surface text of the span.
    text: String,
    /// Payload id, used in error messages.
    id: String,
}

enum AnnotationKind {
    Keyword,
    Mention(i64),
    Url { expanded: String },
    /// Unrecognized annotation types keep their surface text.
    Literal,
}

fn collect_annotations(message: &str, entities: Option<&Value>) -> Result<Vec<Annotation>> {
    let mut annotations = Vec::new();
    let Some(Value::Object(groups)) = entities else {
        return Ok(annotations);
    };

    let chars: Vec<char> = message.chars().collect();
    for group in groups.values() {
        let Value::Array(records) = group else {
            continue;
        };
        for record in records {
            annotations.push(parse_annotation(record, &chars)?);
        }
    }

    annotations.sort_by_key(|a| a.start);
    for pair in annotations.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(invalid_payload(&pair[1]));
        }
    }
    Ok(annotations)
}

fn parse_annotation(record: &Value, chars: &[char]) -> Result<Annotation> {
    let id = record
        .get("id")
        .ok_or_else(|| required_field("id"))?;
    let id_text = match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let entity_type = record
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| required_field("type"))?;

    let start = record
        .get("indexStart")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let end = record
        .get("indexEnd")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let expected = record
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| id_text.clone());

    let kind = match entity_type {
        "KEYWORD" => {
            if expected.starts_with('#') || expected.starts_with('$') {
                AnnotationKind::Keyword
            } else {
                AnnotationKind::Literal
            }
        }
        "USER_FOLLOW" => {
            let user_id = id
                .as_i64()
                .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| {
                    Error::InvalidInput(format!("Invalid user id \"{id_text}\""))
                })?;
            AnnotationKind::Mention(user_id)
        }
        "URL" => AnnotationKind::Url {
            expanded: record
                .get("expandedUrl")
                .and_then(Value::as_str)
                .unwrap_or(&id_text)
                .to_string(),
        },
        _ => AnnotationKind::Literal,
    };

    let annotation = Annotation {
        kind,
        start,
        end,
        text: expected,
        id: id_text.clone(),
    };

    // The span must address exactly the expected surface text.
    let valid = start <= end
        && end <= chars.len()
        && chars[start..end].iter().collect::<String>() == annotation.text;
    if !valid {
        return Err(invalid_payload_for(&id_text, start, end));
    }
    Ok(annotation)
}

fn required_field(field: &str) -> Error {
    Error::InvalidInput(format!(
        "Required field \"{field}\" missing from the entity payload"
    ))
}

fn invalid_payload(annotation: &Annotation) -> Error {
    invalid_payload_for(&annotation.id, annotation.start, annotation.end)
}

fn invalid_payload_for(id: &str, start: usize, end: usize) -> Error {
    Error::InvalidInput(format!(
        "Invalid entity payload: {id} (start index: {start}, end index: {end})"
    ))
}

/// Replace every annotated span with a framed ordinal so the markdown
/// tokenizer never sees entity content.
fn splice(message: &str, annotations: &[Annotation]) -> String {
    let chars: Vec<char> = message.chars().collect();
    let mut out = String::with_capacity(message.len());
    let mut pos = 0;
    for (ordinal, annotation) in annotations.iter().enumerate() {
        out.extend(&chars[pos..annotation.start]);
        out.push(SPLICE_OPEN);
        out.push_str(&ordinal.to_string());
        out.push(SPLICE_CLOSE);
        pos = annotation.end;
    }
    out.extend(&chars[pos..]);
    out
}

struct Importer<'a> {
    annotations: &'a [Annotation],
    provider: &'a dyn DataProvider,
    /// Shared 1-based index for generated entity ids, in document order.
    index: u32,
}

impl Importer<'_> {
    fn parse_blocks(&mut self, doc: &mut Document, spliced: &str) -> Result<()> {
        let root = doc.root();
        let lines: Vec<&str> = spliced.split('\n').collect();
        let mut i = 0;
        // Whether the previous construct leaves the output mid-line, so a
        // following newline is content (a line break) rather than block
        // formatting.
        let mut pending_break = false;

        while i < lines.len() {
            let line = lines[i];

            if line == TABLE_LEAD && lines.get(i + 1) == Some(&DELIMITER) {
                i = self.parse_table(doc, root, &lines, i + 2)?;
                pending_break = false;
                continue;
            }
            if line == DELIMITER {
                doc.append_node(root, ElementKind::HorizontalRule);
                i += 1;
                pending_break = false;
                continue;
            }
            if line.starts_with("- ") {
                let list = doc.append_node(root, ElementKind::BulletList);
                while i < lines.len() && lines[i].starts_with("- ") {
                    let item = doc.append_node(list, ElementKind::ListItem);
                    self.parse_inline(doc, item, &lines[i][2..])?;
                    i += 1;
                }
                // Lists don't own a trailing newline.
                pending_break = true;
                continue;
            }
            if let Some(content) = ordered_item_content(line) {
                let list = doc.append_node(root, ElementKind::OrderedList);
                let mut content = Some(content);
                while let Some(text) = content {
                    let item = doc.append_node(list, ElementKind::ListItem);
                    self.parse_inline(doc, item, text)?;
                    i += 1;
                    content = lines.get(i).and_then(|l| ordered_item_content(l));
                }
                pending_break = true;
                continue;
            }

            if pending_break {
                doc.append_node(root, ElementKind::LineBreak);
            }
            self.parse_inline(doc, root, line)?;
            pending_break = true;
            i += 1;
        }
        Ok(())
    }

    /// Parse fenced table rows starting at `from`; returns the index after
    /// the closing fence.
    fn parse_table(
        &mut self,
        doc: &mut Document,
        parent: NodeId,
        lines: &[&str],
        from: usize,
    ) -> Result<usize> {
        let table = doc.append_node(parent, ElementKind::Table);
        let mut i = from;
        while i < lines.len() && lines[i] != DELIMITER {
            let row = doc.append_node(table, ElementKind::TableRow);
            for cell_text in lines[i].split(" | ") {
                let cell = doc.append_node(row, ElementKind::TableCell);
                self.parse_inline(doc, cell, cell_text)?;
            }
            i += 1;
        }
        // Skip the closing fence if present.
        Ok(if i < lines.len() { i + 1 } else { i })
    }

    fn parse_inline(&mut self, doc: &mut Document, parent: NodeId, text: &str) -> Result<()> {
        let chars: Vec<char> = text.chars().collect();
        let mut buf = String::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '\\' if i + 1 < chars.len() && is_reserved(chars[i + 1]) => {
                    buf.push(chars[i + 1]);
                    i += 2;
                }
                SPLICE_OPEN => {
                    flush_text(doc, parent, &mut buf);
                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == SPLICE_CLOSE)
                        .map(|p| i + p)
                        .ok_or_else(|| {
                            Error::Processing(
                                "Internal error processing entity placeholders".to_string(),
                            )
                        })?;
                    let ordinal: usize = chars[i + 1..close]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .map_err(|_| {
                            Error::Processing(
                                "Internal error processing entity placeholders".to_string(),
                            )
                        })?;
                    self.build_annotation(doc, parent, ordinal)?;
                    i = close + 1;
                }
                '*' if chars.get(i + 1) == Some(&'*') => {
                    match find_delimiter(&chars, i + 2, "**") {
                        Some(close) => {
                            flush_text(doc, parent, &mut buf);
                            let node = doc.append_node(parent, ElementKind::Bold);
                            let inner: String = chars[i + 2..close].iter().collect();
                            self.parse_inline(doc, node, &inner)?;
                            i = close + 2;
                        }
                        None => {
                            buf.push('*');
                            i += 1;
                        }
                    }
                }
                c @ ('*' | '_') => match find_delimiter(&chars, i + 1, &c.to_string()) {
                    Some(close) => {
                        flush_text(doc, parent, &mut buf);
                        let node = doc.append_node(parent, ElementKind::Italic);
                        let inner: String = chars[i + 1..close].iter().collect();
                        self.parse_inline(doc, node, &inner)?;
                        i = close + 1;
                    }
                    None => {
                        buf.push(c);
                        i += 1;
                    }
                },
                c => {
                    buf.push(c);
                    i += 1;
                }
            }
        }
        flush_text(doc, parent, &mut buf);
        Ok(())
    }

    fn build_annotation(
        &mut self,
        doc: &mut Document,
        parent: NodeId,
        ordinal: usize,
    ) -> Result<()> {
        let annotation = self.annotations.get(ordinal).ok_or_else(|| {
            Error::Processing("Internal error processing entity placeholders".to_string())
        })?;
        match &annotation.kind {
            AnnotationKind::Keyword => {
                self.index += 1;
                let value = annotation.text[1..].to_string();
                let kind = if annotation.text.starts_with('#') {
                    ElementKind::HashTag {
                        value,
                        entity_id: format!("keyword{}", self.index),
                    }
                } else {
                    ElementKind::CashTag {
                        value,
                        entity_id: format!("keyword{}", self.index),
                    }
                };
                doc.append_node(parent, kind);
            }
            AnnotationKind::Mention(user_id) => {
                self.index += 1;
                let user = self.provider.user_presentation(*user_id)?;
                doc.append_node(
                    parent,
                    ElementKind::Mention {
                        user,
                        entity_id: format!("mention{}", self.index),
                    },
                );
            }
            AnnotationKind::Url { expanded } => {
                let link = doc.append_node(parent, ElementKind::Link);
                doc.node_mut(link).set_attribute("href", expanded);
            }
            AnnotationKind::Literal => {
                doc.append_node(parent, ElementKind::Text(annotation.text.clone()));
            }
        }
        Ok(())
    }
}

fn is_reserved(c: char) -> bool {
    matches!(c, '-' | '*' | '_' | '+')
}

fn flush_text(doc: &mut Document, parent: NodeId, buf: &mut String) {
    if !buf.is_empty() {
        doc.append_node(parent, ElementKind::Text(std::mem::take(buf)));
    }
}

/// Find the next unescaped occurrence of `delim` at or after `from`.
fn find_delimiter(chars: &[char], from: usize, delim: &str) -> Option<usize> {
    let pattern: Vec<char> = delim.chars().collect();
    let mut i = from;
    while i + pattern.len() <= chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i..i + pattern.len()] == pattern[..] {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Content of an `N. ` ordered-list line, if it is one.
fn ordered_item_content(line: &str) -> Option<&str> {
    let dot = line.find(". ")?;
    if dot == 0 || !line[..dot].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(&line[dot + 2..])
}
