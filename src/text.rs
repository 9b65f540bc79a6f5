//! Plain-text extraction from the document tree.
//!
//! Two related but distinct flavors survive from the message pipeline:
//! [`as_text`] collapses whitespace runs inside each text node and
//! concatenates the results directly, while [`text`] normalizes every
//! whitespace character to a space and inserts a single space at every
//! element boundary between text runs (optionally collapsing and trimming
//! the final string).

use crate::document::{Document, ElementKind, NodeId};

/// Raw text rendition: each text node has its internal whitespace runs
/// collapsed to single spaces, then all nodes concatenate without
/// separators.
pub(crate) fn as_text(doc: &Document) -> String {
    let mut out = String::new();
    for id in doc.iter_dfs() {
        if let ElementKind::Text(text) = &doc.node(id).kind {
            out.push_str(&collapse_whitespace(text));
        }
    }
    out
}

/// Normalized text rendition.
///
/// Every whitespace character becomes a plain space and adjacent text runs
/// are joined with a single space (marking the element boundary between
/// them). With `preserve` unset, whitespace runs in the joined result
/// collapse and the ends are trimmed.
pub(crate) fn text(doc: &Document, preserve: bool) -> String {
    let mut fragments = Vec::new();
    collect_fragments(doc, doc.root(), &mut fragments);
    let joined = fragments.join(" ");
    if preserve {
        joined
    } else {
        collapse_whitespace(&joined).trim().to_string()
    }
}

fn collect_fragments(doc: &Document, id: NodeId, out: &mut Vec<String>) {
    if let ElementKind::Text(text) = &doc.node(id).kind {
        out.push(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }).collect());
    }
    for &child in doc.children(id) {
        collect_fragments(doc, child, out);
    }
}

/// Collapse every whitespace run to a single space (no trimming).
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Format;

    fn sample() -> Document {
        // <span>\nfoo</span>bar<span>\n</span> baz<span>qux\n</span>
        let mut doc = Document::new(Format::MessageML, "2.0");
        let s1 = doc.append_node(doc.root(), ElementKind::Span);
        doc.append_node(s1, ElementKind::Text("\nfoo".to_string()));
        doc.append_node(doc.root(), ElementKind::Text("bar".to_string()));
        let s2 = doc.append_node(doc.root(), ElementKind::Span);
        doc.append_node(s2, ElementKind::Text("\n".to_string()));
        doc.append_node(doc.root(), ElementKind::Text(" baz".to_string()));
        let s3 = doc.append_node(doc.root(), ElementKind::Span);
        doc.append_node(s3, ElementKind::Text("qux\n".to_string()));
        doc
    }

    #[test]
    fn test_as_text_collapses_per_node() {
        assert_eq!(as_text(&sample()), " foobar  bazqux ");
    }

    #[test]
    fn test_text_preserving_whitespace() {
        assert_eq!(text(&sample(), true), " foo bar    baz qux ");
    }

    #[test]
    fn test_text_trimmed() {
        assert_eq!(text(&sample(), false), "foo bar baz qux");
    }
}
