//! PresentationML renderer.
//!
//! A small streaming XML writer plus an exhaustive per-kind walk. The output
//! is canonical: attributes print in stored order, elements without children
//! self-close, and text escapes `& < > "` (apostrophes pass through).

use crate::document::{Document, ElementKind, NodeId};

const CHIME_URI: &str = "https://asset.symphony.com/symphony/audio/chime.mp3";

/// Render the whole document as a PresentationML string.
pub(crate) fn render(doc: &Document) -> String {
    let mut out = XmlWriter::new();
    out.open(
        "div",
        &[
            ("data-format", "PresentationML"),
            ("data-version", doc.version()),
        ],
    );
    for &child in doc.children(doc.root()) {
        render_node(doc, child, &mut out);
    }
    out.close("div");
    out.finish()
}

fn render_node(doc: &Document, id: NodeId, out: &mut XmlWriter) {
    let node = doc.node(id);
    match &node.kind {
        ElementKind::MessageML => {}
        ElementKind::Text(text) => out.text(text),

        ElementKind::Chime => {
            out.empty("audio", &[("src", CHIME_URI), ("autoplay", "true")]);
        }

        ElementKind::HashTag { value, entity_id } => {
            render_entity_span(out, entity_id, &format!("#{value}"));
        }
        ElementKind::CashTag { value, entity_id } => {
            render_entity_span(out, entity_id, &format!("${value}"));
        }
        ElementKind::Mention { user, entity_id } => {
            render_entity_span(out, entity_id, &format!("@{}", user.pretty_name));
        }
        ElementKind::Emoji {
            shortcode,
            entity_id,
        } => {
            render_entity_span(out, entity_id, &format!(":{shortcode}:"));
        }

        ElementKind::Card => render_card_div(doc, id, out, "card"),
        ElementKind::CardHeader => render_card_div(doc, id, out, "cardHeader"),
        ElementKind::CardBody => render_card_div(doc, id, out, "cardBody"),

        ElementKind::TableSelect => {
            // Selection configuration is consumed by the row expansion; the
            // container prints as a plain table.
            out.open("table", &[]);
            render_children(doc, id, out);
            out.close("table");
        }
        ElementKind::TableSelectHeader => render_plain(doc, id, out, "thead"),
        ElementKind::TableSelectBody => render_plain(doc, id, out, "tbody"),
        ElementKind::TableSelectRow { row, select } => {
            render_select_row(doc, id, out, *row, *select);
        }

        ElementKind::Checkbox => render_checkbox(doc, id, out),

        ElementKind::Link => {
            let attrs: Vec<(&str, &str)> = node
                .attributes()
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            out.open("a", &attrs);
            if node.children.is_empty() {
                // A bare link displays its own address.
                out.text(node.attribute("href").unwrap_or(""));
            } else {
                render_children(doc, id, out);
            }
            out.close("a");
        }

        kind => render_plain(doc, id, out, kind.tag()),
    }
}

fn render_children(doc: &Document, id: NodeId, out: &mut XmlWriter) {
    for &child in doc.children(id) {
        render_node(doc, child, out);
    }
}

/// Default shape: same tag, stored attributes, children between the tags.
fn render_plain(doc: &Document, id: NodeId, out: &mut XmlWriter, tag: &str) {
    let node = doc.node(id);
    let attrs: Vec<(&str, &str)> = node
        .attributes()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if node.children.is_empty() {
        out.empty(tag, &attrs);
    } else {
        out.open(tag, &attrs);
        render_children(doc, id, out);
        out.close(tag);
    }
}

fn render_entity_span(out: &mut XmlWriter, entity_id: &str, text: &str) {
    out.open(
        "span",
        &[("class", "entity"), ("data-entity-id", entity_id)],
    );
    out.text(text);
    out.close("span");
}

/// Cards and their parts print as `div`s with the marker class re-joined
/// ahead of any preserved class tokens, and the MessageML card attributes
/// mapped back to their data-prefixed forms.
fn render_card_div(doc: &Document, id: NodeId, out: &mut XmlWriter, marker: &str) {
    let node = doc.node(id);
    let class = match node.attribute("class") {
        Some(extra) if !extra.is_empty() => format!("{marker} {extra}"),
        _ => marker.to_string(),
    };
    let mut attrs: Vec<(&str, &str)> = vec![("class", class.as_str())];
    if let Some(icon) = node.attribute("iconSrc") {
        attrs.push(("data-icon", icon));
    }
    if let Some(accent) = node.attribute("accent") {
        attrs.push(("data-accent-color", accent));
    }
    out.open("div", &attrs);
    render_children(doc, id, out);
    out.close("div");
}

/// Expand a tableselect row into a concrete `tr`, injecting the selection
/// cell left or right of the original cells per the owning select.
fn render_select_row(doc: &Document, id: NodeId, out: &mut XmlWriter, row: u64, select: NodeId) {
    let config = doc.node(select);
    let name = config.attribute("name").unwrap_or("");
    let select_type = config.attribute("type").unwrap_or("");
    let position = config.attribute("position").unwrap_or("");
    let header_text = config.attribute("header-text").unwrap_or("");
    let suffix = if row == 0 {
        "header".to_string()
    } else {
        format!("row{row}")
    };

    out.open("tr", &[]);
    if position == "left" {
        render_select_cell(out, select_type, name, &suffix, header_text);
    }
    render_children(doc, id, out);
    if position == "right" {
        render_select_cell(out, select_type, name, &suffix, header_text);
    }
    out.close("tr");
}

fn render_select_cell(
    out: &mut XmlWriter,
    select_type: &str,
    name: &str,
    suffix: &str,
    header_text: &str,
) {
    let control_name = format!("{name}-{suffix}");
    match select_type {
        "checkbox" => {
            out.open("td", &[]);
            out.empty("input", &[("type", "checkbox"), ("name", &control_name)]);
            out.close("td");
        }
        _ => {
            // Button type: the header cell is a plain label, body cells get
            // the named button.
            out.open("td", &[]);
            if suffix == "header" {
                out.text(header_text);
            } else {
                out.empty("button", &[("name", &control_name)]);
            }
            out.close("td");
        }
    }
}

fn render_checkbox(doc: &Document, id: NodeId, out: &mut XmlWriter) {
    let node = doc.node(id);
    let mut attrs: Vec<(&str, &str)> = vec![("type", "checkbox")];
    for key in ["name", "value", "checked"] {
        if let Some(value) = node.attribute(key) {
            attrs.push((key, value));
        }
    }
    out.open("div", &[("class", "checkbox")]);
    out.empty("input", &attrs);
    if !node.children.is_empty() {
        out.open("label", &[]);
        render_children(doc, id, out);
        out.close("label");
    }
    out.close("div");
}

/// Minimal streaming XML writer.
struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.start_tag(tag, attrs);
        self.buf.push('>');
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.start_tag(tag, attrs);
        self.buf.push_str("/>");
    }

    fn close(&mut self, tag: &str) {
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
    }

    fn text(&mut self, text: &str) {
        self.buf.push_str(&escape_xml(text));
    }

    fn finish(self) -> String {
        self.buf
    }

    fn start_tag(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.buf.push('<');
        self.buf.push_str(tag);
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape_xml(value));
            self.buf.push('"');
        }
    }
}

/// Escape the XML-reserved characters. Apostrophes stay literal because all
/// attribute values print double-quoted.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Format;

    #[test]
    fn test_escape_xml_leaves_apostrophe() {
        assert_eq!(
            escape_xml("<b>it's \"fine\" & done</b>"),
            "&lt;b&gt;it's &quot;fine&quot; &amp; done&lt;/b&gt;"
        );
    }

    #[test]
    fn test_root_wrapper() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        let p = doc.append_node(doc.root(), ElementKind::Paragraph);
        doc.append_node(p, ElementKind::Text("Hello!".to_string()));
        assert_eq!(
            render(&doc),
            "<div data-format=\"PresentationML\" data-version=\"2.0\"><p>Hello!</p></div>"
        );
    }

    #[test]
    fn test_entity_span() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(
            doc.root(),
            ElementKind::HashTag {
                value: "world".to_string(),
                entity_id: "keyword1".to_string(),
            },
        );
        assert_eq!(
            render(&doc),
            "<div data-format=\"PresentationML\" data-version=\"2.0\">\
             <span class=\"entity\" data-entity-id=\"keyword1\">#world</span></div>"
        );
    }

    #[test]
    fn test_chime_audio_element() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(doc.root(), ElementKind::Chime);
        assert_eq!(
            render(&doc),
            "<div data-format=\"PresentationML\" data-version=\"2.0\">\
             <audio src=\"https://asset.symphony.com/symphony/audio/chime.mp3\" \
             autoplay=\"true\"/></div>"
        );
    }
}
