//! Markdown renderer and legacy entity extraction.
//!
//! The markdown string and the legacy `entities` JSON are produced in one
//! walk: entity positions are recorded as character offsets against the
//! string as it is emitted, so the two outputs can never drift apart.
//!
//! Block constructs (tables, forms, lists, rules) always begin at the start
//! of a line. Inline emphasis uses `**bold**` and `_italic_`; literal text
//! escapes the reserved set `- * _ +`.

use serde_json::{Map, Value, json};

use crate::document::{Document, ElementKind, NodeId};
use crate::markdown::escape::escape_markdown;

const FORM_LEAD: &str = "Form (log into desktop client to answer):";
const TABLE_LEAD: &str = "Table:";
const TABLE_SELECT_LEAD: &str = "Table Select:";
const DELIMITER: &str = "---";

/// Markdown output together with the legacy entity positions recorded while
/// emitting it.
pub(crate) struct Rendition {
    pub markdown: String,
    pub entities: Value,
}

pub(crate) fn render(doc: &Document) -> Rendition {
    let mut renderer = Renderer {
        doc,
        out: String::new(),
        chars: 0,
        hashtags: Vec::new(),
        user_mentions: Vec::new(),
        urls: Vec::new(),
    };
    renderer.render_children(doc.root());
    renderer.finish()
}

struct Renderer<'a> {
    doc: &'a Document,
    out: String,
    /// Running character count of `out`, kept incrementally so entity
    /// offsets never re-scan the buffer.
    chars: usize,
    hashtags: Vec<Value>,
    user_mentions: Vec<Value>,
    urls: Vec<Value>,
}

impl Renderer<'_> {
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
        self.chars += text.chars().count();
    }

    /// Ensure the next output begins on a fresh line. Block constructs call
    /// this so their lead tokens are never glued to preceding inline text,
    /// keeping the emitted string re-importable.
    fn fresh_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.push("\n");
        }
    }

    fn render_children(&mut self, id: NodeId) {
        for &child in self.doc.children(id) {
            self.render_node(child);
        }
    }

    fn render_node(&mut self, id: NodeId) {
        let node = self.doc.node(id);
        match &node.kind {
            ElementKind::MessageML | ElementKind::Span | ElementKind::Code => {
                self.render_children(id);
            }
            ElementKind::Text(text) => {
                let escaped = escape_markdown(text);
                self.push(&escaped);
            }

            ElementKind::Bold => {
                self.push("**");
                self.render_children(id);
                self.push("**");
            }
            ElementKind::Italic => {
                self.push("_");
                self.render_children(id);
                self.push("_");
            }

            ElementKind::LineBreak => self.push("\n"),
            ElementKind::HorizontalRule => {
                self.fresh_line();
                self.push(DELIMITER);
                self.push("\n");
            }
            ElementKind::Paragraph | ElementKind::Div | ElementKind::Preformatted => {
                self.fresh_line();
                self.render_children(id);
                self.push("\n");
            }
            ElementKind::Header(_) => {
                self.fresh_line();
                self.push("**");
                self.render_children(id);
                self.push("**\n");
            }

            ElementKind::Chime | ElementKind::Image => {}

            ElementKind::Link => {
                let href = node.attribute("href").unwrap_or("").to_string();
                let start = self.chars;
                self.push(&href);
                self.urls.push(json!({
                    "text": href,
                    "id": href,
                    "expandedUrl": href,
                    "indexStart": start,
                    "indexEnd": self.chars,
                    "type": "URL",
                }));
            }
            ElementKind::HashTag { value, .. } => self.render_keyword('#', value),
            ElementKind::CashTag { value, .. } => self.render_keyword('$', value),
            ElementKind::Mention { user, .. } => {
                let text = format!("@{}", user.pretty_name);
                let start = self.chars;
                self.push(&text);
                self.user_mentions.push(json!({
                    "id": user.id,
                    "screenName": user.screen_name,
                    "prettyName": user.pretty_name,
                    "text": text,
                    "indexStart": start,
                    "indexEnd": self.chars,
                    "userType": "lc",
                    "type": "USER_FOLLOW",
                }));
            }
            ElementKind::Emoji { shortcode, .. } => {
                let text = format!(":{shortcode}:");
                self.push(&text);
            }

            ElementKind::BulletList | ElementKind::OrderedList => self.render_children(id),
            ElementKind::ListItem => {
                let marker = match self.doc.parent_kind(id) {
                    Some(ElementKind::OrderedList) => {
                        format!("\n{}. ", self.item_position(id))
                    }
                    _ => "\n- ".to_string(),
                };
                self.push(&marker);
                self.render_children(id);
            }

            ElementKind::Table => {
                self.fresh_line();
                self.push(TABLE_LEAD);
                self.push("\n");
                self.push(DELIMITER);
                self.push("\n");
                self.render_children(id);
                self.push(DELIMITER);
                self.push("\n");
            }
            ElementKind::TableHeader
            | ElementKind::TableBody
            | ElementKind::TableFooter
            | ElementKind::TableSelectHeader
            | ElementKind::TableSelectBody => self.render_children(id),
            ElementKind::TableRow => {
                self.render_row_cells(id);
                self.push("\n");
            }
            ElementKind::TableHeaderCell | ElementKind::TableCell => self.render_children(id),

            ElementKind::Card | ElementKind::CardHeader | ElementKind::CardBody => {
                self.fresh_line();
                self.render_children(id);
                self.push("\n");
            }

            ElementKind::Form => {
                self.fresh_line();
                self.push(FORM_LEAD);
                self.push("\n");
                self.push(DELIMITER);
                self.push("\n");
                self.render_children(id);
                self.fresh_line();
                self.push(DELIMITER);
                self.push("\n");
            }
            ElementKind::Select => {
                let name = self.doc.node(id).attribute("name").unwrap_or("").to_string();
                self.push(&format!("(Dropdown:{name})"));
            }
            ElementKind::SelectOption => {}
            ElementKind::Button => {
                self.push("(Button:");
                self.render_children(id);
                self.push(")");
            }
            ElementKind::Checkbox => {
                self.push("(Checkbox:");
                self.render_children(id);
                self.push(")");
            }

            ElementKind::TableSelect => {
                self.fresh_line();
                self.push(TABLE_SELECT_LEAD);
                self.push("\n");
                self.push(DELIMITER);
                self.push("\n");
                self.render_children(id);
                self.fresh_line();
                self.push(DELIMITER);
                self.push("\n");
            }
            ElementKind::TableSelectRow { row, select } => {
                self.render_select_row(id, *row, *select);
            }
        }
    }

    fn render_keyword(&mut self, prefix: char, value: &str) {
        let text = format!("{prefix}{value}");
        let start = self.chars;
        self.push(&text);
        self.hashtags.push(json!({
            "id": text,
            "text": text,
            "indexStart": start,
            "indexEnd": self.chars,
            "type": "KEYWORD",
        }));
    }

    fn render_row_cells(&mut self, id: NodeId) {
        for (i, &cell) in self.doc.children(id).iter().enumerate() {
            if i > 0 {
                self.push(" | ");
            }
            self.render_children(cell);
        }
    }

    fn render_select_row(&mut self, id: NodeId, row: u64, select: NodeId) {
        let config = self.doc.node(select);
        let select_type = config.attribute("type").unwrap_or("").to_string();
        let position = config.attribute("position").unwrap_or("").to_string();
        let header_text = config.attribute("header-text").unwrap_or("").to_string();
        let button_text = config.attribute("button-text").unwrap_or("").to_string();

        let control = if select_type == "checkbox" {
            "(Checkbox)".to_string()
        } else if row == 0 {
            header_text
        } else {
            format!("(Button:{button_text})")
        };

        self.fresh_line();
        if position == "left" {
            self.push(&control);
            self.push(" | ");
        }
        self.render_row_cells(id);
        if position == "right" {
            self.push(" | ");
            self.push(&control);
        }
    }

    /// 1-based position of a list item among its `li` siblings.
    fn item_position(&self, id: NodeId) -> usize {
        let Some(parent) = self.doc.node(id).parent else {
            return 1;
        };
        self.doc
            .children(parent)
            .iter()
            .take_while(|&&sibling| sibling != id)
            .count()
            + 1
    }

    fn finish(self) -> Rendition {
        let mut entities = Map::new();
        if !self.hashtags.is_empty() {
            entities.insert("hashtags".to_string(), Value::Array(self.hashtags));
        }
        if !self.user_mentions.is_empty() {
            entities.insert("userMentions".to_string(), Value::Array(self.user_mentions));
        }
        if !self.urls.is_empty() {
            entities.insert("urls".to_string(), Value::Array(self.urls));
        }
        Rendition {
            markdown: self.out,
            entities: Value::Object(entities),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Format;
    use crate::provider::UserPresentation;

    #[test]
    fn test_inline_rendition_with_entities() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(doc.root(), ElementKind::Text("Hello ".to_string()));
        doc.append_node(
            doc.root(),
            ElementKind::HashTag {
                value: "world".to_string(),
                entity_id: "keyword1".to_string(),
            },
        );
        doc.append_node(doc.root(), ElementKind::Text("!".to_string()));

        let rendition = render(&doc);
        assert_eq!(rendition.markdown, "Hello #world!");
        assert_eq!(rendition.entities["hashtags"][0]["indexStart"], 6);
        assert_eq!(rendition.entities["hashtags"][0]["indexEnd"], 12);
        assert_eq!(rendition.entities["hashtags"][0]["type"], "KEYWORD");
        assert!(rendition.entities.get("urls").is_none());
    }

    #[test]
    fn test_table_starts_on_fresh_line() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(doc.root(), ElementKind::Text("Hello!".to_string()));
        let table = doc.append_node(doc.root(), ElementKind::Table);
        let row = doc.append_node(table, ElementKind::TableRow);
        for cell_text in ["A1", "B1"] {
            let cell = doc.append_node(row, ElementKind::TableCell);
            doc.append_node(cell, ElementKind::Text(cell_text.to_string()));
        }

        let rendition = render(&doc);
        assert_eq!(rendition.markdown, "Hello!\nTable:\n---\nA1 | B1\n---\n");
    }

    #[test]
    fn test_mention_offsets_in_chars() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(doc.root(), ElementKind::Text("½ ".to_string()));
        doc.append_node(
            doc.root(),
            ElementKind::Mention {
                user: UserPresentation::new(
                    123456789,
                    "bot.user1",
                    "Bot User01",
                    "bot.user1@localhost.com",
                ),
                entity_id: "mention1".to_string(),
            },
        );

        let rendition = render(&doc);
        assert_eq!(rendition.markdown, "½ @Bot User01");
        let mention = &rendition.entities["userMentions"][0];
        assert_eq!(mention["id"], 123456789);
        assert_eq!(mention["userType"], "lc");
        // Character offsets, not byte offsets.
        assert_eq!(mention["indexStart"], 2);
        assert_eq!(mention["indexEnd"], 13);
    }
}
