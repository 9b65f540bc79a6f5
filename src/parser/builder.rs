//! Tree builder: turns raw XML elements into typed document nodes.
//!
//! Dispatch is mostly 1:1 on the tag name, with three polymorphic cases:
//! `div`/`span` switch on reserved `class` tokens (entity marker, card
//! markers), `thead`/`tbody`/`tr` switch on the already-built parent's kind,
//! and MessageML shorthand tags are rejected when the input is already in
//! PresentationML form.

use serde_json::Value;

use crate::document::{Document, ElementKind, Format, NodeId};
use crate::error::{Error, Result};
use crate::parser::xml::{XmlElement, XmlNode};
use crate::provider::DataProvider;

/// Marker class token routing a `div`/`span` to entity resolution.
pub(crate) const ENTITY_CLASS: &str = "entity";
const CARD_CLASS: &str = "card";
const CARD_HEADER_CLASS: &str = "cardHeader";
const CARD_BODY_CLASS: &str = "cardBody";

/// Per-parse mutable state, created fresh for every parse invocation.
///
/// The running entity index and the row counter of the currently open
/// `tableselect` live here so that concurrent parses can never observe each
/// other's counters.
pub(crate) struct ParseContext<'a> {
    format: Format,
    provider: &'a dyn DataProvider,
    entity_json: &'a Value,
    /// Shared 1-based index for hashtag/cashtag/mention/emoji occurrences.
    index: u32,
    /// 1-based row number within the currently open `tableselect` body.
    row_number: u64,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(
        format: Format,
        provider: &'a dyn DataProvider,
        entity_json: &'a Value,
    ) -> Self {
        Self {
            format,
            provider,
            entity_json,
            index: 0,
            row_number: 0,
        }
    }

    fn next_index(&mut self) -> u32 {
        self.index += 1;
        self.index
    }

    /// MessageML shorthand tags are illegal when importing PresentationML.
    fn require_message_ml(&self, tag: &str) -> Result<()> {
        if self.format == Format::PresentationML {
            return Err(Error::InvalidInput(format!(
                "Shorthand tag \"{tag}\" is not allowed in PresentationML"
            )));
        }
        Ok(())
    }
}

/// Build all children of `xml` under the already-built `parent` node.
pub(crate) fn build_children(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
) -> Result<()> {
    for child in &xml.children {
        match child {
            XmlNode::Text(text) => {
                doc.append_node(parent, ElementKind::Text(text.clone()));
            }
            XmlNode::Element(element) => {
                build_element(doc, ctx, parent, element)?;
            }
        }
    }
    Ok(())
}

/// Build one element (and recursively its subtree).
pub(crate) fn build_element(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
) -> Result<NodeId> {
    let tag = xml.name.as_str();

    if let Some(level) = header_level(tag) {
        return simple(doc, ctx, parent, xml, ElementKind::Header(level), &["class"]);
    }

    let class = xml.attribute("class").unwrap_or("");

    match tag {
        "chime" => {
            ctx.require_message_ml(tag)?;
            build_chime(doc, ctx, parent, xml)
        }
        "audio" => build_chime(doc, ctx, parent, xml),

        "p" => simple(doc, ctx, parent, xml, ElementKind::Paragraph, &["class"]),
        "br" => simple(doc, ctx, parent, xml, ElementKind::LineBreak, &[]),
        "hr" => simple(doc, ctx, parent, xml, ElementKind::HorizontalRule, &[]),
        "b" => simple(doc, ctx, parent, xml, ElementKind::Bold, &["class"]),
        "i" => simple(doc, ctx, parent, xml, ElementKind::Italic, &["class"]),
        "pre" => simple(doc, ctx, parent, xml, ElementKind::Preformatted, &["class"]),
        "code" => simple(doc, ctx, parent, xml, ElementKind::Code, &["class"]),
        "a" => simple(doc, ctx, parent, xml, ElementKind::Link, &["href", "class"]),
        "img" => simple(doc, ctx, parent, xml, ElementKind::Image, &["src", "class"]),
        "ul" => simple(doc, ctx, parent, xml, ElementKind::BulletList, &["class"]),
        "ol" => simple(doc, ctx, parent, xml, ElementKind::OrderedList, &["class"]),
        "li" => simple(doc, ctx, parent, xml, ElementKind::ListItem, &["class"]),

        "span" => {
            if has_class_token(class, ENTITY_CLASS) {
                build_entity(doc, ctx, parent, xml)
            } else {
                simple(doc, ctx, parent, xml, ElementKind::Span, &["class"])
            }
        }
        "div" => build_div(doc, ctx, parent, xml, class),

        "table" => simple(doc, ctx, parent, xml, ElementKind::Table, &["class"]),
        "thead" => {
            let kind = if doc.node(parent).kind == ElementKind::TableSelect {
                ElementKind::TableSelectHeader
            } else {
                ElementKind::TableHeader
            };
            simple(doc, ctx, parent, xml, kind, &["class"])
        }
        "tbody" => {
            let kind = if doc.node(parent).kind == ElementKind::TableSelect {
                ElementKind::TableSelectBody
            } else {
                ElementKind::TableBody
            };
            simple(doc, ctx, parent, xml, kind, &["class"])
        }
        "tfoot" => simple(doc, ctx, parent, xml, ElementKind::TableFooter, &["class"]),
        "tr" => build_table_row(doc, ctx, parent, xml),
        "th" => simple(doc, ctx, parent, xml, ElementKind::TableHeaderCell, &["class"]),
        "td" => simple(doc, ctx, parent, xml, ElementKind::TableCell, &["class"]),

        "card" => {
            ctx.require_message_ml(tag)?;
            simple(
                doc,
                ctx,
                parent,
                xml,
                ElementKind::Card,
                &["class", "iconSrc", "accent"],
            )
        }
        "header" => {
            ctx.require_message_ml(tag)?;
            simple(doc, ctx, parent, xml, ElementKind::CardHeader, &["class"])
        }
        "body" => {
            ctx.require_message_ml(tag)?;
            simple(doc, ctx, parent, xml, ElementKind::CardBody, &["class"])
        }

        "hash" => {
            ctx.require_message_ml(tag)?;
            let index = ctx.next_index();
            let kind = ElementKind::HashTag {
                value: xml.attribute("tag").unwrap_or("").to_string(),
                entity_id: format!("keyword{index}"),
            };
            simple(doc, ctx, parent, xml, kind, &["tag"])
        }
        "cash" => {
            ctx.require_message_ml(tag)?;
            let index = ctx.next_index();
            let kind = ElementKind::CashTag {
                value: xml.attribute("tag").unwrap_or("").to_string(),
                entity_id: format!("keyword{index}"),
            };
            simple(doc, ctx, parent, xml, kind, &["tag"])
        }
        "mention" => {
            ctx.require_message_ml(tag)?;
            let index = ctx.next_index();
            let uid = xml.attribute("uid").ok_or_else(|| {
                Error::InvalidInput("The attribute \"uid\" is required".to_string())
            })?;
            let user_id: i64 = uid.parse().map_err(|_| {
                Error::InvalidInput(format!("Invalid user id \"{uid}\""))
            })?;
            let user = ctx.provider.user_presentation(user_id)?;
            let kind = ElementKind::Mention {
                user,
                entity_id: format!("mention{index}"),
            };
            simple(doc, ctx, parent, xml, kind, &["uid"])
        }
        "emoji" => {
            let index = ctx.next_index();
            let kind = ElementKind::Emoji {
                shortcode: xml.attribute("shortcode").unwrap_or("").to_string(),
                entity_id: format!("emoji{index}"),
            };
            simple(doc, ctx, parent, xml, kind, &["shortcode", "annotation"])
        }

        "form" => simple(doc, ctx, parent, xml, ElementKind::Form, &["id", "class"]),
        "select" => simple(doc, ctx, parent, xml, ElementKind::Select, &["name"]),
        "option" => simple(doc, ctx, parent, xml, ElementKind::SelectOption, &["value"]),
        "button" => build_button(doc, ctx, parent, xml),
        "checkbox" => simple(
            doc,
            ctx,
            parent,
            xml,
            ElementKind::Checkbox,
            &["name", "value", "checked"],
        ),
        "tableselect" => {
            // Opening a tableselect resets the row counter for its body.
            ctx.row_number = 0;
            let id = doc.append_node(parent, ElementKind::TableSelect);
            doc.node_mut(id).set_attribute("header-text", "Select");
            doc.node_mut(id).set_attribute("button-text", "SELECT");
            copy_attributes(
                doc,
                id,
                xml,
                &["name", "type", "header-text", "button-text", "position"],
            )?;
            build_children(doc, ctx, id, xml)?;
            Ok(id)
        }

        _ => Err(Error::InvalidInput(format!(
            "Invalid MessageML content at element \"{tag}\""
        ))),
    }
}

fn build_chime(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
) -> Result<NodeId> {
    // The PresentationML <audio> attributes (src, autoplay) are fixed output
    // markers and are regenerated at render time, never stored.
    let id = doc.append_node(parent, ElementKind::Chime);
    build_children(doc, ctx, id, xml)?;
    Ok(id)
}

fn build_div(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
    class: &str,
) -> Result<NodeId> {
    if has_class_token(class, ENTITY_CLASS) {
        return build_entity(doc, ctx, parent, xml);
    }

    // Card markers route the div to the card kinds; the marker token is
    // stripped from the class, preserving any other tokens.
    for (marker, kind) in [
        (CARD_CLASS, ElementKind::Card),
        (CARD_HEADER_CLASS, ElementKind::CardHeader),
        (CARD_BODY_CLASS, ElementKind::CardBody),
    ] {
        if has_class_token(class, marker) {
            let mut stripped = xml.clone();
            remove_class_token(&mut stripped, marker);
            if kind == ElementKind::Card {
                normalize_card_attributes(&mut stripped);
                return simple(
                    doc,
                    ctx,
                    parent,
                    &stripped,
                    kind,
                    &["class", "iconSrc", "accent"],
                );
            }
            return simple(doc, ctx, parent, &stripped, kind, &["class"]);
        }
    }

    simple(doc, ctx, parent, xml, ElementKind::Div, &["class", "data-entity-id"])
}

/// `tr` is polymorphic on the already-built parent: inside a tableselect
/// header or body it becomes a select-row bound to the owning tableselect.
fn build_table_row(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
) -> Result<NodeId> {
    let parent_kind = doc.node(parent).kind.clone();
    match parent_kind {
        ElementKind::TableSelectHeader | ElementKind::TableSelectBody => {
            let select = doc.node(parent).parent.ok_or_else(|| {
                Error::Processing(
                    "Internal error processing document tree: select row without a tableselect"
                        .to_string(),
                )
            })?;
            if doc.node(select).kind != ElementKind::TableSelect {
                return Err(Error::Processing(
                    "Internal error processing document tree: select row without a tableselect"
                        .to_string(),
                ));
            }
            let row = if parent_kind == ElementKind::TableSelectBody {
                ctx.row_number += 1;
                ctx.row_number
            } else {
                0
            };
            simple(
                doc,
                ctx,
                parent,
                xml,
                ElementKind::TableSelectRow { row, select },
                &["class"],
            )
        }
        _ => simple(doc, ctx, parent, xml, ElementKind::TableRow, &["class"]),
    }
}

fn build_button(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
) -> Result<NodeId> {
    let id = doc.append_node(parent, ElementKind::Button);
    // Attribute order in output is type, class, name.
    doc.node_mut(id)
        .set_attribute("type", xml.attribute("type").unwrap_or("action"));
    if let Some(class) = xml.attribute("class") {
        doc.node_mut(id).set_attribute("class", class);
    }
    if let Some(name) = xml.attribute("name") {
        doc.node_mut(id).set_attribute("name", name);
    }
    for (key, _) in &xml.attributes {
        if !matches!(key.as_str(), "type" | "class" | "name") {
            return Err(Error::InvalidInput(format!(
                "Attribute \"{key}\" is not allowed in \"button\""
            )));
        }
    }
    build_children(doc, ctx, id, xml)?;
    Ok(id)
}

/// Resolve a `div`/`span` carrying the entity marker against the store.
fn build_entity(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
) -> Result<NodeId> {
    let entity_id = xml.attribute("data-entity-id").unwrap_or("");
    let mut records = Vec::new();
    find_values(ctx.entity_json, entity_id, &mut records);

    if entity_id.is_empty() || records.is_empty() {
        return Err(Error::InvalidInput(
            "The attribute \"data-entity-id\" is required".to_string(),
        ));
    }
    if records.len() > 1 {
        return Err(Error::InvalidInput(format!(
            "Duplicate \"data-entity-id\"=\"{entity_id}\" in entityJSON"
        )));
    }

    let record = records[0];
    let entity_type = record.get("type").and_then(Value::as_str);
    let value = record
        .get("id")
        .and_then(|ids| ids.get(0))
        .and_then(|first| first.get("value"));

    if let (Some(entity_type), Some(value)) = (entity_type, value) {
        let kind = match entity_type {
            "org.symphonyoss.taxonomy" => Some(ElementKind::HashTag {
                value: value_text(value),
                entity_id: entity_id.to_string(),
            }),
            "org.symphonyoss.fin.security" => Some(ElementKind::CashTag {
                value: value_text(value),
                entity_id: entity_id.to_string(),
            }),
            "com.symphony.user.mention" => {
                let user_id = value
                    .as_i64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "Invalid user id in entity \"{entity_id}\""
                        ))
                    })?;
                let user = ctx.provider.user_presentation(user_id)?;
                Some(ElementKind::Mention {
                    user,
                    entity_id: entity_id.to_string(),
                })
            }
            _ => None,
        };

        if let Some(kind) = kind {
            // The marker children are presentation artifacts; the entity's
            // text regenerates from the resolved value at render time.
            return Ok(doc.append_node(parent, kind));
        }
    }

    // Unrecognized entity type: fall back to the plain container, keeping
    // the original children and attributes.
    match xml.name.as_str() {
        "div" => simple(doc, ctx, parent, xml, ElementKind::Div, &["class", "data-entity-id"]),
        "span" => simple(doc, ctx, parent, xml, ElementKind::Span, &["class", "data-entity-id"]),
        other => Err(Error::InvalidInput(format!(
            "The element \"{other}\" cannot be an entity"
        ))),
    }
}

fn simple(
    doc: &mut Document,
    ctx: &mut ParseContext<'_>,
    parent: NodeId,
    xml: &XmlElement,
    kind: ElementKind,
    allowed: &[&str],
) -> Result<NodeId> {
    let id = doc.append_node(parent, kind);
    copy_attributes(doc, id, xml, allowed)?;
    build_children(doc, ctx, id, xml)?;
    Ok(id)
}

fn copy_attributes(
    doc: &mut Document,
    id: NodeId,
    xml: &XmlElement,
    allowed: &[&str],
) -> Result<()> {
    for (key, value) in &xml.attributes {
        if !allowed.contains(&key.as_str()) {
            let tag = doc.node(id).kind.tag();
            return Err(Error::InvalidInput(format!(
                "Attribute \"{key}\" is not allowed in \"{tag}\""
            )));
        }
        doc.node_mut(id).set_attribute(key, value);
    }
    Ok(())
}

/// Recursive key search, mirroring the store's nested-object semantics: a
/// duplicate id anywhere in the store is ambiguous and must be rejected.
pub(crate) fn find_values<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    out.push(v);
                }
                find_values(v, key, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                find_values(item, key, out);
            }
        }
        _ => {}
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn header_level(tag: &str) -> Option<u8> {
    let mut chars = tag.chars();
    if chars.next() != Some('h') {
        return None;
    }
    match chars.next() {
        Some(digit @ '1'..='6') if chars.next().is_none() => Some(digit as u8 - b'0'),
        _ => None,
    }
}

fn has_class_token(class: &str, token: &str) -> bool {
    class.split_whitespace().any(|t| t.eq_ignore_ascii_case(token))
}

fn remove_class_token(xml: &mut XmlElement, token: &str) {
    let Some(class) = xml.attribute("class") else {
        return;
    };
    let remaining = class
        .split_whitespace()
        .filter(|t| !t.eq_ignore_ascii_case(token))
        .collect::<Vec<_>>()
        .join(" ");
    xml.attributes.retain(|(k, _)| k != "class");
    if !remaining.is_empty() {
        xml.attributes.push(("class".to_string(), remaining));
    }
}

/// PresentationML card attributes map back to their MessageML names.
fn normalize_card_attributes(xml: &mut XmlElement) {
    for (key, _) in xml.attributes.iter_mut() {
        if key == "data-icon" {
            *key = "iconSrc".to_string();
        } else if key == "data-accent-color" {
            *key = "accent".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_level_predicate() {
        assert_eq!(header_level("h1"), Some(1));
        assert_eq!(header_level("h6"), Some(6));
        assert_eq!(header_level("h7"), None);
        assert_eq!(header_level("h10"), None);
        assert_eq!(header_level("hr"), None);
    }

    #[test]
    fn test_class_token_matching() {
        assert!(has_class_token("entity", "entity"));
        assert!(has_class_token("label entity", "entity"));
        assert!(!has_class_token("entityish", "entity"));
    }

    #[test]
    fn test_find_values_nested() {
        let store: Value = serde_json::from_str(
            r#"{"a": {"obj1": {"x": 1}}, "obj1": {"y": 2}, "list": [{"obj2": 3}]}"#,
        )
        .unwrap();
        let mut out = Vec::new();
        find_values(&store, "obj1", &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        find_values(&store, "obj2", &mut out);
        assert_eq!(out.len(), 1);
    }
}
