//! Structural validation of the built document tree.
//!
//! Runs once, post-order, after the builder finishes: children are checked
//! before their parent so that a misplaced element reports its own error
//! (`can only be a child of ...`) before the parent complains about an
//! unexpected child.

use crate::document::{Document, Element, ElementKind, NodeId};
use crate::error::{Error, Result};

pub(crate) fn validate_document(doc: &Document) -> Result<()> {
    validate_node(doc, doc.root())
}

fn validate_node(doc: &Document, id: NodeId) -> Result<()> {
    for &child in doc.children(id) {
        validate_node(doc, child)?;
    }
    check(doc, id)
}

/// Inline (phrasing) content.
fn is_phrasing(kind: &ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Text(_)
            | ElementKind::Bold
            | ElementKind::Italic
            | ElementKind::Span
            | ElementKind::Link
            | ElementKind::Image
            | ElementKind::LineBreak
            | ElementKind::Code
            | ElementKind::HashTag { .. }
            | ElementKind::CashTag { .. }
            | ElementKind::Mention { .. }
            | ElementKind::Emoji { .. }
    )
}

/// Block-level content.
fn is_block(kind: &ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Paragraph
            | ElementKind::Div
            | ElementKind::Preformatted
            | ElementKind::BulletList
            | ElementKind::OrderedList
            | ElementKind::Table
            | ElementKind::Card
            | ElementKind::Header(_)
            | ElementKind::HorizontalRule
            | ElementKind::Form
    )
}

fn is_flow(kind: &ElementKind) -> bool {
    is_phrasing(kind) || is_block(kind)
}

fn check(doc: &Document, id: NodeId) -> Result<()> {
    let node = doc.node(id);
    match &node.kind {
        ElementKind::MessageML => {
            let children = doc.children(id);
            if children
                .iter()
                .any(|&c| doc.node(c).kind == ElementKind::Chime)
                && children.len() != 1
            {
                return Err(Error::InvalidInput(
                    "Chime messages may not have any other content".to_string(),
                ));
            }
            assert_children(doc, id, |k| is_flow(k) || *k == ElementKind::Chime)
        }
        ElementKind::Text(_) => Ok(()),

        ElementKind::Chime => assert_no_children(doc, id),
        ElementKind::LineBreak | ElementKind::HorizontalRule => assert_no_children(doc, id),
        ElementKind::Image => {
            assert_no_children(doc, id)?;
            assert_required(node, "src")
        }

        ElementKind::Div | ElementKind::CardHeader | ElementKind::CardBody => {
            assert_children(doc, id, is_flow)
        }
        ElementKind::Paragraph
        | ElementKind::Bold
        | ElementKind::Italic
        | ElementKind::Span
        | ElementKind::Header(_) => assert_children(doc, id, is_phrasing),
        ElementKind::Link => {
            assert_required(node, "href")?;
            // Links do not nest.
            assert_children(doc, id, |k| {
                is_phrasing(k) && !matches!(k, ElementKind::Link)
            })
        }
        ElementKind::Preformatted | ElementKind::Code => assert_children(doc, id, |k| {
            matches!(
                k,
                ElementKind::Text(_)
                    | ElementKind::Bold
                    | ElementKind::Italic
                    | ElementKind::Span
                    | ElementKind::LineBreak
            )
        }),

        ElementKind::BulletList | ElementKind::OrderedList => {
            assert_no_text(doc, id)?;
            assert_children(doc, id, |k| matches!(k, ElementKind::ListItem))
        }
        ElementKind::ListItem => assert_children(doc, id, is_flow),

        ElementKind::Table => {
            assert_no_text(doc, id)?;
            assert_children(doc, id, |k| {
                matches!(
                    k,
                    ElementKind::TableHeader
                        | ElementKind::TableBody
                        | ElementKind::TableFooter
                        | ElementKind::TableRow
                )
            })
        }
        ElementKind::TableHeader | ElementKind::TableBody | ElementKind::TableFooter => {
            assert_no_text(doc, id)?;
            assert_children(doc, id, |k| {
                matches!(k, ElementKind::TableRow | ElementKind::TableSelectRow { .. })
            })
        }
        ElementKind::TableRow | ElementKind::TableSelectRow { .. } => {
            assert_no_text(doc, id)?;
            assert_children(doc, id, |k| {
                matches!(k, ElementKind::TableHeaderCell | ElementKind::TableCell)
            })
        }
        ElementKind::TableHeaderCell | ElementKind::TableCell => {
            assert_children(doc, id, is_flow)
        }

        ElementKind::Card => assert_children(doc, id, |k| {
            is_flow(k) || matches!(k, ElementKind::CardHeader | ElementKind::CardBody)
        }),

        ElementKind::Form => {
            assert_children(doc, id, |k| {
                (is_flow(k) && !matches!(k, ElementKind::Form))
                    || matches!(
                        k,
                        ElementKind::Select
                            | ElementKind::Button
                            | ElementKind::Checkbox
                            | ElementKind::TableSelect
                    )
            })
        }
        ElementKind::Select => {
            assert_form_child(doc, id, "select")?;
            assert_required(node, "name")?;
            assert_no_text(doc, id)?;
            assert_children(doc, id, |k| matches!(k, ElementKind::SelectOption))
        }
        ElementKind::SelectOption => {
            if doc.parent_kind(id) != Some(&ElementKind::Select) {
                return Err(Error::InvalidInput(
                    "Element \"option\" can only be a child of the following elements: \
                     \"select\""
                        .to_string(),
                ));
            }
            assert_required(node, "value")?;
            assert_children(doc, id, |k| matches!(k, ElementKind::Text(_)))
        }
        ElementKind::Button => {
            assert_form_child(doc, id, "button")?;
            check_button(node)?;
            assert_children(doc, id, is_phrasing)
        }
        ElementKind::Checkbox => {
            assert_form_child(doc, id, "checkbox")?;
            assert_required(node, "name")?;
            if let Some(checked) = node.attribute("checked") {
                assert_enum(node, "checked", checked, &["true", "false"])?;
            }
            assert_children(doc, id, is_phrasing)
        }

        ElementKind::TableSelect => check_table_select(doc, id),
        ElementKind::TableSelectHeader | ElementKind::TableSelectBody => {
            assert_no_text(doc, id)?;
            assert_children(doc, id, |k| matches!(k, ElementKind::TableSelectRow { .. }))
        }

        ElementKind::HashTag { value, .. } => {
            assert_no_children(doc, id)?;
            if value.is_empty() {
                return Err(Error::InvalidInput(
                    "The attribute \"tag\" is required".to_string(),
                ));
            }
            Ok(())
        }
        ElementKind::CashTag { value, .. } => {
            assert_no_children(doc, id)?;
            if value.is_empty() {
                return Err(Error::InvalidInput(
                    "The attribute \"tag\" is required".to_string(),
                ));
            }
            Ok(())
        }
        ElementKind::Mention { .. } => assert_no_children(doc, id),
        ElementKind::Emoji { shortcode, .. } => {
            assert_no_children(doc, id)?;
            if shortcode.is_empty() {
                return Err(Error::InvalidInput(
                    "The attribute \"shortcode\" is required".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn check_button(node: &Element) -> Result<()> {
    let button_type = node.attribute("type").unwrap_or("action");
    if !matches!(button_type, "action" | "reset") {
        return Err(Error::InvalidInput(
            "Attribute \"type\" must be \"action\" or \"reset\"".to_string(),
        ));
    }
    if let Some(class) = node.attribute("class")
        && !matches!(
            class,
            "primary" | "secondary" | "primary-destructive" | "secondary-destructive"
        )
    {
        return Err(Error::InvalidInput(
            "Attribute \"class\" must be \"primary\", \"secondary\", \
             \"primary-destructive\" or \"secondary-destructive\""
                .to_string(),
        ));
    }
    if button_type == "action" && node.attribute("name").is_none() {
        return Err(Error::InvalidInput(
            "Attribute \"name\" is required for generic action buttons".to_string(),
        ));
    }
    Ok(())
}

fn check_table_select(doc: &Document, id: NodeId) -> Result<()> {
    let node = doc.node(id);
    assert_form_child(doc, id, "tableselect")?;
    assert_required(node, "name")?;
    assert_required(node, "type")?;
    assert_required(node, "position")?;
    if let Some(t) = node.attribute("type") {
        assert_enum(node, "type", t, &["button", "checkbox"])?;
    }
    if let Some(p) = node.attribute("position") {
        assert_enum(node, "position", p, &["left", "right"])?;
    }
    assert_no_text(doc, id)?;
    assert_children(doc, id, |k| {
        matches!(
            k,
            ElementKind::TableSelectHeader
                | ElementKind::TableSelectBody
                | ElementKind::TableFooter
        )
    })
}

fn assert_children<F>(doc: &Document, id: NodeId, allowed: F) -> Result<()>
where
    F: Fn(&ElementKind) -> bool,
{
    for &child in doc.children(id) {
        let kind = &doc.node(child).kind;
        if !allowed(kind) {
            if let ElementKind::Text(text) = kind {
                // Inter-element whitespace is formatting, not content.
                if text.trim().is_empty() {
                    continue;
                }
                return Err(Error::InvalidInput(format!(
                    "Element \"{}\" may not have text content",
                    doc.node(id).kind.tag()
                )));
            }
            return Err(Error::InvalidInput(format!(
                "Element \"{}\" is not allowed in \"{}\"",
                kind.tag(),
                doc.node(id).kind.tag()
            )));
        }
    }
    Ok(())
}

fn assert_form_child(doc: &Document, id: NodeId, tag: &str) -> Result<()> {
    if doc.parent_kind(id) != Some(&ElementKind::Form) {
        return Err(Error::InvalidInput(format!(
            "Element \"{tag}\" can only be a child of the following elements: \"form\""
        )));
    }
    Ok(())
}

fn assert_no_text(doc: &Document, id: NodeId) -> Result<()> {
    for &child in doc.children(id) {
        if let ElementKind::Text(text) = &doc.node(child).kind {
            // Pure inter-element whitespace is formatting, not content.
            if !text.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Element \"{}\" may not have text content",
                    doc.node(id).kind.tag()
                )));
            }
        }
    }
    Ok(())
}

fn assert_no_children(doc: &Document, id: NodeId) -> Result<()> {
    assert_children(doc, id, |_| false)
}

fn assert_required(node: &Element, attr: &str) -> Result<()> {
    match node.attribute(attr) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(Error::InvalidInput(format!(
            "The attribute \"{attr}\" is required"
        ))),
    }
}

fn assert_enum(node: &Element, attr: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(Error::InvalidInput(format!(
        "Attribute \"{attr}\" of element \"{}\" can only be one of the following values: [{}]",
        node.kind.tag(),
        allowed.join(", ")
    )))
}
