//! Generic XML element tree, fed to the tree builder.
//!
//! This is the collaborator boundary described by the grammar: the builder
//! consumes plain elements (tag name, attribute map, ordered children and
//! text runs) and never touches the wire format. The reader is deliberately
//! strict: no DOCTYPE, no custom entities, only the five predefined entities
//! and numeric character references are expanded.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

/// One element of the raw input tree.
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Child of an [`XmlElement`]: a nested element or a text run.
#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

fn invalid(message: impl std::fmt::Display) -> Error {
    Error::InvalidInput(format!("Invalid messageML: {message}"))
}

/// Parse the message string into an element tree rooted at the document
/// element.
pub fn parse_document(input: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(input);

    // Open elements; the bottom of the stack becomes the root.
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(invalid("content is not allowed after the root element"));
                }
                let mut element = XmlElement::new(decode_name(e.name().as_ref()));
                read_attributes(&e, &mut element)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(invalid("content is not allowed after the root element"));
                }
                let mut element = XmlElement::new(decode_name(e.name().as_ref()));
                read_attributes(&e, &mut element)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                // Name matching is enforced by the reader itself.
                let element = stack
                    .pop()
                    .ok_or_else(|| invalid("unexpected closing tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(e.as_ref()))?;
            }
            Ok(Event::CData(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(e.as_ref()))?;
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref()).to_string();
                let resolved = resolve_entity(&entity)
                    .ok_or_else(|| invalid(format_args!("undefined entity \"&{entity};\"")))?;
                push_text(&mut stack, &resolved)?;
            }
            Ok(Event::DocType(_)) => {
                // XXE prevention: inline DTDs could define expanding entities.
                return Err(invalid("DOCTYPE is not allowed"));
            }
            Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::Comment(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid(e)),
        }
    }

    if !stack.is_empty() {
        return Err(invalid("premature end of message"));
    }
    root.ok_or_else(|| invalid("no root element found"))
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
    } else {
        *root = Some(element);
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    let Some(parent) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(invalid("content is not allowed outside the root element"));
    };

    // Merge adjacent runs so entity references don't fragment text nodes.
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
    Ok(())
}

fn decode_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_string()
}

fn read_attributes(
    e: &quick_xml::events::BytesStart<'_>,
    element: &mut XmlElement,
) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(invalid)?;
        let key = decode_name(attr.key.as_ref());
        let raw = String::from_utf8_lossy(&attr.value).to_string();
        let value = quick_xml::escape::unescape(&raw).map_err(invalid)?;
        element.attributes.push((key, value.to_string()));
    }
    Ok(())
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}
