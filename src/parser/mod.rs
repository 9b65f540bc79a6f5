//! MessageML and PresentationML front end.
//!
//! [`parse_message_ml`] is the full XML pipeline: reject blank and
//! control-character input, parse the entity store, parse the XML, check
//! every `data-entity-id` reference against the store, build the typed tree,
//! validate it, and package the [`Message`] with all renditions computed.

pub(crate) mod builder;
pub mod xml;

use serde_json::Value;

use crate::document::{Document, Format};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::parser::builder::ParseContext;
use crate::parser::xml::{XmlElement, XmlNode};
use crate::provider::DataProvider;
use crate::validate;

/// Version stamped into the PresentationML root when the caller passes an
/// empty version string.
pub const DEFAULT_VERSION: &str = "2.0";

/// Parse a MessageML (or PresentationML) message into a [`Message`].
///
/// `entity_json` is the optional entity store accompanying the message;
/// every `data-entity-id` in the markup must resolve to exactly one object
/// inside it. `version` is stamped into the PresentationML output.
pub fn parse_message_ml(
    message: &str,
    entity_json: Option<&str>,
    version: &str,
    provider: &dyn DataProvider,
) -> Result<Message> {
    if message.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Error parsing message: the message cannot be null or empty".to_string(),
        ));
    }
    validate_message_text(message)?;

    let store = parse_entity_json(entity_json)?;
    let root_xml = xml::parse_document(message)?;
    validate_entities(&root_xml, &store)?;

    let (format, version) = match root_xml.name.as_str() {
        "messageML" => {
            if let Some((key, _)) = root_xml.attributes.first() {
                return Err(Error::InvalidInput(format!(
                    "Attribute \"{key}\" is not allowed in \"messageML\""
                )));
            }
            let version = if version.trim().is_empty() {
                DEFAULT_VERSION
            } else {
                version
            };
            (Format::MessageML, version.to_string())
        }
        "div" => {
            let version = validate_presentation_root(&root_xml)?;
            (Format::PresentationML, version)
        }
        _ => {
            return Err(Error::InvalidInput(
                "Root tag must be <messageML> or <div>".to_string(),
            ));
        }
    };

    let mut document = Document::new(format, &version);
    let root = document.root();
    let mut ctx = ParseContext::new(format, provider, &store);
    builder::build_children(&mut document, &mut ctx, root, &root_xml)?;
    validate::validate_document(&document)?;

    Ok(Message::new(document, store))
}

/// The only control characters allowed in the raw message are tab, LF and CR.
fn validate_message_text(message: &str) -> Result<()> {
    if message
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(Error::InvalidInput(
            "Invalid control characters in message".to_string(),
        ));
    }
    Ok(())
}

fn parse_entity_json(entity_json: Option<&str>) -> Result<Value> {
    let Some(raw) = entity_json.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Value::Object(serde_json::Map::new()));
    };
    let store: Value = serde_json::from_str(raw)
        .map_err(|e| Error::InvalidInput(format!("Error parsing EntityJSON: {e}")))?;
    if !store.is_object() {
        return Err(Error::InvalidInput(
            "Error parsing EntityJSON: provided EntityJSON is not an object".to_string(),
        ));
    }
    Ok(store)
}

/// Check every `data-entity-id` in the raw tree against the store before any
/// node is built, so a dangling or non-object reference fails fast with a
/// processing error rather than surfacing mid-build.
fn validate_entities(xml: &XmlElement, store: &Value) -> Result<()> {
    if let Some(id) = xml.attribute("data-entity-id") {
        let mut records = Vec::new();
        builder::find_values(store, id, &mut records);
        match records.first() {
            None => {
                return Err(Error::Processing(format!(
                    "Error processing EntityJSON: no entity data provided for \
                     \"data-entity-id\"=\"{id}\""
                )));
            }
            Some(record) if !record.is_object() => {
                return Err(Error::Processing(format!(
                    "Error processing EntityJSON: the node \"{id}\" has to be an object"
                )));
            }
            Some(_) => {}
        }
    }
    for child in &xml.children {
        if let XmlNode::Element(element) = child {
            validate_entities(element, store)?;
        }
    }
    Ok(())
}

fn validate_presentation_root(root: &XmlElement) -> Result<String> {
    let mut version = DEFAULT_VERSION.to_string();
    for (key, value) in &root.attributes {
        match key.as_str() {
            "data-format" => {
                if value != "PresentationML" {
                    return Err(Error::InvalidInput(format!(
                        "Invalid message format \"{value}\""
                    )));
                }
            }
            "data-version" => version = value.clone(),
            "class" => {}
            _ => {
                return Err(Error::InvalidInput(format!(
                    "Attribute \"{key}\" is not allowed in \"div\""
                )));
            }
        }
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_characters_rejected() {
        let err = validate_message_text("Hello\u{0007}world").unwrap_err();
        assert_eq!(err.to_string(), "Invalid control characters in message");
        assert!(validate_message_text("line1\nline2\tend\r\n").is_ok());
    }

    #[test]
    fn test_entity_json_must_be_object() {
        assert!(parse_entity_json(None).unwrap().is_object());
        assert!(parse_entity_json(Some("  ")).unwrap().is_object());
        assert!(parse_entity_json(Some("{\"obj\": {}}")).is_ok());
        assert!(parse_entity_json(Some("[1, 2]")).is_err());

        let err = parse_entity_json(Some("{invalid")).unwrap_err();
        assert!(err.to_string().starts_with("Error parsing EntityJSON: "));
    }
}
