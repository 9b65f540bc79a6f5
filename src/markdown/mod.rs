//! Legacy markdown support: the offset-annotated importer and the markdown
//! renderer with legacy entity extraction.

pub(crate) mod escape;
pub(crate) mod import;
pub(crate) mod render;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::message::Message;
use crate::provider::DataProvider;
use crate::validate;

/// Parse a legacy markdown message with its offset-addressed entity
/// annotations and optional media attachments.
///
/// The entity store starts empty on this path; every entity record in the
/// resulting [`Message::entity_json`] is generated from the annotations.
pub fn parse_markdown(
    text: &str,
    entities: Option<&Value>,
    media: Option<&Value>,
    provider: &dyn DataProvider,
) -> Result<Message> {
    let document = import::import(text, entities, provider)?;
    validate::validate_document(&document)?;
    Ok(Message::with_media(
        document,
        Value::Object(Map::new()),
        media.cloned().unwrap_or(Value::Null),
    ))
}
