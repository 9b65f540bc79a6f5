//! The parsed message and all of its renditions.

use serde_json::Value;

use crate::document::{Document, ElementKind};
use crate::{entity, markdown, presentation, text};

/// A fully parsed message.
///
/// Every rendition is computed when the message is built, so the getters are
/// cheap and the outputs can never disagree with the tree or each other.
#[derive(Debug)]
pub struct Message {
    document: Document,
    entity_json: Value,
    presentation_ml: String,
    markdown: String,
    entities: Value,
    media: Value,
}

impl Message {
    pub(crate) fn new(document: Document, supplied_store: Value) -> Self {
        Self::with_media(document, supplied_store, Value::Null)
    }

    pub(crate) fn with_media(document: Document, supplied_store: Value, media: Value) -> Self {
        let entity_json = entity::rebuild_entity_json(&document, &supplied_store);
        let presentation_ml = presentation::render(&document);
        let rendition = markdown::render::render(&document);
        Self {
            document,
            entity_json,
            presentation_ml,
            markdown: rendition.markdown,
            entities: rendition.entities,
            media,
        }
    }

    /// The canonical document tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The rebuilt entity store: caller-supplied records plus generated ones.
    pub fn entity_json(&self) -> &Value {
        &self.entity_json
    }

    pub fn presentation_ml(&self) -> &str {
        &self.presentation_ml
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Legacy entities (offset-addressed annotations against [`markdown`]).
    ///
    /// [`markdown`]: Message::markdown
    pub fn entities(&self) -> &Value {
        &self.entities
    }

    /// Media attachments carried through from the legacy payload.
    pub fn media(&self) -> &Value {
        &self.media
    }

    /// Whether the message consists of a single chime.
    pub fn is_chime(&self) -> bool {
        self.document
            .children(self.document.root())
            .iter()
            .any(|&c| self.document.node(c).kind == ElementKind::Chime)
    }

    /// Raw text rendition: each text run is whitespace-collapsed in place,
    /// with no trimming across runs.
    pub fn as_text(&self) -> String {
        text::as_text(&self.document)
    }

    /// Normalized text rendition, optionally preserving whitespace.
    pub fn text(&self, preserve_whitespace: bool) -> String {
        text::text(&self.document, preserve_whitespace)
    }
}
