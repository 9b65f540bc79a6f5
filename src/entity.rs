//! Entity store regeneration.
//!
//! After a parse the store is rebuilt from the document: records supplied by
//! the caller are kept verbatim, and every entity node whose id has no record
//! yet gains a generated one. The markdown import path starts from an empty
//! store, so there everything is generated.

use serde_json::{Map, Value, json};

use crate::document::{Document, ElementKind};
use crate::parser::builder::find_values;

const HASHTAG_TYPE: &str = "org.symphonyoss.taxonomy";
const HASHTAG_ID_TYPE: &str = "org.symphonyoss.taxonomy.hashtag";
const CASHTAG_TYPE: &str = "org.symphonyoss.fin.security";
const CASHTAG_ID_TYPE: &str = "org.symphonyoss.fin.security.id.ticker";
const MENTION_TYPE: &str = "com.symphony.user.mention";
const MENTION_ID_TYPE: &str = "com.symphony.user.userId";
const EMOJI_TYPE: &str = "com.symphony.emoji";
const EMOJI_ID_TYPE: &str = "com.symphony.emoji.shortcode";
const ENTITY_VERSION: &str = "1.0";

/// Rebuild the entity store for `doc`, merging generated records into the
/// caller-supplied ones.
pub(crate) fn rebuild_entity_json(doc: &Document, supplied: &Value) -> Value {
    let mut store = match supplied {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    for id in doc.iter_dfs() {
        let kind = &doc.node(id).kind;
        let Some(entity_id) = kind.entity_id() else {
            continue;
        };
        let mut existing = Vec::new();
        find_values(supplied, entity_id, &mut existing);
        if !existing.is_empty() {
            continue;
        }
        if let Some(record) = generate_record(kind) {
            store.insert(entity_id.to_string(), record);
        }
    }

    Value::Object(store)
}

fn generate_record(kind: &ElementKind) -> Option<Value> {
    let record = match kind {
        ElementKind::HashTag { value, .. } => {
            taxonomy_record(HASHTAG_TYPE, HASHTAG_ID_TYPE, json!(value))
        }
        ElementKind::CashTag { value, .. } => {
            taxonomy_record(CASHTAG_TYPE, CASHTAG_ID_TYPE, json!(value))
        }
        ElementKind::Mention { user, .. } => {
            // The user id prints as a string here, matching the legacy store
            // shape; the legacy entities output carries it as a number.
            taxonomy_record(MENTION_TYPE, MENTION_ID_TYPE, json!(user.id.to_string()))
        }
        ElementKind::Emoji { shortcode, .. } => {
            taxonomy_record(EMOJI_TYPE, EMOJI_ID_TYPE, json!(shortcode))
        }
        _ => return None,
    };
    Some(record)
}

fn taxonomy_record(entity_type: &str, id_type: &str, value: Value) -> Value {
    json!({
        "type": entity_type,
        "version": ENTITY_VERSION,
        "id": [{ "type": id_type, "value": value }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Format;

    #[test]
    fn test_generated_records_merge_with_supplied() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(
            doc.root(),
            ElementKind::HashTag {
                value: "world".to_string(),
                entity_id: "keyword1".to_string(),
            },
        );
        doc.append_node(
            doc.root(),
            ElementKind::CashTag {
                value: "ibm".to_string(),
                entity_id: "keyword2".to_string(),
            },
        );

        let supplied = json!({ "obj123": { "type": "custom.type" } });
        let store = rebuild_entity_json(&doc, &supplied);

        assert_eq!(store["obj123"]["type"], "custom.type");
        assert_eq!(store["keyword1"]["type"], "org.symphonyoss.taxonomy");
        assert_eq!(store["keyword1"]["id"][0]["value"], "world");
        assert_eq!(
            store["keyword2"]["id"][0]["type"],
            "org.symphonyoss.fin.security.id.ticker"
        );
    }

    #[test]
    fn test_supplied_record_not_overwritten() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        doc.append_node(
            doc.root(),
            ElementKind::HashTag {
                value: "world".to_string(),
                entity_id: "hash123".to_string(),
            },
        );

        let supplied = json!({
            "hash123": {
                "type": "org.symphonyoss.taxonomy",
                "version": "1.0",
                "id": [{ "type": "org.symphonyoss.taxonomy.hashtag", "value": "world" }],
                "extra": "caller data",
            }
        });
        let store = rebuild_entity_json(&doc, &supplied);
        assert_eq!(store["hash123"]["extra"], "caller data");
    }
}
