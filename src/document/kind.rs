//! The closed set of MessageML node kinds.

use crate::document::NodeId;
use crate::provider::UserPresentation;

/// Kind of a document node.
///
/// This is a sealed variant set: every operation over the tree (validation,
/// the three renderers, entity regeneration) is an exhaustive match, so
/// adding a kind is a compile-time obligation across all of them.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Document root, `<messageML>` or the PresentationML root `<div>`.
    MessageML,
    /// Leaf text run.
    Text(String),

    Chime,
    Paragraph,
    LineBreak,
    HorizontalRule,
    Div,
    Span,
    Bold,
    Italic,
    Preformatted,
    Code,
    Link,
    Image,
    BulletList,
    OrderedList,
    ListItem,
    /// Heading levels 1-6.
    Header(u8),

    Table,
    TableHeader,
    TableBody,
    TableFooter,
    TableRow,
    TableHeaderCell,
    TableCell,

    Card,
    CardHeader,
    CardBody,

    Form,
    Select,
    SelectOption,
    Button,
    Checkbox,

    TableSelect,
    TableSelectHeader,
    TableSelectBody,
    /// Row inside a `tableselect`. `select` is the owning `TableSelect`
    /// node, validated at construction; `row` is the 1-based position within
    /// the body (0 for header rows, which render with the `-header` suffix).
    TableSelectRow { row: u64, select: NodeId },

    HashTag { value: String, entity_id: String },
    CashTag { value: String, entity_id: String },
    Mention { user: UserPresentation, entity_id: String },
    Emoji { shortcode: String, entity_id: String },
}

impl ElementKind {
    /// The MessageML tag name for this kind, as used in error messages and
    /// tag-based lookups.
    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::MessageML => "messageML",
            ElementKind::Text(_) => "#text",
            ElementKind::Chime => "chime",
            ElementKind::Paragraph => "p",
            ElementKind::LineBreak => "br",
            ElementKind::HorizontalRule => "hr",
            ElementKind::Div => "div",
            ElementKind::Span => "span",
            ElementKind::Bold => "b",
            ElementKind::Italic => "i",
            ElementKind::Preformatted => "pre",
            ElementKind::Code => "code",
            ElementKind::Link => "a",
            ElementKind::Image => "img",
            ElementKind::BulletList => "ul",
            ElementKind::OrderedList => "ol",
            ElementKind::ListItem => "li",
            ElementKind::Header(level) => match level {
                1 => "h1",
                2 => "h2",
                3 => "h3",
                4 => "h4",
                5 => "h5",
                _ => "h6",
            },
            ElementKind::Table => "table",
            ElementKind::TableHeader | ElementKind::TableSelectHeader => "thead",
            ElementKind::TableBody | ElementKind::TableSelectBody => "tbody",
            ElementKind::TableFooter => "tfoot",
            ElementKind::TableRow | ElementKind::TableSelectRow { .. } => "tr",
            ElementKind::TableHeaderCell => "th",
            ElementKind::TableCell => "td",
            ElementKind::Card => "card",
            ElementKind::CardHeader => "header",
            ElementKind::CardBody => "body",
            ElementKind::Form => "form",
            ElementKind::Select => "select",
            ElementKind::SelectOption => "option",
            ElementKind::Button => "button",
            ElementKind::Checkbox => "checkbox",
            ElementKind::TableSelect => "tableselect",
            ElementKind::HashTag { .. } => "hash",
            ElementKind::CashTag { .. } => "cash",
            ElementKind::Mention { .. } => "mention",
            ElementKind::Emoji { .. } => "emoji",
        }
    }

    /// Entity kinds carry a document-scoped entity id linking them to the
    /// entity store.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ElementKind::HashTag { entity_id, .. }
            | ElementKind::CashTag { entity_id, .. }
            | ElementKind::Mention { entity_id, .. }
            | ElementKind::Emoji { entity_id, .. } => Some(entity_id),
            _ => None,
        }
    }
}
