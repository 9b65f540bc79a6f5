//! MessageML compiler.
//!
//! MessageML is an XML dialect for chat messages. This crate parses the two
//! accepted input forms — semantic MessageML (or its already-rendered
//! PresentationML counterpart) and the legacy markdown-with-annotations
//! format — into one canonical document tree, validates it against the fixed
//! tag vocabulary, and renders every output the messaging pipeline needs:
//! PresentationML, legacy markdown with offset-addressed entities, plain
//! text, and the entity JSON store.
//!
//! ```no_run
//! use messageml::{DataProvider, Result, UserPresentation, parse_message_ml};
//!
//! struct Directory;
//!
//! impl DataProvider for Directory {
//!     fn user_presentation(&self, user_id: i64) -> Result<UserPresentation> {
//!         Ok(UserPresentation::new(user_id, "jdoe", "John Doe", "jdoe@example.com"))
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let message = parse_message_ml(
//!     "<messageML>Hello <b>world</b>!</messageML>",
//!     None,
//!     "2.0",
//!     &Directory,
//! )?;
//! assert_eq!(
//!     message.presentation_ml(),
//!     "<div data-format=\"PresentationML\" data-version=\"2.0\">Hello <b>world</b>!</div>"
//! );
//! assert_eq!(message.markdown(), "Hello **world**!");
//! # Ok(())
//! # }
//! ```

pub mod document;
mod entity;
mod error;
pub mod markdown;
mod message;
pub mod parser;
mod presentation;
mod provider;
mod text;
mod validate;

pub use document::{Document, Element, ElementKind, Format, NodeId};
pub use error::{Error, Result};
pub use markdown::parse_markdown;
pub use message::Message;
pub use parser::parse_message_ml;
pub use provider::{DataProvider, UserPresentation};
