//! Error types for MessageML parsing and rendering.

use thiserror::Error;

/// Errors surfaced by a parse call.
///
/// `Display` is the user-facing message; downstream services match on the
/// exact wording, so messages here are part of the contract.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: bad markup, disallowed tags or attributes, content
    /// model violations, broken entity references or annotation offsets.
    /// Not retryable; the caller must fix the message.
    #[error("{0}")]
    InvalidInput(String),

    /// The markup was well formed but could not be processed against its
    /// entity data, e.g. a `data-entity-id` with no matching store record.
    #[error("{0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, Error>;
