//! External collaborator for resolving user mentions.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Display data for a mentioned user, resolved through a [`DataProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresentation {
    pub id: i64,
    pub screen_name: String,
    pub pretty_name: String,
    pub email: String,
}

impl UserPresentation {
    pub fn new(id: i64, screen_name: &str, pretty_name: &str, email: &str) -> Self {
        Self {
            id,
            screen_name: screen_name.to_string(),
            pretty_name: pretty_name.to_string(),
            email: email.to_string(),
        }
    }
}

/// Synchronous lookup of user presentation data.
///
/// Called while the document tree is being built; a lookup failure aborts the
/// whole parse, so implementations should return an
/// [`Error::InvalidInput`](crate::Error::InvalidInput) naming the user.
pub trait DataProvider {
    fn user_presentation(&self, user_id: i64) -> Result<UserPresentation>;
}
