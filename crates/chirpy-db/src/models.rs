//! Stored record types. These are what the snapshot file holds and are
//! distinct from the chirpy-types public models, which never carry the
//! password hash.

use chirpy_types::models::{Message, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: u64,
    pub author_id: u64,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub is_privileged: bool,
    /// Argon2 PHC string.
    pub password_hash: String,
}

impl From<MessageRecord> for Message {
    fn from(row: MessageRecord) -> Self {
        Message {
            id: row.id,
            author_id: row.author_id,
            body: row.body,
        }
    }
}

impl From<&UserRecord> for User {
    fn from(row: &UserRecord) -> Self {
        User {
            id: row.id,
            email: row.email.clone(),
            is_privileged: row.is_privileged,
        }
    }
}

/// Listing order by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Fields to change on an existing user. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_privileged: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.is_privileged.is_none()
    }
}

/// Key used by the email index: trimmed and ASCII-lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
