use serde::{Deserialize, Serialize};

/// A short post. The store assigns `id`; `author_id` is trusted from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub author_id: u64,
    pub body: String,
}

/// Public view of an account. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub is_privileged: bool,
}
