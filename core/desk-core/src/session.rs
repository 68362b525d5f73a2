//! Caller identity.
//!
//! Sessions are owned by the authentication collaborator; this crate only
//! reads the identifier to scope queries and status lookups.

use serde::{Deserialize, Serialize};

/// Opaque identity of the current caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
