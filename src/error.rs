//! Error type shared by the record store implementations and the domain
//! access functions.

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// The query matched no rows where exactly one was required.
    NotFound(String),
    /// The store rejected a write that would violate a uniqueness rule.
    Conflict(String),
    /// Transport-level failure talking to the remote store.
    Transport(String),
    /// The store accepted the request but reported a failure.
    Backend(String),
    /// The referenced table does not exist in the store's schema.
    UnknownTable(String),
    Serde(serde_json::Error),
}

impl StoreError {
    /// Whether this error is the expected-absence condition rather than a
    /// real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "not found: {msg}"),
            StoreError::Conflict(msg) => write!(f, "conflict: {msg}"),
            StoreError::Transport(msg) => write!(f, "transport error: {msg}"),
            StoreError::Backend(msg) => write!(f, "store error: {msg}"),
            StoreError::UnknownTable(table) => write!(f, "unknown table: {table}"),
            StoreError::Serde(e) => write!(f, "serialization error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}
