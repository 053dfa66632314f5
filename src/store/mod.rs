//! Record store interface.
//!
//! The hosted platform behind this trait owns persistence, indexing, and
//! consistency; the client only issues table-scoped requests.  Everything in
//! the crate takes `&dyn RecordStore`, so any implementation — the real
//! HTTP-backed store or the in-memory test double — can be injected.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::StoreError;

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Table names used by the application schema.
pub mod tables {
    pub const CONNECTIONS: &str = "connections";
    pub const LIKES: &str = "likes";
    pub const POSTS: &str = "posts";
    pub const PROFILES: &str = "profiles";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const SAVED_POSTS: &str = "saved_posts";
    pub const COMMENTS: &str = "comments";
    pub const CONVERSATIONS: &str = "conversations";
    pub const CONVERSATION_PARTICIPANTS: &str = "conversation_participants";
    pub const MESSAGES: &str = "messages";
}

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change pushed by the store.
///
/// `seq` increases monotonically per store and is the consumer's guard
/// against applying events out of order.  For deletes, `row` carries the
/// old row (at minimum its id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub seq: u64,
    pub table: String,
    pub kind: ChangeKind,
    pub row: Value,
}

/// A table query: equality filters (ANDed), an optional `IN` filter, an
/// order column, and a limit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    filters: Vec<(String, Value)>,
    #[serde(default)]
    within: Option<(String, Vec<Value>)>,
    /// (column, descending)
    #[serde(default)]
    order: Option<(String, bool)>,
    #[serde(default)]
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column == value`.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    /// Require `column` to be one of `values`.
    pub fn within<V: Into<Value>>(mut self, column: &str, values: Vec<V>) -> Self {
        self.within = Some((
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some((column.to_string(), false));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some((column.to_string(), true));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `row` satisfies the filters (ordering and limit excluded).
    pub fn matches(&self, row: &Value) -> bool {
        for (column, value) in &self.filters {
            if row.get(column) != Some(value) {
                return false;
            }
        }
        if let Some((column, values)) = &self.within {
            match row.get(column) {
                Some(v) if values.contains(v) => {}
                _ => return false,
            }
        }
        true
    }

    pub(crate) fn ordering(&self) -> Option<(&str, bool)> {
        self.order.as_ref().map(|(c, d)| (c.as_str(), *d))
    }

    pub(crate) fn row_limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Table-scoped CRUD plus a per-table change subscription.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a row; the store fills generated columns (id, created_at)
    /// and returns the stored row.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Rows matching the query, ordered and limited as requested.
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Value>, StoreError>;

    /// Merge `patch` into every matching row; returns the affected count.
    async fn update(&self, table: &str, query: Query, patch: Value) -> Result<u64, StoreError>;

    /// Delete matching rows; returns the affected count.
    async fn delete(&self, table: &str, query: Query) -> Result<u64, StoreError>;

    /// Head-only count: no row payloads are transferred.
    async fn count(&self, table: &str, query: Query) -> Result<u64, StoreError>;

    /// Subscribe to the table's change feed.  Dropping the receiver is the
    /// unsubscribe.
    fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent>;
}

/// At most one row, or `None`.  Absence is not an error.
pub async fn select_maybe(
    store: &dyn RecordStore,
    table: &str,
    query: Query,
) -> Result<Option<Value>, StoreError> {
    let rows = store.select(table, query.limit(1)).await?;
    Ok(rows.into_iter().next())
}

/// Exactly one row; zero rows is [`StoreError::NotFound`].
pub async fn select_single(
    store: &dyn RecordStore,
    table: &str,
    query: Query,
) -> Result<Value, StoreError> {
    select_maybe(store, table, query)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("no row in {table}")))
}

/// Current time as seconds since the UNIX epoch.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
