//! In-memory record store.
//!
//! The substitutable test double for the hosted platform.  Mirrors the
//! hosted schema the same way the real service does: known tables,
//! generated `id` and `created_at` columns, and unique constraints on the
//! pair tables.  Also carries the fault-injection switches the test suite
//! uses to simulate backend failures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::CHANGE_CHANNEL_CAPACITY;
use crate::error::StoreError;
use crate::store::{now_secs, ChangeEvent, ChangeKind, Query, RecordStore};

/// Application schema: table name plus the column sets that must be unique.
const SCHEMA: &[(&str, &[&[&str]])] = &[
    ("connections", &[]),
    ("likes", &[&["post_id", "user_id"]]),
    ("posts", &[]),
    ("profiles", &[&["user_id"]]),
    ("notifications", &[]),
    ("saved_posts", &[&["user_id", "post_id"]]),
    ("comments", &[]),
    ("conversations", &[]),
    ("conversation_participants", &[&["conversation_id", "user_id"]]),
    ("messages", &[]),
];

struct Inner {
    tables: HashMap<String, Vec<Value>>,
    senders: HashMap<String, broadcast::Sender<ChangeEvent>>,
    failing: HashSet<String>,
    insert_attempts: HashMap<String, u64>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let tables = SCHEMA
            .iter()
            .map(|(name, _)| (name.to_string(), Vec::new()))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                tables,
                senders: HashMap::new(),
                failing: HashSet::new(),
                insert_attempts: HashMap::new(),
            }),
            seq: AtomicU64::new(0),
        }
    }

    /// Make every operation on `table` fail with a backend error until
    /// switched off again.
    pub fn set_fail(&self, table: &str, failing: bool) {
        let mut inner = self.inner.lock().unwrap();
        if failing {
            inner.failing.insert(table.to_string());
        } else {
            inner.failing.remove(table);
        }
    }

    /// How many inserts (successful or not) were attempted on `table`.
    pub fn insert_attempts(&self, table: &str) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.insert_attempts.get(table).copied().unwrap_or(0)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn unique_keys(table: &str) -> &'static [&'static [&'static str]] {
        SCHEMA
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, keys)| *keys)
            .unwrap_or(&[])
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn check(&self, table: &str) -> Result<(), StoreError> {
        if !self.tables.contains_key(table) {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        if self.failing.contains(table) {
            return Err(StoreError::Backend(format!("injected fault on {table}")));
        }
        Ok(())
    }

    fn sender(&mut self, table: &str) -> broadcast::Sender<ChangeEvent> {
        self.senders
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn publish(&mut self, seq: u64, table: &str, kind: ChangeKind, row: Value) {
        let event = ChangeEvent {
            seq,
            table: table.to_string(),
            kind,
            row,
        };
        // No receivers is fine; the event is simply dropped.
        let _ = self.sender(table).send(event);
    }
}

/// Ordering over the JSON value types the schema uses for sortable columns.
fn cmp_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(O::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => O::Equal,
    }
}

fn apply_order_and_limit(mut rows: Vec<Value>, query: &Query) -> Vec<Value> {
    if let Some((column, descending)) = query.ordering() {
        rows.sort_by(|a, b| {
            let ord = cmp_values(
                a.get(column).unwrap_or(&Value::Null),
                b.get(column).unwrap_or(&Value::Null),
            );
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }
    if let Some(limit) = query.row_limit() {
        rows.truncate(limit);
    }
    rows
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        *inner
            .insert_attempts
            .entry(table.to_string())
            .or_insert(0) += 1;
        inner.check(table)?;

        let mut row = match row {
            Value::Object(map) => map,
            _ => return Err(StoreError::Backend("row must be a JSON object".into())),
        };
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(|| now_secs().into());
        let row = Value::Object(row);

        for key in MemoryStore::unique_keys(table) {
            if !key.iter().all(|c| row.get(*c).is_some()) {
                continue;
            }
            let existing = inner
                .tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .any(|r| key.iter().all(|c| r.get(*c) == row.get(*c)))
                })
                .unwrap_or(false);
            if existing {
                return Err(StoreError::Conflict(format!(
                    "duplicate ({}) in {table}",
                    key.join(", ")
                )));
            }
        }

        if let Some(rows) = inner.tables.get_mut(table) {
            rows.push(row.clone());
        }
        let seq = self.next_seq();
        inner.publish(seq, table, ChangeKind::Insert, row.clone());
        Ok(row)
    }

    async fn select(&self, table: &str, query: Query) -> Result<Vec<Value>, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner.check(table)?;
        let rows: Vec<Value> = inner
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(apply_order_and_limit(rows, &query))
    }

    async fn update(&self, table: &str, query: Query, patch: Value) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check(table)?;
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(StoreError::Backend("patch must be a JSON object".into())),
        };

        let mut changed = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                if let Value::Object(map) = row {
                    for (k, v) in &patch {
                        map.insert(k.clone(), v.clone());
                    }
                }
                changed.push(row.clone());
            }
        }
        let affected = changed.len() as u64;
        for row in changed {
            let seq = self.next_seq();
            inner.publish(seq, table, ChangeKind::Update, row);
        }
        Ok(affected)
    }

    async fn delete(&self, table: &str, query: Query) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check(table)?;
        let mut removed = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            rows.retain(|r| {
                if query.matches(r) {
                    removed.push(r.clone());
                    false
                } else {
                    true
                }
            });
        }
        let affected = removed.len() as u64;
        for row in removed {
            let seq = self.next_seq();
            inner.publish(seq, table, ChangeKind::Delete, row);
        }
        Ok(affected)
    }

    async fn count(&self, table: &str, query: Query) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner.check(table)?;
        Ok(inner
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .filter(|r| query.matches(r))
            .count() as u64)
    }

    fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent> {
        let mut inner = self.inner.lock().unwrap();
        inner.sender(table).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tables;
    use serde_json::json;

    #[tokio::test]
    async fn insert_fills_generated_columns() {
        let store = MemoryStore::new();
        let row = store
            .insert(tables::POSTS, json!({"author_id": "a", "content": "hi"}))
            .await
            .expect("insert");
        assert!(row.get("id").and_then(|v| v.as_str()).is_some());
        assert!(row.get("created_at").and_then(|v| v.as_u64()).is_some());
    }

    #[tokio::test]
    async fn duplicate_pair_insert_conflicts() {
        let store = MemoryStore::new();
        let like = json!({"post_id": "p1", "user_id": "u1"});
        store.insert(tables::LIKES, like.clone()).await.expect("first");
        let err = store.insert(tables::LIKES, like).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_table_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .select("no_such_table", Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(_)));
    }

    #[tokio::test]
    async fn select_orders_and_limits() {
        let store = MemoryStore::new();
        for (id, at) in [("a", 10), ("b", 30), ("c", 20)] {
            store
                .insert(
                    tables::POSTS,
                    json!({"id": id, "author_id": "u", "content": "", "created_at": at}),
                )
                .await
                .expect("insert");
        }
        let rows = store
            .select(
                tables::POSTS,
                Query::new().order_desc("created_at").limit(2),
            )
            .await
            .expect("select");
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn change_events_carry_increasing_seq() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe(tables::POSTS);
        store
            .insert(tables::POSTS, json!({"author_id": "u", "content": "1"}))
            .await
            .expect("insert");
        store
            .insert(tables::POSTS, json!({"author_id": "u", "content": "2"}))
            .await
            .expect("insert");
        let first = rx.recv().await.expect("first event");
        let second = rx.recv().await.expect("second event");
        assert_eq!(first.kind, ChangeKind::Insert);
        assert!(second.seq > first.seq);
    }

    #[tokio::test]
    async fn delete_publishes_old_row() {
        let store = MemoryStore::new();
        store
            .insert(tables::POSTS, json!({"id": "p1", "author_id": "u", "content": ""}))
            .await
            .expect("insert");
        let mut rx = store.subscribe(tables::POSTS);
        store
            .delete(tables::POSTS, Query::new().eq("id", "p1"))
            .await
            .expect("delete");
        let event = rx.recv().await.expect("event");
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.row["id"], "p1");
    }

    #[tokio::test]
    async fn injected_fault_fails_operations() {
        let store = MemoryStore::new();
        store.set_fail(tables::LIKES, true);
        let err = store
            .insert(tables::LIKES, json!({"post_id": "p", "user_id": "u"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.insert_attempts(tables::LIKES), 1);

        store.set_fail(tables::LIKES, false);
        store
            .insert(tables::LIKES, json!({"post_id": "p", "user_id": "u"}))
            .await
            .expect("insert after clearing fault");
    }
}
