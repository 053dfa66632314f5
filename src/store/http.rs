//! HTTP-backed record store.
//!
//! Speaks a small JSON protocol against a record-store service:
//!
//! ```text
//! POST /tables/{table}/rows     insert, body = row, returns the stored row
//! POST /tables/{table}/query    select, body = Query, returns rows
//! POST /tables/{table}/update   body = { query, patch }, returns { affected }
//! POST /tables/{table}/delete   body = { query }, returns { affected }
//! POST /tables/{table}/count    body = { query }, returns { count }
//! GET  /tables/{table}/changes?since={seq}    returns ChangeEvents
//! ```
//!
//! Change feeds are polled: the first subscription to a table spawns a poll
//! loop that fetches events past the last seen sequence number and fans
//! them out on a broadcast channel.  Poll failures back off exponentially
//! and reset on the next success.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::config::{
    CHANGE_CHANNEL_CAPACITY, CHANGE_POLL_INTERVAL_SECS, CHANGE_POLL_MAX_BACKOFF_SECS,
};
use crate::error::StoreError;
use crate::rlog;
use crate::store::{ChangeEvent, Query, RecordStore};

pub struct HttpStore {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    feeds: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
}

#[derive(Deserialize)]
struct AffectedBody {
    affected: u64,
}

#[derive(Deserialize)]
struct CountBody {
    count: u64,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
            feeds: Mutex::new(HashMap::new()),
        }
    }

    fn endpoint(&self, table: &str, op: &str) -> String {
        format!(
            "{}/tables/{}/{}",
            self.base_url.trim_end_matches('/'),
            table,
            op
        )
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }

    async fn post_json(
        &self,
        table: &str,
        op: &str,
        body: &Value,
    ) -> Result<reqwest::Response, StoreError> {
        let req = self.client.post(self.endpoint(table, op)).json(body);
        let resp = self.apply_auth(req).send().await?;
        check_status(table, resp).await
    }
}

/// Map service status codes onto the error taxonomy.
async fn check_status(
    table: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    match status.as_u16() {
        404 => Err(StoreError::UnknownTable(table.to_string())),
        409 => Err(StoreError::Conflict(detail)),
        _ => Err(StoreError::Backend(format!("{status}: {detail}"))),
    }
}

#[async_trait]
impl RecordStore for HttpStore {
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let resp = self.post_json(table, "rows", &row).await?;
        Ok(resp.json().await?)
    }

    async fn select(&self, table: &str, query: Query) -> Result<Vec<Value>, StoreError> {
        let body = serde_json::to_value(&query)?;
        let resp = self.post_json(table, "query", &body).await?;
        Ok(resp.json().await?)
    }

    async fn update(&self, table: &str, query: Query, patch: Value) -> Result<u64, StoreError> {
        let body = json!({ "query": query, "patch": patch });
        let resp = self.post_json(table, "update", &body).await?;
        let body: AffectedBody = resp.json().await?;
        Ok(body.affected)
    }

    async fn delete(&self, table: &str, query: Query) -> Result<u64, StoreError> {
        let body = json!({ "query": query });
        let resp = self.post_json(table, "delete", &body).await?;
        let body: AffectedBody = resp.json().await?;
        Ok(body.affected)
    }

    async fn count(&self, table: &str, query: Query) -> Result<u64, StoreError> {
        let body = json!({ "query": query });
        let resp = self.post_json(table, "count", &body).await?;
        let body: CountBody = resp.json().await?;
        Ok(body.count)
    }

    fn subscribe(&self, table: &str) -> broadcast::Receiver<ChangeEvent> {
        let mut feeds = self.feeds.lock().unwrap();
        match feeds.get(table) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
                feeds.insert(table.to_string(), sender.clone());
                tokio::spawn(change_poll_loop(
                    self.client.clone(),
                    self.base_url.clone(),
                    self.api_key.clone(),
                    table.to_string(),
                    sender,
                ));
                receiver
            }
        }
    }
}

/// Poll the table's change feed forever, with exponential backoff on
/// failure.  One loop per table for the lifetime of the store.
async fn change_poll_loop(
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
    sender: broadcast::Sender<ChangeEvent>,
) {
    let mut cursor = 0u64;
    let mut consecutive_failures = 0u32;

    loop {
        let interval_secs = if consecutive_failures == 0 {
            CHANGE_POLL_INTERVAL_SECS
        } else {
            CHANGE_POLL_INTERVAL_SECS
                .saturating_mul(2u64.saturating_pow(consecutive_failures))
                .min(CHANGE_POLL_MAX_BACKOFF_SECS)
        };
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;

        match fetch_changes(&client, &base_url, api_key.as_deref(), &table, cursor).await {
            Ok(events) => {
                if consecutive_failures > 0 {
                    rlog!("changes: {} feed recovered", table);
                }
                consecutive_failures = 0;
                if !events.is_empty() {
                    rlog!("changes: fetched {} event(s) for {}", events.len(), table);
                }
                for event in events {
                    cursor = cursor.max(event.seq);
                    // No receivers is fine; the event is simply dropped.
                    let _ = sender.send(event);
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                let next_retry_secs = CHANGE_POLL_INTERVAL_SECS
                    .saturating_mul(2u64.saturating_pow(consecutive_failures))
                    .min(CHANGE_POLL_MAX_BACKOFF_SECS);
                rlog!(
                    "changes: {} feed poll failed (attempt {}, next retry in {}s): {}",
                    table,
                    consecutive_failures,
                    next_retry_secs,
                    e
                );
            }
        }
    }
}

async fn fetch_changes(
    client: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
    table: &str,
    since: u64,
) -> Result<Vec<ChangeEvent>, StoreError> {
    let url = format!(
        "{}/tables/{}/changes?since={}",
        base_url.trim_end_matches('/'),
        table,
        since
    );
    let mut req = client.get(&url);
    if let Some(key) = api_key {
        req = req.header("x-api-key", key);
    }
    let resp = req.send().await?;
    let resp = check_status(table, resp).await?;
    Ok(resp.json().await?)
}
