//! Notification outbox.
//!
//! Likes and comments notify the post's author, but that write is
//! best-effort: it must never fail, delay, or roll back the primary
//! operation.  Instead of an inline fire-and-forget call, jobs go onto a
//! queue owned by a worker task with its own retry policy.  The worker
//! reads the post's author and the actor's display name, skips self
//! notifications, and inserts the notification row; any failure is retried
//! with exponential backoff and finally logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::{NOTIFY_MAX_ATTEMPTS, NOTIFY_RETRY_BASE_MS};
use crate::error::StoreError;
use crate::logging;
use crate::rlog;
use crate::store::{select_maybe, tables, Query, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Like,
    Comment,
}

impl JobKind {
    fn type_tag(&self) -> &'static str {
        match self {
            JobKind::Like => "like",
            JobKind::Comment => "comment",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            JobKind::Like => "liked",
            JobKind::Comment => "commented on",
        }
    }
}

/// A pending author notification.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    kind: JobKind,
    post_id: String,
    actor_id: String,
}

impl NotificationJob {
    pub fn like(post_id: &str, actor_id: &str) -> Self {
        Self {
            kind: JobKind::Like,
            post_id: post_id.to_string(),
            actor_id: actor_id.to_string(),
        }
    }

    pub fn comment(post_id: &str, actor_id: &str) -> Self {
        Self {
            kind: JobKind::Comment,
            post_id: post_id.to_string(),
            actor_id: actor_id.to_string(),
        }
    }
}

/// Per-job delivery retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NOTIFY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(NOTIFY_RETRY_BASE_MS),
        }
    }
}

enum Command {
    Deliver(NotificationJob),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle onto the outbox queue.
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl NotifierHandle {
    /// Enqueue a job.  A closed queue means the worker is gone; the job is
    /// logged and dropped, never surfaced to the primary operation.
    pub fn enqueue(&self, job: NotificationJob) {
        if self.tx.send(Command::Deliver(job)).is_err() {
            rlog!("notify: queue closed, job dropped");
        }
    }

    /// Wait until every job enqueued before this call has been processed.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Spawn the outbox worker.  The worker runs until every handle is dropped
/// and the queue drains.
pub fn spawn(store: Arc<dyn RecordStore>, policy: RetryPolicy) -> NotifierHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Deliver(job) => deliver_with_retry(store.as_ref(), &policy, job).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });
    NotifierHandle { tx }
}

enum Outcome {
    Delivered,
    /// Nothing to do: the post or actor vanished, or the actor is the
    /// post's own author.
    Skipped,
}

async fn deliver_with_retry(store: &dyn RecordStore, policy: &RetryPolicy, job: NotificationJob) {
    let max = policy.max_attempts.max(1);
    for attempt in 1..=max {
        match try_deliver(store, &job).await {
            Ok(Outcome::Delivered) => {
                rlog!(
                    "notify: delivered {} notification for {} from {}",
                    job.kind.type_tag(),
                    logging::post_id(&job.post_id),
                    logging::user_id(&job.actor_id)
                );
                return;
            }
            Ok(Outcome::Skipped) => return,
            Err(e) => {
                rlog!(
                    "notify: attempt {}/{} for {} notification on {} failed: {}",
                    attempt,
                    max,
                    job.kind.type_tag(),
                    logging::post_id(&job.post_id),
                    e
                );
                if attempt < max {
                    let delay = policy.base_delay * 2u32.saturating_pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    rlog!(
        "notify: giving up on {} notification for {}",
        job.kind.type_tag(),
        logging::post_id(&job.post_id)
    );
}

async fn try_deliver(store: &dyn RecordStore, job: &NotificationJob) -> Result<Outcome, StoreError> {
    let post = select_maybe(store, tables::POSTS, Query::new().eq("id", job.post_id.as_str()))
        .await?;
    let Some(post) = post else {
        return Ok(Outcome::Skipped);
    };
    let author_id = post
        .get("author_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if author_id.is_empty() || author_id == job.actor_id {
        return Ok(Outcome::Skipped);
    }

    let actor = select_maybe(
        store,
        tables::PROFILES,
        Query::new().eq("user_id", job.actor_id.as_str()),
    )
    .await?;
    let Some(actor) = actor else {
        return Ok(Outcome::Skipped);
    };
    let name = actor
        .get("full_name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Someone");

    store
        .insert(
            tables::NOTIFICATIONS,
            serde_json::json!({
                "user_id": author_id,
                "from_user_id": job.actor_id,
                "type": job.kind.type_tag(),
                "post_id": job.post_id,
                "message": format!("{} {} your post", name, job.kind.verb()),
            }),
        )
        .await?;
    Ok(Outcome::Delivered)
}
