//! Conversation watcher.
//!
//! The UI-facing stateful wrapper over a conversation: fetches the row
//! once, then follows the conversations change feed, exposing
//! `{ loading, conversation }` through a `watch` cell the UI can borrow or
//! await.  A single task owns the state; change events flow through a
//! reducer guarded by the event sequence number, so a stale event can
//! never overwrite state produced by a newer one.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::alerts::{Alert, AlertSink};
use crate::logging;
use crate::messaging;
use crate::rlog;
use crate::rows::ConversationRow;
use crate::store::{tables, ChangeEvent, ChangeKind, RecordStore};

/// Snapshot of the watcher's view of one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub loading: bool,
    pub conversation: Option<ConversationRow>,
}

impl ConversationState {
    fn initial() -> Self {
        Self {
            loading: true,
            conversation: None,
        }
    }
}

/// Handle to a running watcher.  Dropping it tears the subscription down.
pub struct ConversationWatcher {
    rx: watch::Receiver<ConversationState>,
    task: JoinHandle<()>,
}

impl ConversationWatcher {
    /// Start watching `conversation_id`.  Fetch errors are logged, surfaced
    /// on `alerts`, and leave the state at `loading == false` with no
    /// conversation.
    pub fn spawn(
        store: Arc<dyn RecordStore>,
        alerts: AlertSink,
        conversation_id: impl Into<String>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        let (tx, rx) = watch::channel(ConversationState::initial());
        let task = tokio::spawn(run(store, alerts, conversation_id, tx));
        Self { rx, task }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConversationState {
        self.rx.borrow().clone()
    }

    /// A receiver the UI can `await` changes on.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.rx.clone()
    }

    /// Stop watching.  Equivalent to dropping the watcher.
    pub fn stop(self) {}
}

impl Drop for ConversationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    store: Arc<dyn RecordStore>,
    alerts: AlertSink,
    conversation_id: String,
    tx: watch::Sender<ConversationState>,
) {
    // Subscribe before the fetch so no event in between is missed.
    let mut events = store.subscribe(tables::CONVERSATIONS);

    match messaging::get_conversation(store.as_ref(), &conversation_id).await {
        Ok(conversation) => {
            tx.send_replace(ConversationState {
                loading: false,
                conversation,
            });
        }
        Err(e) => {
            rlog!(
                "watch: failed to load conversation {}: {}",
                logging::conv_id(&conversation_id),
                e
            );
            alerts.post(Alert::error("Error", "Failed to load conversation details"));
            tx.send_replace(ConversationState {
                loading: false,
                conversation: None,
            });
        }
    }

    let mut last_seq = 0u64;
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(conversation) = apply_event(&conversation_id, &mut last_seq, &event) {
                    tx.send_replace(ConversationState {
                        loading: false,
                        conversation,
                    });
                }
            }
            Err(RecvError::Lagged(n)) => {
                rlog!(
                    "watch: {} feed lagged, skipped {} event(s)",
                    logging::conv_id(&conversation_id),
                    n
                );
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// The reducer: decide what (if anything) an event does to the watched
/// conversation.  Returns the new projection, or `None` when the event is
/// ignored (other id, stale sequence, malformed payload).
fn apply_event(
    watched_id: &str,
    last_seq: &mut u64,
    event: &ChangeEvent,
) -> Option<Option<ConversationRow>> {
    let row_id = event.row.get("id").and_then(|v| v.as_str())?;
    if row_id != watched_id {
        return None;
    }
    if event.seq <= *last_seq {
        rlog!(
            "watch: ignoring stale event seq {} (seen {}) for {}",
            event.seq,
            last_seq,
            logging::conv_id(watched_id)
        );
        return None;
    }
    *last_seq = event.seq;

    match event.kind {
        ChangeKind::Delete => Some(None),
        ChangeKind::Insert | ChangeKind::Update => {
            match serde_json::from_value::<ConversationRow>(event.row.clone()) {
                Ok(conversation) => Some(Some(conversation)),
                Err(e) => {
                    rlog!(
                        "watch: malformed event payload for {}: {}",
                        logging::conv_id(watched_id),
                        e
                    );
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(seq: u64, kind: ChangeKind, row: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            seq,
            table: tables::CONVERSATIONS.to_string(),
            kind,
            row,
        }
    }

    fn conversation_json(id: &str, last_message_at: u64) -> serde_json::Value {
        json!({
            "id": id,
            "created_at": 1,
            "updated_at": last_message_at,
            "last_message_at": last_message_at,
        })
    }

    #[test]
    fn ignores_other_conversations() {
        let mut last_seq = 0;
        let ev = event(1, ChangeKind::Update, conversation_json("other", 5));
        assert_eq!(apply_event("mine", &mut last_seq, &ev), None);
        assert_eq!(last_seq, 0);
    }

    #[test]
    fn delete_clears_the_projection() {
        let mut last_seq = 0;
        let ev = event(3, ChangeKind::Delete, json!({"id": "mine"}));
        assert_eq!(apply_event("mine", &mut last_seq, &ev), Some(None));
        assert_eq!(last_seq, 3);
    }

    #[test]
    fn update_replaces_the_projection() {
        let mut last_seq = 0;
        let ev = event(2, ChangeKind::Update, conversation_json("mine", 9));
        let applied = apply_event("mine", &mut last_seq, &ev).expect("applied");
        assert_eq!(applied.expect("row").last_message_at, 9);
    }

    #[test]
    fn stale_sequence_numbers_are_ignored() {
        let mut last_seq = 0;
        let newer = event(5, ChangeKind::Update, conversation_json("mine", 50));
        let stale = event(4, ChangeKind::Update, conversation_json("mine", 40));
        assert!(apply_event("mine", &mut last_seq, &newer).is_some());
        assert_eq!(apply_event("mine", &mut last_seq, &stale), None);
        assert_eq!(last_seq, 5);
    }

    #[test]
    fn malformed_payloads_are_ignored() {
        let mut last_seq = 0;
        let ev = event(1, ChangeKind::Update, json!({"id": "mine"}));
        assert_eq!(apply_event("mine", &mut last_seq, &ev), None);
    }
}
