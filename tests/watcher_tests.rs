//! Conversation watcher tests: initial load, event application, and the
//! alert path, end to end against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use ripple::alerts::{self, Severity};
use ripple::store::{tables, MemoryStore, Query, RecordStore};
use ripple::watcher::{ConversationState, ConversationWatcher};

const WATCHED: &str = "conv-1";

async fn seed_conversation(store: &MemoryStore, id: &str) {
    store
        .insert(
            tables::CONVERSATIONS,
            json!({
                "id": id,
                "created_at": 1,
                "updated_at": 1,
                "last_message_at": 1,
            }),
        )
        .await
        .expect("conversation");
}

async fn wait_for(
    watcher: &ConversationWatcher,
    predicate: impl FnMut(&ConversationState) -> bool,
) -> ConversationState {
    let mut rx = watcher.subscribe();
    let state = timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("state change within 2s")
        .expect("watcher alive")
        .clone();
    state
}

#[tokio::test]
async fn loads_the_watched_conversation() {
    let store = Arc::new(MemoryStore::new());
    seed_conversation(&store, WATCHED).await;
    let (sink, _alerts) = alerts::channel();

    let watcher = ConversationWatcher::spawn(store.clone(), sink, WATCHED);
    let state = wait_for(&watcher, |s| !s.loading).await;
    assert_eq!(state.conversation.expect("loaded").id, WATCHED);
}

#[tokio::test]
async fn missing_conversations_load_as_none_without_alerts() {
    let store = Arc::new(MemoryStore::new());
    let (sink, mut alert_rx) = alerts::channel();

    let watcher = ConversationWatcher::spawn(store.clone(), sink, "nope");
    let state = wait_for(&watcher, |s| !s.loading).await;
    assert!(state.conversation.is_none());
    assert!(alert_rx.try_recv().is_err());
}

#[tokio::test]
async fn update_events_replace_the_projection() {
    let store = Arc::new(MemoryStore::new());
    seed_conversation(&store, WATCHED).await;
    let (sink, _alerts) = alerts::channel();

    let watcher = ConversationWatcher::spawn(store.clone(), sink, WATCHED);
    wait_for(&watcher, |s| !s.loading).await;

    store
        .update(
            tables::CONVERSATIONS,
            Query::new().eq("id", WATCHED),
            json!({"last_message_at": 99}),
        )
        .await
        .expect("update");

    let state = wait_for(&watcher, |s| {
        s.conversation
            .as_ref()
            .map(|c| c.last_message_at == 99)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(state.conversation.expect("row").id, WATCHED);
}

#[tokio::test]
async fn delete_events_clear_the_projection() {
    let store = Arc::new(MemoryStore::new());
    seed_conversation(&store, WATCHED).await;
    let (sink, _alerts) = alerts::channel();

    let watcher = ConversationWatcher::spawn(store.clone(), sink, WATCHED);
    wait_for(&watcher, |s| !s.loading).await;

    store
        .delete(tables::CONVERSATIONS, Query::new().eq("id", WATCHED))
        .await
        .expect("delete");

    let state = wait_for(&watcher, |s| !s.loading && s.conversation.is_none()).await;
    assert!(state.conversation.is_none());
}

#[tokio::test]
async fn events_for_other_conversations_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    seed_conversation(&store, WATCHED).await;
    let (sink, _alerts) = alerts::channel();

    let watcher = ConversationWatcher::spawn(store.clone(), sink, WATCHED);
    wait_for(&watcher, |s| !s.loading).await;

    // An unrelated conversation appears, then the watched one changes.
    seed_conversation(&store, "conv-other").await;
    store
        .update(
            tables::CONVERSATIONS,
            Query::new().eq("id", WATCHED),
            json!({"last_message_at": 42}),
        )
        .await
        .expect("update");

    let state = wait_for(&watcher, |s| {
        s.conversation
            .as_ref()
            .map(|c| c.last_message_at == 42)
            .unwrap_or(false)
    })
    .await;
    // The unrelated insert never replaced the projection.
    assert_eq!(state.conversation.expect("row").id, WATCHED);
}

#[tokio::test]
async fn fetch_errors_alert_and_settle_unloaded() {
    let store = Arc::new(MemoryStore::new());
    store.set_fail(tables::CONVERSATIONS, true);
    let (sink, mut alert_rx) = alerts::channel();

    let watcher = ConversationWatcher::spawn(store.clone(), sink, WATCHED);
    let state = wait_for(&watcher, |s| !s.loading).await;
    assert!(state.conversation.is_none());

    let alert = timeout(Duration::from_secs(2), alert_rx.recv())
        .await
        .expect("alert within 2s")
        .expect("alert");
    assert_eq!(alert.severity, Severity::Error);
    assert_eq!(alert.title, "Error");
    assert_eq!(alert.description, "Failed to load conversation details");
}
