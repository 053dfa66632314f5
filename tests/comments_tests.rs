//! Comment flow tests.

use std::sync::Arc;
use std::time::Duration;

use ripple::comments;
use ripple::notifier::{self, RetryPolicy};
use ripple::posts;
use ripple::profiles;
use ripple::rows::ProfileRow;
use ripple::store::{tables, MemoryStore, Query, RecordStore};

const AUTHOR: &str = "author-1";
const COMMENTER: &str = "commenter-1";

async fn seed_post(store: &MemoryStore) -> String {
    for (user, name) in [(AUTHOR, "Avery Author"), (COMMENTER, "Cody Commenter")] {
        profiles::upsert_profile(
            store,
            &ProfileRow {
                user_id: user.to_string(),
                full_name: Some(name.to_string()),
                avatar_url: None,
                current_position: None,
            },
        )
        .await
        .expect("profile");
    }
    posts::create_post(store, AUTHOR, "hello world", None)
        .await
        .expect("post")
        .id
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn comments_are_trimmed_and_listed_oldest_first() {
    let store = Arc::new(MemoryStore::new());
    let notifier = notifier::spawn(store.clone(), fast_retries());
    let post_id = seed_post(&store).await;

    comments::create_comment(&*store, &notifier, &post_id, COMMENTER, "  first!  ")
        .await
        .expect("comment");
    comments::create_comment(&*store, &notifier, &post_id, AUTHOR, "second")
        .await
        .expect("comment");

    let listed = comments::get_comments(&*store, &post_id).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].comment.content, "first!");
    assert_eq!(listed[1].comment.content, "second");
    assert_eq!(
        listed[0].author.as_ref().and_then(|a| a.full_name.as_deref()),
        Some("Cody Commenter")
    );

    assert_eq!(
        comments::comments_count(&*store, &post_id).await.expect("count"),
        2
    );
}

#[tokio::test]
async fn commenting_notifies_only_foreign_authors() {
    let store = Arc::new(MemoryStore::new());
    let notifier = notifier::spawn(store.clone(), fast_retries());
    let post_id = seed_post(&store).await;

    comments::create_comment(&*store, &notifier, &post_id, AUTHOR, "my own post")
        .await
        .expect("self comment");
    comments::create_comment(&*store, &notifier, &post_id, COMMENTER, "nice one")
        .await
        .expect("comment");
    notifier.flush().await;

    let rows = store
        .select(tables::NOTIFICATIONS, Query::new())
        .await
        .expect("select");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], AUTHOR);
    assert_eq!(rows[0]["type"], "comment");
    assert_eq!(rows[0]["message"], "Cody Commenter commented on your post");
}

#[tokio::test]
async fn edits_and_deletes_are_scoped_to_the_owner() {
    let store = Arc::new(MemoryStore::new());
    let notifier = notifier::spawn(store.clone(), fast_retries());
    let post_id = seed_post(&store).await;

    let comment = comments::create_comment(&*store, &notifier, &post_id, COMMENTER, "draft")
        .await
        .expect("comment");

    // Someone else cannot touch it.
    assert_eq!(
        comments::update_comment(&*store, &comment.id, AUTHOR, "hijacked")
            .await
            .expect("update"),
        0
    );
    assert_eq!(
        comments::delete_comment(&*store, &comment.id, AUTHOR)
            .await
            .expect("delete"),
        0
    );

    // The owner can.
    assert_eq!(
        comments::update_comment(&*store, &comment.id, COMMENTER, " final ")
            .await
            .expect("update"),
        1
    );
    let listed = comments::get_comments(&*store, &post_id).await;
    assert_eq!(listed[0].comment.content, "final");

    assert_eq!(
        comments::delete_comment(&*store, &comment.id, COMMENTER)
            .await
            .expect("delete"),
        1
    );
    assert!(comments::get_comments(&*store, &post_id).await.is_empty());
}

#[tokio::test]
async fn listing_degrades_to_empty_on_query_error() {
    let store = Arc::new(MemoryStore::new());
    let post_id = seed_post(&store).await;
    store.set_fail(tables::COMMENTS, true);

    assert!(comments::get_comments(&*store, &post_id).await.is_empty());
}
