//! Comment access functions.
//!
//! Same two-phase shape as likes: the comment row is the primary write,
//! the author notification goes through the outbox.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::StoreError;
use crate::logging;
use crate::notifier::{NotificationJob, NotifierHandle};
use crate::profiles::{self, ProfileSummary};
use crate::rlog;
use crate::rows::CommentRow;
use crate::store::{tables, Query, RecordStore};

/// A comment joined with the commenter's profile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub comment: CommentRow,
    pub author: Option<ProfileSummary>,
}

/// Insert a comment (content trimmed) and enqueue the author notification.
/// The result reflects only the comment write.
pub async fn create_comment(
    store: &dyn RecordStore,
    notifier: &NotifierHandle,
    post_id: &str,
    user_id: &str,
    content: &str,
) -> Result<CommentRow, StoreError> {
    let row = store
        .insert(
            tables::COMMENTS,
            json!({
                "post_id": post_id,
                "user_id": user_id,
                "content": content.trim(),
            }),
        )
        .await?;
    let comment: CommentRow = serde_json::from_value(row)?;
    notifier.enqueue(NotificationJob::comment(post_id, user_id));
    Ok(comment)
}

/// Comments on a post, oldest first, joined with commenter summaries.
/// Degrades to an empty list on any query error.
pub async fn get_comments(store: &dyn RecordStore, post_id: &str) -> Vec<CommentWithAuthor> {
    match get_comments_inner(store, post_id).await {
        Ok(comments) => comments,
        Err(e) => {
            rlog!(
                "comments: list query for {} degraded to empty: {}",
                logging::post_id(post_id),
                e
            );
            Vec::new()
        }
    }
}

async fn get_comments_inner(
    store: &dyn RecordStore,
    post_id: &str,
) -> Result<Vec<CommentWithAuthor>, StoreError> {
    let rows = store
        .select(
            tables::COMMENTS,
            Query::new().eq("post_id", post_id).order_asc("created_at"),
        )
        .await?;

    let mut comments = Vec::with_capacity(rows.len());
    for row in rows {
        comments.push(serde_json::from_value::<CommentRow>(row)?);
    }

    let user_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
    let summaries = profiles::get_summaries(store, &user_ids).await?;

    Ok(comments
        .into_iter()
        .map(|comment| CommentWithAuthor {
            author: summaries.get(&comment.user_id).cloned(),
            comment,
        })
        .collect())
}

/// Head-only comment count for a post.
pub async fn comments_count(store: &dyn RecordStore, post_id: &str) -> Result<u64, StoreError> {
    store
        .count(tables::COMMENTS, Query::new().eq("post_id", post_id))
        .await
}

/// Update a comment's content, scoped to the owning user.  Returns the
/// affected count (0 when the comment is missing or owned by someone else).
pub async fn update_comment(
    store: &dyn RecordStore,
    comment_id: &str,
    user_id: &str,
    content: &str,
) -> Result<u64, StoreError> {
    store
        .update(
            tables::COMMENTS,
            Query::new().eq("id", comment_id).eq("user_id", user_id),
            json!({ "content": content.trim() }),
        )
        .await
}

/// Delete a comment, scoped to the owning user.
pub async fn delete_comment(
    store: &dyn RecordStore,
    comment_id: &str,
    user_id: &str,
) -> Result<u64, StoreError> {
    store
        .delete(
            tables::COMMENTS,
            Query::new().eq("id", comment_id).eq("user_id", user_id),
        )
        .await
}
