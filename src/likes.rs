//! Like access functions.
//!
//! Liking is two-phase: the like row is the primary write and the only
//! thing the caller's result reflects; the author notification is handed to
//! the outbox and delivered (or dropped) out of band.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::StoreError;
use crate::logging;
use crate::notifier::{NotificationJob, NotifierHandle};
use crate::profiles::{self, ProfileSummary};
use crate::rlog;
use crate::rows::LikeRow;
use crate::store::{tables, Query, RecordStore};

/// A liker joined with their profile summary, for the "liked by" view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liker {
    pub user_id: String,
    pub liked_at: u64,
    pub profile: Option<ProfileSummary>,
}

/// Insert a like and enqueue the author notification.
///
/// The returned result reflects only the like write: an insert failure
/// propagates and nothing is enqueued (no notification without a
/// successful like), while notification delivery failures stay inside the
/// outbox and never surface here.
pub async fn like_post(
    store: &dyn RecordStore,
    notifier: &NotifierHandle,
    post_id: &str,
    user_id: &str,
) -> Result<LikeRow, StoreError> {
    let row = store
        .insert(
            tables::LIKES,
            json!({ "post_id": post_id, "user_id": user_id }),
        )
        .await?;
    let like: LikeRow = serde_json::from_value(row)?;
    notifier.enqueue(NotificationJob::like(post_id, user_id));
    Ok(like)
}

/// Delete the matching like.  No notification cleanup.
pub async fn unlike_post(
    store: &dyn RecordStore,
    post_id: &str,
    user_id: &str,
) -> Result<(), StoreError> {
    store
        .delete(
            tables::LIKES,
            Query::new().eq("post_id", post_id).eq("user_id", user_id),
        )
        .await?;
    Ok(())
}

/// Head-only like count for a post.
pub async fn likes_count(store: &dyn RecordStore, post_id: &str) -> Result<u64, StoreError> {
    store
        .count(tables::LIKES, Query::new().eq("post_id", post_id))
        .await
}

/// Whether the pair has a like row.  Absence is `false`, not an error.
pub async fn has_liked(
    store: &dyn RecordStore,
    post_id: &str,
    user_id: &str,
) -> Result<bool, StoreError> {
    let count = store
        .count(
            tables::LIKES,
            Query::new().eq("post_id", post_id).eq("user_id", user_id),
        )
        .await?;
    Ok(count > 0)
}

/// Likers of a post, newest first, joined with profile summaries.
///
/// Degrades to an empty list on any query error: the "liked by" popover is
/// not worth failing a page over.
pub async fn get_likers(store: &dyn RecordStore, post_id: &str) -> Vec<Liker> {
    match get_likers_inner(store, post_id).await {
        Ok(likers) => likers,
        Err(e) => {
            rlog!(
                "likes: likers query for {} degraded to empty: {}",
                logging::post_id(post_id),
                e
            );
            Vec::new()
        }
    }
}

async fn get_likers_inner(
    store: &dyn RecordStore,
    post_id: &str,
) -> Result<Vec<Liker>, StoreError> {
    let rows = store
        .select(
            tables::LIKES,
            Query::new().eq("post_id", post_id).order_desc("created_at"),
        )
        .await?;

    let mut likes = Vec::with_capacity(rows.len());
    for row in rows {
        likes.push(serde_json::from_value::<LikeRow>(row)?);
    }

    let user_ids: Vec<String> = likes.iter().map(|l| l.user_id.clone()).collect();
    let summaries = profiles::get_summaries(store, &user_ids).await?;

    Ok(likes
        .into_iter()
        .map(|like| Liker {
            profile: summaries.get(&like.user_id).cloned(),
            user_id: like.user_id,
            liked_at: like.created_at,
        })
        .collect())
}
