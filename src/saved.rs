//! Saved-post access functions.
//!
//! Read paths here are deliberately forgiving (a missing row is `false`,
//! other errors are logged and resolve to `false`); the write paths raise,
//! since a failed save/unsave must reach the caller.

use serde_json::json;

use crate::error::StoreError;
use crate::logging;
use crate::posts::{self, PostWithAuthor};
use crate::rlog;
use crate::rows::SavedPostRow;
use crate::store::{select_maybe, tables, Query, RecordStore};

/// Whether the user has saved the post.
///
/// Absence of the row is the expected "not saved" answer.  Any other store
/// error is logged and also resolves to `false`; the bookmark state is not
/// worth surfacing a failure over.
pub async fn is_post_saved(store: &dyn RecordStore, user_id: &str, post_id: &str) -> bool {
    let query = Query::new().eq("user_id", user_id).eq("post_id", post_id);
    match select_maybe(store, tables::SAVED_POSTS, query).await {
        Ok(row) => row.is_some(),
        Err(e) => {
            rlog!(
                "saved: existence check for {} failed: {}",
                logging::post_id(post_id),
                e
            );
            false
        }
    }
}

/// Save a post for the user.  Errors (including duplicate-save conflicts)
/// are raised to the caller.
pub async fn save_post(
    store: &dyn RecordStore,
    user_id: &str,
    post_id: &str,
) -> Result<SavedPostRow, StoreError> {
    let row = store
        .insert(
            tables::SAVED_POSTS,
            json!({ "user_id": user_id, "post_id": post_id }),
        )
        .await?;
    Ok(serde_json::from_value(row)?)
}

/// Remove a saved post.  Errors are raised to the caller.
pub async fn unsave_post(
    store: &dyn RecordStore,
    user_id: &str,
    post_id: &str,
) -> Result<(), StoreError> {
    store
        .delete(
            tables::SAVED_POSTS,
            Query::new().eq("user_id", user_id).eq("post_id", post_id),
        )
        .await?;
    Ok(())
}

/// Post ids the user has saved.
pub async fn get_saved_post_ids(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<String>, StoreError> {
    let rows = store
        .select(
            tables::SAVED_POSTS,
            Query::new().eq("user_id", user_id),
        )
        .await?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        let saved: SavedPostRow = serde_json::from_value(row)?;
        ids.push(saved.post_id);
    }
    Ok(ids)
}

/// The user's saved posts with author profiles, newest first.
///
/// Two-phase read: resolve the saved ids first and short-circuit to an
/// empty list — issuing no posts query — when there are none.
pub async fn get_saved_posts(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<PostWithAuthor>, StoreError> {
    let post_ids = get_saved_post_ids(store, user_id).await?;
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }
    posts::list_posts_by_ids(store, &post_ids).await
}
