//! Post access functions.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::StoreError;
use crate::profiles::{self, ProfileSummary};
use crate::rows::PostRow;
use crate::store::{select_maybe, tables, Query, RecordStore};

/// A post joined with its author's profile summary.  The author can be
/// absent when no profile row exists for the author id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAuthor {
    pub post: PostRow,
    pub author: Option<ProfileSummary>,
}

pub async fn create_post(
    store: &dyn RecordStore,
    author_id: &str,
    content: &str,
    image_url: Option<&str>,
) -> Result<PostRow, StoreError> {
    let row = store
        .insert(
            tables::POSTS,
            json!({
                "author_id": author_id,
                "content": content,
                "image_url": image_url,
            }),
        )
        .await?;
    Ok(serde_json::from_value(row)?)
}

pub async fn get_post(
    store: &dyn RecordStore,
    post_id: &str,
) -> Result<Option<PostRow>, StoreError> {
    let row = select_maybe(store, tables::POSTS, Query::new().eq("id", post_id)).await?;
    row.map(serde_json::from_value).transpose().map_err(Into::into)
}

/// Posts for the given ids, newest first, each joined with its author's
/// profile summary.
pub async fn list_posts_by_ids(
    store: &dyn RecordStore,
    post_ids: &[String],
) -> Result<Vec<PostWithAuthor>, StoreError> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store
        .select(
            tables::POSTS,
            Query::new()
                .within("id", post_ids.to_vec())
                .order_desc("created_at"),
        )
        .await?;

    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        posts.push(serde_json::from_value::<PostRow>(row)?);
    }

    let author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
    let summaries = profiles::get_summaries(store, &author_ids).await?;

    Ok(posts
        .into_iter()
        .map(|post| {
            let author = summaries.get(&post.author_id).cloned();
            PostWithAuthor { post, author }
        })
        .collect())
}
