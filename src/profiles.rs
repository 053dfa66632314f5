//! Profile reads used by the join paths, plus the profile upsert.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::rows::ProfileRow;
use crate::store::{select_maybe, tables, Query, RecordStore};

/// The subset of a profile the feed and join views need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<ProfileRow> for ProfileSummary {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        }
    }
}

pub async fn get_profile(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Option<ProfileRow>, StoreError> {
    let row = select_maybe(
        store,
        tables::PROFILES,
        Query::new().eq("user_id", user_id),
    )
    .await?;
    row.map(serde_json::from_value).transpose().map_err(Into::into)
}

pub async fn get_summary(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Option<ProfileSummary>, StoreError> {
    Ok(get_profile(store, user_id).await?.map(Into::into))
}

/// Summaries for a batch of users, keyed by user id.  Users without a
/// profile row are simply absent from the map.
pub async fn get_summaries(
    store: &dyn RecordStore,
    user_ids: &[String],
) -> Result<HashMap<String, ProfileSummary>, StoreError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = store
        .select(
            tables::PROFILES,
            Query::new().within("user_id", user_ids.to_vec()),
        )
        .await?;
    let mut map = HashMap::new();
    for row in rows {
        let profile: ProfileRow = serde_json::from_value(row)?;
        map.insert(profile.user_id.clone(), profile.into());
    }
    Ok(map)
}

/// Insert or update a profile row for `user_id`.
pub async fn upsert_profile(store: &dyn RecordStore, row: &ProfileRow) -> Result<(), StoreError> {
    let patch: Value = serde_json::to_value(row)?;
    let affected = store
        .update(
            tables::PROFILES,
            Query::new().eq("user_id", row.user_id.as_str()),
            patch.clone(),
        )
        .await?;
    if affected == 0 {
        store.insert(tables::PROFILES, patch).await?;
    }
    Ok(())
}
