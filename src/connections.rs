//! Connection (networking) access functions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::profiles::{self, ProfileSummary};
use crate::rows::{ConnectionRow, ConnectionStatus};
use crate::store::{tables, Query, RecordStore};

/// An accepted connection joined with the counterpart's profile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionWithProfile {
    pub connection: ConnectionRow,
    /// The other side of the connection, from the queried user's point of
    /// view.  Absent when that user has no profile row.
    pub counterpart: Option<ProfileSummary>,
}

/// Insert a pending connection request.  No duplicate check here; whether
/// repeated requests are allowed is the store's call.
pub async fn send_connection_request(
    store: &dyn RecordStore,
    requester_id: &str,
    addressee_id: &str,
) -> Result<ConnectionRow, StoreError> {
    let row = store
        .insert(
            tables::CONNECTIONS,
            json!({
                "requester_id": requester_id,
                "addressee_id": addressee_id,
                "status": ConnectionStatus::Pending.as_str(),
            }),
        )
        .await?;
    Ok(serde_json::from_value(row)?)
}

/// Accepted connections where `user_id` is either side, each joined with
/// the counterpart's profile summary.
pub async fn get_connections(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<ConnectionWithProfile>, StoreError> {
    let as_requester = store
        .select(
            tables::CONNECTIONS,
            Query::new()
                .eq("requester_id", user_id)
                .eq("status", ConnectionStatus::Accepted.as_str()),
        )
        .await?;
    let as_addressee = store
        .select(
            tables::CONNECTIONS,
            Query::new()
                .eq("addressee_id", user_id)
                .eq("status", ConnectionStatus::Accepted.as_str()),
        )
        .await?;

    let mut connections = Vec::with_capacity(as_requester.len() + as_addressee.len());
    for row in as_requester.into_iter().chain(as_addressee) {
        connections.push(serde_json::from_value::<ConnectionRow>(row)?);
    }

    let counterpart_ids: Vec<String> = connections
        .iter()
        .map(|c| {
            if c.requester_id == user_id {
                c.addressee_id.clone()
            } else {
                c.requester_id.clone()
            }
        })
        .collect();
    let summaries = profiles::get_summaries(store, &counterpart_ids).await?;

    Ok(connections
        .into_iter()
        .zip(counterpart_ids)
        .map(|(connection, counterpart_id)| ConnectionWithProfile {
            counterpart: summaries.get(&counterpart_id).cloned(),
            connection,
        })
        .collect())
}

/// Pending requests addressed to `user_id`.
pub async fn get_pending_requests(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<ConnectionRow>, StoreError> {
    let rows = store
        .select(
            tables::CONNECTIONS,
            Query::new()
                .eq("addressee_id", user_id)
                .eq("status", ConnectionStatus::Pending.as_str()),
        )
        .await?;
    rows.into_iter()
        .map(|row: Value| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Respond to a request by setting its status (accepted or rejected).
///
/// The caller's identity is not checked against the addressee; access
/// policy is the store's responsibility.
pub async fn respond_to_request(
    store: &dyn RecordStore,
    connection_id: &str,
    status: ConnectionStatus,
) -> Result<(), StoreError> {
    let affected = store
        .update(
            tables::CONNECTIONS,
            Query::new().eq("id", connection_id),
            json!({ "status": status.as_str() }),
        )
        .await?;
    if affected == 0 {
        return Err(StoreError::NotFound(format!(
            "connection {connection_id}"
        )));
    }
    Ok(())
}
