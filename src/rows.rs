//! Row types mirroring the hosted record-store tables.
//!
//! The client holds no authoritative state: these structs are projections of
//! remote rows, referenced by identifier, deserialized from the JSON the
//! store returns.  Timestamps are seconds since the UNIX epoch.

use serde::{Deserialize, Serialize};

/// Connection request / acceptance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
        }
    }
}

/// Connection row. Status transitions are one-way requests responded to
/// exactly once; the store owns enforcement, not this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub id: String,
    pub requester_id: String,
    pub addressee_id: String,
    pub status: ConnectionStatus,
    pub created_at: u64,
}

/// Like row; (post_id, user_id) is unique on the store side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: u64,
}

/// Saved-post row; (user_id, post_id) is unique on the store side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPostRow {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub created_at: u64,
}

/// Comment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: u64,
}

/// Post row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: u64,
}

/// Profile row keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub current_position: Option<String>,
}

/// Notification row. Created as a best-effort side effect of a like or a
/// comment; its absence never invalidates the triggering write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    /// Recipient.
    pub user_id: String,
    pub from_user_id: String,
    /// "like" or "comment".
    #[serde(rename = "type")]
    pub notification_type: String,
    pub post_id: String,
    pub message: String,
    pub created_at: u64,
}

/// Conversation row. Watcher state is a cached, possibly-stale projection
/// of this, updated by change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRow {
    pub id: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub last_message_at: u64,
}

/// Membership row linking a user to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub joined_at: u64,
    #[serde(default)]
    pub last_read_at: Option<u64>,
}

/// Message row. Deletion is soft: `is_deleted` flips, the row stays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub content: Option<String>,
    /// "text", "image", or "file".
    pub message_type: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: u64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
}
