//! Conversation and message access functions.

use serde_json::json;

use crate::error::StoreError;
use crate::logging;
use crate::rlog;
use crate::rows::{ConversationRow, MessageRow, ParticipantRow};
use crate::store::{now_secs, select_maybe, tables, Query, RecordStore};

/// Find the direct conversation between two users, creating it (and both
/// participant rows) when none exists.
pub async fn get_or_create_conversation(
    store: &dyn RecordStore,
    user_a: &str,
    user_b: &str,
) -> Result<ConversationRow, StoreError> {
    let mine = store
        .select(
            tables::CONVERSATION_PARTICIPANTS,
            Query::new().eq("user_id", user_a),
        )
        .await?;
    let mut conversation_ids = Vec::with_capacity(mine.len());
    for row in mine {
        let participant: ParticipantRow = serde_json::from_value(row)?;
        conversation_ids.push(participant.conversation_id);
    }

    if !conversation_ids.is_empty() {
        let shared = select_maybe(
            store,
            tables::CONVERSATION_PARTICIPANTS,
            Query::new()
                .within("conversation_id", conversation_ids)
                .eq("user_id", user_b),
        )
        .await?;
        if let Some(row) = shared {
            let participant: ParticipantRow = serde_json::from_value(row)?;
            if let Some(existing) =
                get_conversation(store, &participant.conversation_id).await?
            {
                return Ok(existing);
            }
        }
    }

    let now = now_secs();
    let row = store
        .insert(
            tables::CONVERSATIONS,
            json!({ "updated_at": now, "last_message_at": now }),
        )
        .await?;
    let conversation: ConversationRow = serde_json::from_value(row)?;
    for user in [user_a, user_b] {
        store
            .insert(
                tables::CONVERSATION_PARTICIPANTS,
                json!({
                    "conversation_id": conversation.id,
                    "user_id": user,
                    "joined_at": now,
                }),
            )
            .await?;
    }
    Ok(conversation)
}

pub async fn get_conversation(
    store: &dyn RecordStore,
    conversation_id: &str,
) -> Result<Option<ConversationRow>, StoreError> {
    let row = select_maybe(
        store,
        tables::CONVERSATIONS,
        Query::new().eq("id", conversation_id),
    )
    .await?;
    row.map(serde_json::from_value).transpose().map_err(Into::into)
}

/// The user's conversations, most recently active first.
///
/// Two-phase read: resolve the user's participant rows first and
/// short-circuit to an empty list when there are none.
pub async fn list_conversations(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<ConversationRow>, StoreError> {
    let mine = store
        .select(
            tables::CONVERSATION_PARTICIPANTS,
            Query::new().eq("user_id", user_id),
        )
        .await?;
    if mine.is_empty() {
        return Ok(Vec::new());
    }
    let mut conversation_ids = Vec::with_capacity(mine.len());
    for row in mine {
        let participant: ParticipantRow = serde_json::from_value(row)?;
        conversation_ids.push(participant.conversation_id);
    }

    let rows = store
        .select(
            tables::CONVERSATIONS,
            Query::new()
                .within("id", conversation_ids)
                .order_desc("last_message_at"),
        )
        .await?;
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Send a text message.
///
/// The message insert is the primary write.  Bumping the conversation's
/// `last_message_at` afterwards is best-effort: a failure there is logged
/// and never fails the send.
pub async fn send_message(
    store: &dyn RecordStore,
    conversation_id: &str,
    sender_id: &str,
    content: &str,
) -> Result<MessageRow, StoreError> {
    let row = store
        .insert(
            tables::MESSAGES,
            json!({
                "conversation_id": conversation_id,
                "sender_id": sender_id,
                "content": content,
                "message_type": "text",
                "is_deleted": false,
            }),
        )
        .await?;
    let message: MessageRow = serde_json::from_value(row)?;

    let now = now_secs();
    if let Err(e) = store
        .update(
            tables::CONVERSATIONS,
            Query::new().eq("id", conversation_id),
            json!({ "last_message_at": now, "updated_at": now }),
        )
        .await
    {
        rlog!(
            "messaging: failed to bump last_message_at for {}: {}",
            logging::conv_id(conversation_id),
            e
        );
    }

    Ok(message)
}

/// Record that the user has read the conversation up to now.
pub async fn mark_conversation_read(
    store: &dyn RecordStore,
    conversation_id: &str,
    user_id: &str,
) -> Result<(), StoreError> {
    store
        .update(
            tables::CONVERSATION_PARTICIPANTS,
            Query::new()
                .eq("conversation_id", conversation_id)
                .eq("user_id", user_id),
            json!({ "last_read_at": now_secs() }),
        )
        .await?;
    Ok(())
}

/// Soft-delete a message; the row stays, `is_deleted` flips.
pub async fn delete_message(
    store: &dyn RecordStore,
    message_id: &str,
) -> Result<(), StoreError> {
    store
        .update(
            tables::MESSAGES,
            Query::new().eq("id", message_id),
            json!({ "is_deleted": true }),
        )
        .await?;
    Ok(())
}
