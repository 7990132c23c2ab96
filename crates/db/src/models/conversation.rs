//! Conversation and message models.

use empathy_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `conversations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub is_archived: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateConversation {
    pub user_id: DbId,
    pub title: String,
}

#[derive(Debug, Default)]
pub struct UpdateConversation {
    pub title: Option<String>,
    pub is_archived: Option<bool>,
}

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub role: String,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateMessage {
    pub conversation_id: DbId,
    pub role: String,
    pub content: String,
}

/// A conversation together with its messages, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}
