//! Handlers for `/conversations` and their messages.
//!
//! Conversations belong to the caller. Someone else's conversation answers
//! 404 exactly like a missing one, so ids cannot be probed. Admins may read
//! any conversation but only the owner may change it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use empathy_core::audit::action_types;
use empathy_core::conversation::{
    build_prompt, normalize_title, validate_content, ChatMessage, CONTEXT_WINDOW, ROLE_ASSISTANT,
    ROLE_USER,
};
use empathy_core::error::CoreError;
use empathy_core::types::DbId;
use empathy_db::models::conversation::{
    Conversation, ConversationWithMessages, CreateConversation, CreateMessage, Message,
    UpdateConversation,
};
use empathy_db::repositories::{ConversationRepo, MessageRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListConversationsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConversationRequest {
    pub title: Option<String>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 8000, message = "must be between 1 and 8000 characters"))]
    pub content: String,
    #[serde(default)]
    pub request_reply: bool,
}

/// The stored user message and, when requested, the assistant's reply.
#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub message: Message,
    pub reply: Option<Message>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// GET /api/v1/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListConversationsParams>,
) -> AppResult<Json<DataResponse<Vec<Conversation>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let conversations = ConversationRepo::list_for_user(
        &state.pool,
        user.user_id,
        params.include_archived,
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse {
        data: conversations,
    }))
}

/// POST /api/v1/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<CreateConversationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Conversation>>)> {
    let title = normalize_title(input.title.as_deref()).map_err(CoreError::Validation)?;
    let conversation = ConversationRepo::create(
        &state.pool,
        &CreateConversation {
            user_id: user.user_id,
            title,
        },
    )
    .await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_CREATE)
                .actor(user.user_id)
                .entity("conversation", conversation.id)
                .meta(&meta),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: conversation }),
    ))
}

/// GET /api/v1/conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConversationWithMessages>>> {
    let conversation = find_readable(&state, &user, id).await?;
    let messages = MessageRepo::list_for_conversation(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ConversationWithMessages {
            conversation,
            messages,
        },
    }))
}

/// PUT /api/v1/conversations/{id}
pub async fn update_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateConversationRequest>,
) -> AppResult<Json<DataResponse<Conversation>>> {
    find_owned(&state, &user, id).await?;

    // An explicit blank title resets to the default.
    let title = input
        .title
        .as_deref()
        .map(|t| normalize_title(Some(t)))
        .transpose()
        .map_err(CoreError::Validation)?;

    let conversation = ConversationRepo::update(
        &state.pool,
        id,
        &UpdateConversation {
            title,
            is_archived: input.is_archived,
        },
    )
    .await?
    .ok_or(CoreError::NotFound {
        entity: "Conversation",
        id,
    })?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_UPDATE)
                .actor(user.user_id)
                .entity("conversation", id)
                .details(json!({ "is_archived": conversation.is_archived }))
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: conversation }))
}

/// DELETE /api/v1/conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_owned(&state, &user, id).await?;
    if !ConversationRepo::soft_delete(&state.pool, id).await? {
        return Err(CoreError::NotFound {
            entity: "Conversation",
            id,
        }
        .into());
    }

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_DELETE)
                .actor(user.user_id)
                .entity("conversation", id)
                .meta(&meta),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// GET /api/v1/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Message>>>> {
    find_readable(&state, &user, id).await?;
    let messages = MessageRepo::list_for_conversation(&state.pool, id).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/conversations/{id}/messages
///
/// Stores the user's message. With `request_reply` the recent history goes
/// to the AI provider and its answer is stored as an assistant message. A
/// provider failure leaves the user message stored and audited, and answers
/// 502.
pub async fn post_message(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PostMessageResponse>>)> {
    validate_content(&input.content).map_err(CoreError::Validation)?;

    let conversation = find_owned(&state, &user, id).await?;
    if conversation.is_archived {
        return Err(
            CoreError::Conflict("Archived conversations do not accept new messages".into()).into(),
        );
    }

    let message = MessageRepo::create(
        &state.pool,
        &CreateMessage {
            conversation_id: id,
            role: ROLE_USER.to_string(),
            content: input.content,
        },
    )
    .await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::MESSAGE_CREATE)
                .actor(user.user_id)
                .entity("message", message.id)
                .details(json!({
                    "conversation_id": id,
                    "message_length": message.content.chars().count(),
                    "reply_requested": input.request_reply,
                }))
                .meta(&meta),
        )
        .await;
    ConversationRepo::touch(&state.pool, id).await?;

    let reply = if input.request_reply {
        Some(request_reply(&state, &user, &meta, id).await?)
    } else {
        None
    };

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: PostMessageResponse { message, reply },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Ask the provider to answer the recent history and store the reply.
///
/// The outcome is audited as `ai_chat` whether or not the provider answers.
async fn request_reply(
    state: &AppState,
    user: &AuthUser,
    meta: &RequestMeta,
    conversation_id: DbId,
) -> AppResult<Message> {
    let history: Vec<ChatMessage> =
        MessageRepo::recent(&state.pool, conversation_id, CONTEXT_WINDOW as i64)
            .await?
            .into_iter()
            .map(|m| ChatMessage::new(&m.role, m.content))
            .collect();

    let answer = match state.ai.chat(&build_prompt(&history)).await {
        Ok(answer) => answer,
        Err(e) => {
            state
                .audit
                .record(
                    AuditEvent::new(action_types::AI_CHAT)
                        .failure()
                        .actor(user.user_id)
                        .entity("conversation", conversation_id)
                        .meta(meta),
                )
                .await;
            return Err(e.into());
        }
    };

    let stored = MessageRepo::create(
        &state.pool,
        &CreateMessage {
            conversation_id,
            role: ROLE_ASSISTANT.to_string(),
            content: answer,
        },
    )
    .await?;
    ConversationRepo::touch(&state.pool, conversation_id).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::AI_CHAT)
                .actor(user.user_id)
                .entity("message", stored.id)
                .details(json!({
                    "conversation_id": conversation_id,
                    "reply_length": stored.content.chars().count(),
                }))
                .meta(meta),
        )
        .await;

    Ok(stored)
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Conversation",
        id,
    }
}

async fn find_readable(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Conversation> {
    let conversation = ConversationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if conversation.user_id != user.user_id && !user.is_admin() {
        return Err(not_found(id).into());
    }
    Ok(conversation)
}

async fn find_owned(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Conversation> {
    let conversation = ConversationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if conversation.user_id != user.user_id {
        return Err(not_found(id).into());
    }
    Ok(conversation)
}
