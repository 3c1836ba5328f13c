use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_chat::MessageDraft;
use parley_types::api::{
    CheckLimitRequest, Claims, ConversationListResponse, CreateConversationRequest,
    DEFAULT_CONVERSATION_PAGE_SIZE, DEFAULT_MESSAGE_PAGE_SIZE, MarkReadResponse,
    MessageListResponse, PageQuery, PaginationMeta, SendMessageRequest,
};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = query.resolve(DEFAULT_CONVERSATION_PAGE_SIZE);
    let (conversations, total) =
        blocking(move || Ok(state.chat.list_conversations(claims.sub, page, limit)?)).await?;

    Ok(Json(ConversationListResponse {
        conversations,
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = blocking(move || {
        Ok(state.chat.get_or_create_conversation(claims.sub, req.other_user_id)?)
    })
    .await?;
    Ok(Json(view))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || Ok(state.chat.delete_conversation(conversation_id, claims.sub)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = query.resolve(DEFAULT_MESSAGE_PAGE_SIZE);
    let (messages, total) = blocking(move || {
        Ok(state.chat.list_messages(conversation_id, claims.sub, page, limit)?)
    })
    .await?;

    Ok(Json(MessageListResponse {
        messages,
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let marked =
        blocking(move || Ok(state.chat.mark_conversation_read(conversation_id, claims.sub)?)).await?;
    Ok(Json(MarkReadResponse { marked }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // The sender always comes from the token.
    if req.sender_id.is_some_and(|id| id != claims.sub) {
        return Err(ApiError::BadRequest("sender_id does not match the authenticated user".into()));
    }

    let draft = MessageDraft {
        message_type: req.message_type,
        content: req.content,
        images: req.images,
        emoji_id: req.emoji_id,
    };
    let receiver_id = req.receiver_id;
    let message =
        blocking(move || Ok(state.chat.send_message(claims.sub, receiver_id, draft)?)).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || Ok(state.chat.delete_message(message_id, claims.sub)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_limit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckLimitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = blocking(move || {
        Ok(state.chat.check_message_limit(claims.sub, req.receiver_id)?)
    })
    .await?;
    Ok(Json(status))
}

pub async fn list_emojis(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let emojis = blocking(move || Ok(state.db.list_emojis()?)).await?;
    Ok(Json(emojis))
}
