//! Chat handlers.
//!
//! Only participants can read a chat or post to it.

use axum::{Json, extract::State, response::IntoResponse};
use community_hub::{
    ErrorKind,
    auth::UserId,
    messaging::{ChatId, MessagingError, OpenChat, PostChatMessage},
};

use super::{
    AppState,
    error::{ApiError, ApiJson, ApiPath},
    middleware::AuthSubject,
    request_id::RequestId,
};
use crate::logging::log_security_event;

fn reject(err: MessagingError, subject: UserId, request_id: &RequestId) -> ApiError {
    if err.kind() == ErrorKind::Forbidden {
        log_security_event(
            "ownership_violation",
            Some(subject),
            Some(request_id.as_str()),
            &err.to_string(),
        );
    }
    err.into()
}

/// `POST /api/chats/chat`: find or create the chat with `userId`
pub async fn open(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiJson(request): ApiJson<OpenChat>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.messaging.open_chat(subject, request.user_id).await?;
    Ok(Json(chat))
}

/// `GET /api/chats/find/{user_id}`
pub async fn find(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiPath(other): ApiPath<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.messaging.find_chat(subject, other).await?;
    Ok(Json(chat))
}

/// `POST /api/chats/message`
pub async fn post_message(
    State(state): State<AppState>,
    request_id: RequestId,
    AuthSubject(subject): AuthSubject,
    ApiJson(request): ApiJson<PostChatMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .messaging
        .post_to_chat(subject, request)
        .await
        .map_err(|e| reject(e, subject, &request_id))?;
    Ok(Json(message))
}

/// `GET /api/chats/messages/{chat_id}`: oldest first
pub async fn history(
    State(state): State<AppState>,
    request_id: RequestId,
    AuthSubject(subject): AuthSubject,
    ApiPath(chat_id): ApiPath<ChatId>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .messaging
        .chat_history(subject, chat_id)
        .await
        .map_err(|e| reject(e, subject, &request_id))?;
    Ok(Json(messages))
}
