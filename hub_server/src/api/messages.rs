//! Direct message handlers.
//!
//! The sender is always the caller, and only the receiver may mark a message
//! read.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use community_hub::{
    ErrorKind,
    auth::UserId,
    messaging::{MessageId, SendMessage},
};
use serde_json::json;

use super::{
    AppState,
    error::{ApiError, ApiJson, ApiPath},
    middleware::AuthSubject,
    request_id::RequestId,
};
use crate::logging::log_security_event;

/// `POST /api/messages/send`
///
/// # Responses
///
/// - `201 Created`: `{message}`
/// - `400 Bad Request`: No receiver, or neither text nor attachments
/// - `404 Not Found`: Receiver does not exist
pub async fn send(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiJson(request): ApiJson<SendMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.messaging.send_message(subject, request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

/// `GET /api/messages/{user_id}`: both directions, oldest first
pub async fn conversation(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiPath(other): ApiPath<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.messaging.conversation(subject, other).await?;
    Ok(Json(json!({ "messages": messages })))
}

/// `PATCH /api/messages/read/{message_id}`
///
/// # Responses
///
/// - `200 OK`: `{message}`
/// - `403 Forbidden`: Caller is not the receiver; the message is unchanged
/// - `404 Not Found`: No such message
pub async fn mark_read(
    State(state): State<AppState>,
    request_id: RequestId,
    AuthSubject(subject): AuthSubject,
    ApiPath(message_id): ApiPath<MessageId>,
) -> Result<impl IntoResponse, ApiError> {
    match state.messaging.mark_read(subject, message_id).await {
        Ok(message) => Ok(Json(json!({ "message": message }))),
        Err(err) => {
            if err.kind() == ErrorKind::Forbidden {
                log_security_event(
                    "ownership_violation",
                    Some(subject),
                    Some(request_id.as_str()),
                    &format!("Attempt to mark message {message_id} read"),
                );
            }
            Err(err.into())
        }
    }
}
