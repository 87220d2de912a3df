//! User directory and profile handlers.

use axum::{Json, extract::State, response::IntoResponse};
use community_hub::users::{ProfileChanges, ProfileUpdate};
use serde_json::json;

use super::{
    AppState,
    error::{ApiError, ApiJson},
    middleware::AuthSubject,
};

/// `GET /api`: every user, without password material
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.profiles.list_users().await?))
}

/// `GET /api/auth/all`: public cards for every user
pub async fn list_summaries(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.profiles.list_summaries().await?))
}

/// `PUT /api/update`: change username, bio or gender on the caller's profile.
///
/// # Responses
///
/// - `200 OK`: `{success, user}`
/// - `400 Bad Request`: Blank username or bio over 300 characters
/// - `409 Conflict`: Username held by another user
pub async fn update_profile(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.profiles.update_profile(subject, update).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// `PUT /api/onboarding`: fill in the caller's full profile.
pub async fn onboarding(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.profiles.onboard(subject, changes).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Onboarding completed",
        "user": user,
    })))
}
