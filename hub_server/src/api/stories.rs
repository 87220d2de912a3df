//! Story handlers.
//!
//! Stories older than a day are neither listed nor served.

use axum::{Json, extract::State, response::IntoResponse};
use community_hub::feed::{StoryId, UploadRequest};
use serde_json::json;

use super::{
    AppState,
    error::{ApiError, ApiJson, ApiPath},
    middleware::AuthSubject,
};

/// `POST /api/stories/upload`: same body as a post upload
pub async fn upload(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiJson(request): ApiJson<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let story = state.feed.upload_story(subject, request).await?;
    tracing::info!(story_id = %story.id, author = %subject, "Story uploaded");
    Ok(Json(json!({ "success": true, "story": story })))
}

/// `GET /api/stories/files`
pub async fn list_files(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.feed.story_files().await?))
}

/// `GET /api/stories/files/{file_id}`
pub async fn get_file(
    State(state): State<AppState>,
    ApiPath(file_id): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state.feed.story_file_detail(&file_id).await?;
    Ok(Json(json!({ "success": true, "image": image })))
}

/// `GET /api/stories`: live stories, newest first, with author cards
pub async fn list_stories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stories = state.feed.list_stories().await?;
    Ok(Json(json!({ "success": true, "stories": stories })))
}

/// `GET /api/stories/{story_id}`
pub async fn get_story(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<StoryId>,
) -> Result<impl IntoResponse, ApiError> {
    let story = state.feed.get_story(story_id).await?;
    Ok(Json(json!({ "success": true, "story": story })))
}
