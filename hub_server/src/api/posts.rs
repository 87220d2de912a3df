//! Image post handlers.

use axum::{Json, extract::State, response::IntoResponse};
use community_hub::feed::{PostId, UploadRequest};
use serde_json::json;

use super::{
    AppState,
    error::{ApiError, ApiJson, ApiPath},
    middleware::AuthSubject,
};

/// `POST /api/images/upload`
///
/// # Request Body
///
/// ```json
/// {
///   "fileName": "holiday.png",
///   "fileData": "data:image/png;base64,iVBORw0KGgo...",
///   "caption": "Beach day",
///   "visibility": "public"
/// }
/// ```
///
/// # Responses
///
/// - `200 OK`: `{success, post}`
/// - `400 Bad Request`: Missing file, bad data URI or caption too long
/// - `500 Internal Server Error`: CDN or store failure
pub async fn upload(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    ApiJson(request): ApiJson<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.feed.upload_post(subject, request).await?;
    tracing::info!(post_id = %post.id, author = %subject, "Post uploaded");
    Ok(Json(json!({ "success": true, "post": post })))
}

/// `GET /api/images`: CDN images with the post that owns each one
pub async fn list_images(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.feed.post_images().await?))
}

/// `GET /api/images/posts`
pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.feed.list_posts().await?))
}

/// `GET /api/images/posts/{post_id}`
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.feed.get_post(post_id).await?;
    Ok(Json(json!({ "post": post })))
}

/// `GET /api/images/files/{file_id}`
pub async fn get_file(
    State(state): State<AppState>,
    ApiPath(file_id): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state.feed.media_detail(&file_id).await?;
    Ok(Json(json!({ "image": image })))
}
