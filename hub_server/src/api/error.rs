//! Error responses.
//!
//! Every failure leaves the server as `{"success": false, "message": ...}`
//! with a status picked from the library's [`ErrorKind`]. Store, CDN and mail
//! failures are logged here and only a generic message reaches the client.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use community_hub::{
    ErrorKind, auth::AuthError, feed::FeedError, messaging::MessagingError,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Map an error category to its HTTP status
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn classify(kind: ErrorKind, detail: &dyn std::fmt::Display, client_message: String) -> Self {
        if kind == ErrorKind::Upstream {
            tracing::error!(error = %detail, "Upstream failure");
        }
        Self::new(status_for(kind), client_message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "message": self.message })),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::classify(err.kind(), &err, err.client_message())
    }
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        Self::classify(err.kind(), &err, err.client_message())
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        Self::classify(err.kind(), &err, err.client_message())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // A well-formed body with the wrong shape is still a bad request
        let status = match rejection {
            JsonRejection::JsonDataError(_) => status_for(ErrorKind::Validation),
            _ => rejection.status(),
        };
        Self::new(status, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the error body above
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Path` extractor whose rejections use the error body above
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
