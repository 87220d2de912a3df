//! Authentication API handlers.
//!
//! Successful register, login and Google login set the session cookie;
//! logout always clears it.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:4000/api/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Ann", "email": "ann@example.com", "password": "pw123"}'
//! ```
//!
//! Login, keeping the cookie:
//! ```bash
//! curl -c jar.txt -X POST http://localhost:4000/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ann@example.com", "password": "pw123"}'
//! ```

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use community_hub::{
    ErrorKind,
    auth::{GoogleIdentity, LoginRequest, RegisterRequest, Session},
};
use serde_json::json;

use super::{
    AppState,
    error::{ApiError, ApiJson},
    middleware::AuthSubject,
    request_id::RequestId,
};
use crate::logging::log_security_event;

fn with_cookie(state: &AppState, jar: CookieJar, session: &Session) -> CookieJar {
    state.cookies.attach(jar, session.token.as_str())
}

/// Register a new user account and log them in.
///
/// # Request Body
///
/// ```json
/// { "name": "Ann", "email": "ann@example.com", "password": "pw123" }
/// ```
///
/// # Responses
///
/// - `200 OK`: `{success, user}` and the session cookie
/// - `400 Bad Request`: A field is missing
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.register(request).await?;
    tracing::info!(user_id = %session.user.id, "User registered");

    let jar = with_cookie(&state, jar, &session);
    Ok((
        jar,
        Json(json!({ "success": true, "user": session.user.summary() })),
    ))
}

/// Login with email and password.
///
/// # Responses
///
/// - `200 OK`: `{success, message, user: {id, name, email}}` and the session cookie
/// - `400 Bad Request`: Email or password missing
/// - `401 Unauthorized`: Unknown email or wrong password; no cookie is set
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = match state.auth.login(request).await {
        Ok(session) => session,
        Err(err) => {
            if err.kind() == ErrorKind::Unauthorized {
                log_security_event(
                    "failed_login",
                    None,
                    Some(request_id.as_str()),
                    &err.to_string(),
                );
            }
            return Err(err.into());
        }
    };

    let user = &session.user;
    let body = json!({
        "success": true,
        "message": "Logged in successfully",
        "user": { "id": user.id, "name": user.name, "email": user.email },
    });
    Ok((with_cookie(&state, jar, &session), Json(body)))
}

/// Find-or-create login from a Google identity asserted by the client.
///
/// # Responses
///
/// - `200 OK`: `{success, user: {id, name, email, avatar}}` and the session cookie
/// - `400 Bad Request`: Email missing
pub async fn google(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(identity): ApiJson<GoogleIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.google_login(identity).await?;

    let body = json!({ "success": true, "user": session.user.summary() });
    Ok((with_cookie(&state, jar, &session), Json(body)))
}

/// Clear the session cookie.
///
/// Needs no session and never fails, so logging out twice is harmless.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        state.cookies.clear(jar),
        Json(json!({ "success": true, "message": "Logged Out" })),
    )
}

/// Current user.
///
/// # Responses
///
/// - `200 OK`: `{success, user}`
/// - `401 Unauthorized`: No or bad session cookie
/// - `404 Not Found`: The session names a user that no longer exists
pub async fn me(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.current_user(subject).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}
