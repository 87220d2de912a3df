//! Authentication gate for protected endpoints.
//!
//! The session token is read from the `token` cookie and verified with the
//! process signing secret. Verification never touches the store. On success
//! the subject is stored in request extensions as an [`AuthSubject`], which
//! handlers take as an argument; that extractor is the only way a handler
//! learns who the caller is.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use hub_server::api::middleware::{AuthSubject, auth_middleware};
//! # use hub_server::api::AppState;
//! # let state: AppState = unimplemented!();
//!
//! async fn whoami(AuthSubject(user_id): AuthSubject) -> String {
//!     user_id.to_string()
//! }
//!
//! let protected: Router = Router::new()
//!     .route("/api/whoami", get(whoami))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
//!     .with_state(state);
//! # let _ = protected;
//! ```

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use community_hub::auth::{AuthError, UserId};

use super::{AppState, cookie, error::ApiError, request_id::RequestId};
use crate::logging::log_security_event;

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSubject(pub UserId);

fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    request_id: Option<&RequestId>,
) -> Result<AuthSubject, ApiError> {
    let token = cookie::session_token(headers);
    match state.auth.authenticate(token.as_deref()) {
        Ok(user_id) => Ok(AuthSubject(user_id)),
        Err(err) => {
            let event = match err {
                AuthError::NoCredential => "missing_token",
                _ => "rejected_token",
            };
            log_security_event(
                event,
                None,
                request_id.map(RequestId::as_str),
                &err.to_string(),
            );
            Err(err.into())
        }
    }
}

/// Middleware that rejects requests without a valid session cookie.
///
/// # Behavior
///
/// - **Valid token**: Injects [`AuthSubject`] into request extensions → Calls next handler
/// - **Missing cookie**: Returns `401 Unauthorized`
/// - **Bad signature or expired token**: Returns `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subject = authenticate(
        &state,
        request.headers(),
        request.extensions().get::<RequestId>(),
    )?;
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthSubject
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(subject) = parts.extensions.get::<AuthSubject>() {
            return Ok(*subject);
        }

        // Route not behind the middleware
        let state = AppState::from_ref(state);
        authenticate(&state, &parts.headers, parts.extensions.get::<RequestId>())
    }
}
