//! Integration tests for the HTTP surface.
//!
//! The router runs against the in-memory store, media store and mailer, so
//! these tests need no database or network.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use community_hub::{
    auth::TokenCodec,
    mail::LogMailer,
    media::MemoryMediaStore,
};
use http_body_util::BodyExt;
use hub_server::{
    api::{self, AppState, Stores},
    config::ServerConfig,
};
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt; // For `oneshot` method
use uuid::Uuid;

const SECRET: &str = "server-test-signing-secret-32-chars!";
const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

fn test_config(environment: &str) -> ServerConfig {
    let vars = HashMap::from([
        ("JWT_SECRET", SECRET.to_string()),
        ("PASSWORD_PEPPER", "server-test-pepper".to_string()),
        ("APP_ENV", environment.to_string()),
    ]);
    ServerConfig::from_lookup(|key| vars.get(key).cloned(), None, None)
        .expect("test configuration")
}

fn create_test_server(environment: &str) -> Router {
    let config = test_config(environment);
    let state = AppState::new(
        &config,
        Stores::memory(),
        Arc::new(MemoryMediaStore::new()),
        Arc::new(LogMailer::new()),
    )
    .expect("app state");
    api::create_router(state)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// Session token from the set-cookie header
    fn session(&self) -> String {
        let set_cookie = self.set_cookie().expect("set-cookie header");
        let pair = set_cookie.split(';').next().unwrap();
        pair.strip_prefix("token=").expect("token cookie").to_string()
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Reply {
        status,
        headers,
        body,
    }
}

async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let reply = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "pw123" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let id = reply.body["user"]["id"].as_str().unwrap().to_string();
    (id, reply.session())
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server("development");
    let reply = call(&app, Method::GET, "/health", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert_eq!(reply.body["database"], "memory");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server("development");
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

// ============================================================================
// Session Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = create_test_server("development");
    let (ann_id, token) = register(&app, "Ann", "ann@x.com").await;

    let me = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["success"], true);
    assert_eq!(me.body["user"]["id"], ann_id.as_str());
    assert_eq!(me.body["user"]["email"], "ann@x.com");
    assert!(me.body["user"].get("password").is_none());
    assert!(me.body["user"].get("passwordHash").is_none());

    let wrong = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ann@x.com", "password": "nope" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["success"], false);
    assert_eq!(wrong.body["message"], "Invalid credentials");
    assert!(wrong.set_cookie().is_none());

    let login = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ann@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["message"], "Logged in successfully");
    assert_eq!(login.body["user"]["name"], "Ann");
    assert!(login.body["user"].get("avatar").is_none());
    let fresh = login.session();

    let me = call(&app, Method::GET, "/api/auth/me", Some(&fresh), None).await;
    assert_eq!(me.status, StatusCode::OK);

    let logout = call(&app, Method::POST, "/api/auth/logout", Some(&fresh), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logged Out");
    let cleared = logout.set_cookie().unwrap();
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));

    // The browser dropped the cookie, so the next request carries none
    let after = call(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["success"], false);
}

#[tokio::test]
async fn test_logout_without_session_is_idempotent() {
    let app = create_test_server("production");
    for _ in 0..2 {
        let reply = call(&app, Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["success"], true);
        assert!(reply.set_cookie().unwrap().contains("Max-Age=0"));
    }
}

#[tokio::test]
async fn test_register_failures() {
    let app = create_test_server("development");
    register(&app, "Ann", "ann@x.com").await;

    let duplicate = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Other", "email": "ann@x.com", "password": "pw" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["message"], "User already exists");
    assert!(duplicate.set_cookie().is_none());

    let missing = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "bob@x.com" })),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["success"], false);
}

#[tokio::test]
async fn test_google_login_is_find_or_create() {
    let app = create_test_server("development");
    let identity = json!({ "email": "g@x.com", "name": "Gee", "photo": "https://p/g.png" });

    let first = call(&app, Method::POST, "/api/auth/google", None, Some(identity.clone())).await;
    let second = call(&app, Method::POST, "/api/auth/google", None, Some(identity)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["user"]["id"], second.body["user"]["id"]);
    assert_eq!(first.body["user"]["avatar"], "https://p/g.png");
    assert!(second.set_cookie().is_some());

    let no_email = call(&app, Method::POST, "/api/auth/google", None, Some(json!({}))).await;
    assert_eq!(no_email.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Cookie Attribute Tests
// ============================================================================

#[tokio::test]
async fn test_production_cookie_attributes() {
    let app = create_test_server("production");
    let reply = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Ann", "email": "ann@x.com", "password": "pw123" })),
    )
    .await;

    let set_cookie = reply.set_cookie().unwrap();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=None"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=604800"));

    let cleared = call(&app, Method::POST, "/api/auth/logout", None, None).await;
    let cleared = cleared.set_cookie().unwrap();
    assert!(cleared.contains("HttpOnly"));
    assert!(cleared.contains("Secure"));
    assert!(cleared.contains("SameSite=None"));
    assert!(cleared.contains("Path=/"));
}

#[tokio::test]
async fn test_development_cookie_attributes() {
    let app = create_test_server("development");
    let reply = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Ann", "email": "ann@x.com", "password": "pw123" })),
    )
    .await;

    let set_cookie = reply.set_cookie().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(!set_cookie.contains("Secure"));

    let cleared = call(&app, Method::POST, "/api/auth/logout", None, None).await;
    let cleared = cleared.set_cookie().unwrap();
    assert!(cleared.contains("HttpOnly"));
    assert!(cleared.contains("SameSite=Strict"));
    assert!(!cleared.contains("Secure"));
}

// ============================================================================
// Auth Gate Tests
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = create_test_server("development");

    let missing = call(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["success"], false);
    assert_eq!(missing.body["message"], "Unauthorized: No token provided");

    let garbage = call(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let upload = call(
        &app,
        Method::POST,
        "/api/images/upload",
        None,
        Some(json!({ "fileName": "a.png", "fileData": PNG })),
    )
    .await;
    assert_eq!(upload.status, StatusCode::UNAUTHORIZED);

    // Nothing was stored by the rejected upload
    let posts = call(&app, Method::GET, "/api/images/posts", None, None).await;
    assert_eq!(posts.body, json!([]));
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_rejected() {
    let app = create_test_server("development");
    let (id, _) = register(&app, "Ann", "ann@x.com").await;
    let id: Uuid = id.parse().unwrap();

    let codec = TokenCodec::new(SECRET).unwrap();
    let expired = codec
        .issue_at(id, Utc::now() - Duration::days(7) - Duration::seconds(1))
        .unwrap();
    let reply = call(&app, Method::GET, "/api/auth/me", Some(&expired), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Unauthorized: Token expired");

    let foreign = TokenCodec::new("another-secret-that-is-long-enough!!")
        .unwrap()
        .issue(id)
        .unwrap();
    let reply = call(&app, Method::GET, "/api/auth/me", Some(&foreign), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_for_missing_user() {
    let app = create_test_server("development");
    let ghost = TokenCodec::new(SECRET).unwrap().issue(Uuid::new_v4()).unwrap();

    let reply = call(&app, Method::GET, "/api/auth/me", Some(&ghost), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Profile Tests
// ============================================================================

#[tokio::test]
async fn test_profile_update_and_onboarding() {
    let app = create_test_server("development");
    let (_, ann) = register(&app, "Ann", "ann@x.com").await;
    let (_, bob) = register(&app, "Bob", "bob@x.com").await;

    let update = call(
        &app,
        Method::PUT,
        "/api/update",
        Some(&ann),
        Some(json!({ "username": "ann", "bio": "hello" })),
    )
    .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(update.body["user"]["username"], "ann");
    assert_eq!(update.body["user"]["bio"], "hello");

    let taken = call(
        &app,
        Method::PUT,
        "/api/update",
        Some(&bob),
        Some(json!({ "username": "ann" })),
    )
    .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let long_bio = call(
        &app,
        Method::PUT,
        "/api/update",
        Some(&bob),
        Some(json!({ "bio": "x".repeat(301) })),
    )
    .await;
    assert_eq!(long_bio.status, StatusCode::BAD_REQUEST);

    let onboarding = call(
        &app,
        Method::PUT,
        "/api/onboarding",
        Some(&bob),
        Some(json!({ "location": "Oslo", "interests": ["chess"] })),
    )
    .await;
    assert_eq!(onboarding.status, StatusCode::OK);
    assert_eq!(onboarding.body["message"], "Onboarding completed");
    assert_eq!(onboarding.body["user"]["location"], "Oslo");

    let all = call(&app, Method::GET, "/api/auth/all", None, None).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);
    let users = call(&app, Method::GET, "/api", None, None).await;
    assert_eq!(users.body.as_array().unwrap().len(), 2);
}

// ============================================================================
// Messaging Tests
// ============================================================================

#[tokio::test]
async fn test_direct_messages_and_read_ownership() {
    let app = create_test_server("development");
    let (ann_id, ann) = register(&app, "Ann", "ann@x.com").await;
    let (bob_id, bob) = register(&app, "Bob", "bob@x.com").await;

    let sent = call(
        &app,
        Method::POST,
        "/api/messages/send",
        Some(&ann),
        Some(json!({ "receiver": bob_id, "text": "hi" })),
    )
    .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    assert_eq!(sent.body["message"]["sender"], ann_id.as_str());
    let message_id = sent.body["message"]["id"].as_str().unwrap().to_string();

    let thread = call(
        &app,
        Method::GET,
        &format!("/api/messages/{ann_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(thread.status, StatusCode::OK);
    assert_eq!(thread.body["messages"].as_array().unwrap().len(), 1);

    let uri = format!("/api/messages/read/{message_id}");
    let forbidden = call(&app, Method::PATCH, &uri, Some(&ann), None).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["success"], false);

    let read = call(&app, Method::PATCH, &uri, Some(&bob), None).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["message"]["isRead"], true);
    assert_eq!(read.body["message"]["status"], "read");

    let bad_id = call(&app, Method::PATCH, "/api/messages/read/not-a-uuid", Some(&bob), None).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let bad_receiver = call(
        &app,
        Method::POST,
        "/api/messages/send",
        Some(&ann),
        Some(json!({ "receiver": "not-a-uuid", "text": "hi" })),
    )
    .await;
    assert_eq!(bad_receiver.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_receiver.body["success"], false);
}

#[tokio::test]
async fn test_chats_are_participant_only() {
    let app = create_test_server("development");
    let (ann_id, ann) = register(&app, "Ann", "ann@x.com").await;
    let (bob_id, bob) = register(&app, "Bob", "bob@x.com").await;
    let (_, carol) = register(&app, "Carol", "carol@x.com").await;

    let opened = call(
        &app,
        Method::POST,
        "/api/chats/chat",
        Some(&ann),
        Some(json!({ "userId": bob_id })),
    )
    .await;
    assert_eq!(opened.status, StatusCode::OK);
    let chat_id = opened.body["id"].as_str().unwrap().to_string();

    let found = call(
        &app,
        Method::GET,
        &format!("/api/chats/find/{ann_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(found.body["id"], chat_id.as_str());

    let post = |text: &str| Some(json!({ "chatId": chat_id, "message": text }));
    let ok = call(&app, Method::POST, "/api/chats/message", Some(&bob), post("yo")).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["message"], "yo");

    let intruder = call(&app, Method::POST, "/api/chats/message", Some(&carol), post("hey")).await;
    assert_eq!(intruder.status, StatusCode::FORBIDDEN);

    let uri = format!("/api/chats/messages/{chat_id}");
    let history = call(&app, Method::GET, &uri, Some(&ann), None).await;
    assert_eq!(history.body.as_array().unwrap().len(), 1);
    let peek = call(&app, Method::GET, &uri, Some(&carol), None).await;
    assert_eq!(peek.status, StatusCode::FORBIDDEN);

    let missing = call(&app, Method::POST, "/api/chats/chat", Some(&ann), Some(json!({}))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Feed Tests
// ============================================================================

#[tokio::test]
async fn test_post_and_story_uploads() {
    let app = create_test_server("development");
    let (ann_id, ann) = register(&app, "Ann", "ann@x.com").await;

    let uploaded = call(
        &app,
        Method::POST,
        "/api/images/upload",
        Some(&ann),
        Some(json!({ "fileName": "a.png", "fileData": PNG, "caption": "first" })),
    )
    .await;
    assert_eq!(uploaded.status, StatusCode::OK);
    assert_eq!(uploaded.body["success"], true);
    let post_id = uploaded.body["post"]["id"].as_str().unwrap().to_string();
    assert_eq!(uploaded.body["post"]["author"], ann_id.as_str());

    let post = call(&app, Method::GET, &format!("/api/images/posts/{post_id}"), None, None).await;
    assert_eq!(post.status, StatusCode::OK);
    assert_eq!(post.body["post"]["caption"], "first");

    let images = call(&app, Method::GET, "/api/images", None, None).await;
    let images = images.body.as_array().unwrap().clone();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["post"]["postId"], post_id.as_str());

    let missing = call(
        &app,
        Method::GET,
        &format!("/api/images/posts/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let invalid = call(
        &app,
        Method::POST,
        "/api/images/upload",
        Some(&ann),
        Some(json!({ "fileName": "a.png" })),
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let story = call(
        &app,
        Method::POST,
        "/api/stories/upload",
        Some(&ann),
        Some(json!({ "fileName": "s.png", "fileData": PNG })),
    )
    .await;
    assert_eq!(story.status, StatusCode::OK);
    let story_id = story.body["story"]["id"].as_str().unwrap().to_string();

    let stories = call(&app, Method::GET, "/api/stories", None, None).await;
    assert_eq!(stories.body["success"], true);
    let listed = stories.body["stories"].as_array().unwrap().clone();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["authorProfile"]["name"], "Ann");

    let fetched = call(&app, Method::GET, &format!("/api/stories/{story_id}"), None, None).await;
    assert_eq!(fetched.body["story"]["id"], story_id.as_str());

    let files = call(&app, Method::GET, "/api/stories/files", None, None).await;
    assert_eq!(files.body.as_array().unwrap().len(), 1);

    let no_file = call(&app, Method::GET, "/api/stories/files/nope", None, None).await;
    assert_eq!(no_file.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// CORS Tests
// ============================================================================

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin_with_credentials() {
    let app = create_test_server("development");
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/auth/login")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}
