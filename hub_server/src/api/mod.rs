//! HTTP API for the Community-Hub backend.
//!
//! # Modules
//!
//! - [`auth`]: register, login, Google login, logout, current user
//! - [`users`]: user listings, profile update and onboarding
//! - [`messages`]: direct messages
//! - [`chats`]: two-party chats
//! - [`posts`]: image posts and their CDN files
//! - [`stories`]: stories and their CDN files
//! - [`middleware`]: cookie authentication gate
//! - [`cookie`]: session cookie attributes
//!
//! # Endpoints Overview
//!
//! ```text
//! POST  /api/auth/register              - Register (public)
//! POST  /api/auth/login                 - Login (public)
//! POST  /api/auth/google                - Google find-or-create (public)
//! POST  /api/auth/logout                - Clear the session cookie (public)
//! GET   /api/auth/me                    - Current user (auth required)
//! GET   /api/auth/all                   - User summaries (public)
//! GET   /api                            - Users (public)
//! PUT   /api/update                     - Profile update (auth required)
//! PUT   /api/onboarding                 - Onboarding (auth required)
//! POST  /api/messages/send              - Send direct message (auth required)
//! GET   /api/messages/{user_id}         - Conversation (auth required)
//! PATCH /api/messages/read/{message_id} - Mark read (auth required)
//! POST  /api/chats/chat                 - Open chat (auth required)
//! GET   /api/chats/find/{user_id}       - Find chat (auth required)
//! POST  /api/chats/message              - Post to chat (auth required)
//! GET   /api/chats/messages/{chat_id}   - Chat history (auth required)
//! POST  /api/images/upload              - Upload post (auth required)
//! GET   /api/images                     - CDN images with posts (public)
//! GET   /api/images/posts               - Posts (public)
//! GET   /api/images/posts/{post_id}     - Post (public)
//! GET   /api/images/files/{file_id}     - CDN file (public)
//! POST  /api/stories/upload             - Upload story (auth required)
//! GET   /api/stories/files              - Story CDN files (public)
//! GET   /api/stories/files/{file_id}    - Story CDN file (public)
//! GET   /api/stories                    - Live stories (public)
//! GET   /api/stories/{story_id}         - Story (public)
//! GET   /health                         - Health check
//! ```
//!
//! # CORS
//!
//! Only the configured origins are allowed, with credentials, so the browser
//! sends the session cookie cross-origin.

pub mod auth;
pub mod chats;
pub mod cookie;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod request_id;
pub mod stories;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
};
use community_hub::{
    auth::{AuthManager, AuthResult, PepperedHasher, TokenCodec},
    db::{
        ChatRepository, Database, MemoryStore, MessageRepository, PgChatRepository,
        PgMessageRepository, PgPostRepository, PgStoryRepository, PgUserRepository,
        PostRepository, StoryRepository, UserRepository,
    },
    feed::FeedManager,
    mail::Mailer,
    media::MediaStore,
    messaging::MessagingManager,
    users::ProfileManager,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ServerConfig;
use cookie::CookiePolicy;

/// Largest accepted request body; uploads arrive base64-encoded in JSON
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Repository handles backing the managers
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub stories: Arc<dyn StoryRepository>,
}

impl Stores {
    /// All repositories backed by one in-process store
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            messages: store.clone(),
            chats: store.clone(),
            posts: store.clone(),
            stories: store,
        }
    }

    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
            chats: Arc::new(PgChatRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            stories: Arc::new(PgStoryRepository::new(pool.clone())),
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is behind an `Arc` or `Copy`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub profiles: Arc<ProfileManager>,
    pub messaging: Arc<MessagingManager>,
    pub feed: Arc<FeedManager>,
    pub cookies: CookiePolicy,
    pub cors_origins: Arc<[String]>,
    /// Present when running against PostgreSQL; probed by `/health`
    pub database: Option<Database>,
}

impl AppState {
    /// Wire the managers over `stores`
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is unusable.
    pub fn new(
        config: &ServerConfig,
        stores: Stores,
        media: Arc<dyn MediaStore>,
        mailer: Arc<dyn Mailer>,
    ) -> AuthResult<Self> {
        let tokens = TokenCodec::new(&config.security.jwt_secret)?;
        let hasher = PepperedHasher::new(config.security.password_pepper.as_str());

        let auth = AuthManager::new(stores.users.clone(), hasher, tokens, mailer);
        let profiles = ProfileManager::new(stores.users.clone());
        let messaging = MessagingManager::new(
            stores.users.clone(),
            stores.messages.clone(),
            stores.chats.clone(),
        );
        let feed = FeedManager::new(stores.posts, stores.stories, stores.users, media);

        Ok(Self {
            auth: Arc::new(auth),
            profiles: Arc::new(profiles),
            messaging: Arc::new(messaging),
            feed: Arc::new(feed),
            cookies: CookiePolicy::for_environment(config.environment),
            cors_origins: config.cors_origins.clone().into(),
            database: None,
        })
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use hub_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:4000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api", get(users::list_users))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/google", post(auth::google))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/all", get(users::list_summaries))
        .route("/api/images", get(posts::list_images))
        .route("/api/images/posts", get(posts::list_posts))
        .route("/api/images/posts/{post_id}", get(posts::get_post))
        .route("/api/images/files/{file_id}", get(posts::get_file))
        .route("/api/stories", get(stories::list_stories))
        .route("/api/stories/files", get(stories::list_files))
        .route("/api/stories/files/{file_id}", get(stories::get_file))
        .route("/api/stories/{story_id}", get(stories::get_story));

    // Protected routes (require a valid session cookie)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/update", put(users::update_profile))
        .route("/api/onboarding", put(users::onboarding))
        .route("/api/messages/send", post(messages::send))
        .route("/api/messages/{user_id}", get(messages::conversation))
        .route("/api/messages/read/{message_id}", patch(messages::mark_read))
        .route("/api/chats/chat", post(chats::open))
        .route("/api/chats/find/{user_id}", get(chats::find))
        .route("/api/chats/message", post(chats::post_message))
        .route("/api/chats/messages/{chat_id}", get(chats::history))
        .route("/api/images/upload", post(posts::upload))
        .route("/api/stories/upload", post(stories::upload))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Credentialed CORS for the configured frontend origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unusable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(request_id::REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(request_id::REQUEST_ID_HEADER)])
        .allow_credentials(true)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:4000/health
/// # {"status":"healthy","database":"connected","timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (healthy, database) = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => (true, "connected"),
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                (false, "unreachable")
            }
        },
        None => (true, "memory"),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
