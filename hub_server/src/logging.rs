//! Structured logging configuration.
//!
//! The library crate logs through `log`; the subscriber installed here picks
//! those records up alongside the server's own `tracing` events.

use community_hub::auth::UserId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use hub_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - Subject involved, when known
/// * `request_id` - Correlation id of the request
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use hub_server::logging::log_security_event;
///
/// log_security_event(
///     "rejected_token",
///     None,
///     Some("3f1c0a52-8a8e-4d8b-9a43-0e5c8a1e2b11"),
///     "Session token expired",
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<UserId>,
    request_id: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id.map(|id| id.to_string()),
        request_id = request_id,
        "SECURITY: {}",
        message
    );
}
