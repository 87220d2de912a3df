//! Community-Hub HTTP server.
//!
//! Serves accounts, profiles, messaging and the media feed over a JSON API,
//! backed by PostgreSQL (or an in-process store with `--memory`).

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use community_hub::{
    db::Database,
    mail::{LogMailer, Mailer, SmtpMailer},
    media::{ImageKitStore, MediaStore, MemoryMediaStore},
};
use hub_server::{
    api::{self, AppState, Stores},
    config::ServerConfig,
    logging,
};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the Community-Hub backend

USAGE:
  hub_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:4000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/community_hub]

FLAGS:
  --memory                 Keep all data in process memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:4000)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               Session token signing secret (required)
  PASSWORD_PEPPER          Password hashing pepper (required)
  APP_ENV                  production | development
  CORS_ORIGINS             Comma-separated frontend origins
  IMAGEKIT_*               Media CDN credentials
  SMTP_*, SENDER_EMAIL     Outbound mail relay
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;
    info!(
        "Starting Community-Hub server at {} ({})",
        config.bind, config.environment
    );

    let media: Arc<dyn MediaStore> = match &config.imagekit {
        Some(imagekit) => Arc::new(ImageKitStore::new(imagekit.clone())?),
        None => {
            warn!("IMAGEKIT_* not set; uploads are kept in process memory");
            Arc::new(MemoryMediaStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            warn!("SMTP_HOST not set; outgoing mail is only logged");
            Arc::new(LogMailer::new())
        }
    };

    let state = if args.memory {
        warn!("Running with the in-memory store; data is lost on exit");
        AppState::new(&config, Stores::memory(), media, mailer)?
    } else {
        info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to apply schema")?;
        info!("Database connected successfully");

        AppState::new(&config, Stores::postgres(db.pool()), media, mailer)?.with_database(db)
    };

    let database = state.database.clone();
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
