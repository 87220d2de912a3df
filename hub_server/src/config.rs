//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use community_hub::{db::DatabaseConfig, mail::SmtpConfig, media::ImageKitConfig};
use std::{fmt, net::SocketAddr, str::FromStr};

/// Default SMTP submission port
const DEFAULT_SMTP_PORT: u16 = 587;

/// Frontend origin allowed when `CORS_ORIGINS` is unset
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Deployment environment; decides cookie attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "" => Ok(Environment::Development),
            other => Err(ConfigError::Invalid {
                var: "APP_ENV".to_string(),
                reason: format!("expected production or development, got {other:?}"),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
        })
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Deployment environment
    pub environment: Environment,
    /// Origins allowed to make credentialed cross-origin requests
    pub cors_origins: Vec<String>,
    /// ImageKit credentials; in-process media store when absent
    pub imagekit: Option<ImageKitConfig>,
    /// SMTP relay; mail is only logged when absent
    pub smtp: Option<SmtpConfig>,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
        )
    }

    /// Load configuration through `lookup` instead of the process environment
    pub fn from_lookup<F>(
        lookup: F,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Bind address
        let bind = match bind_override {
            Some(bind) => bind,
            None => match var("SERVER_BIND") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("{raw:?} is not an IP:PORT address"),
                })?,
                None => SocketAddr::from(([127, 0, 0, 1], 4000)),
            },
        };

        // Database configuration
        let defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url: database_url_override
                .or_else(|| var("DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_or(&var, "DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: parse_or(
                &var,
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_or(&var, "DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: parse_or(&var, "DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        };

        // Security configuration (REQUIRED)
        let jwt_secret = var("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            var("PASSWORD_PEPPER").ok_or_else(|| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
        };

        let environment = match var("APP_ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::Development,
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]);

        // ImageKit: private key and endpoint together or neither
        let imagekit = match (var("IMAGEKIT_PRIVATE_KEY"), var("IMAGEKIT_URL_ENDPOINT")) {
            (Some(private_key), Some(url_endpoint)) => Some(ImageKitConfig {
                private_key,
                url_endpoint,
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "IMAGEKIT_*".to_string(),
                    reason: "IMAGEKIT_PRIVATE_KEY and IMAGEKIT_URL_ENDPOINT must be set together"
                        .to_string(),
                });
            }
        };

        // SMTP is enabled by SMTP_HOST
        let smtp = match var("SMTP_HOST") {
            Some(host) => {
                let port = match var("SMTP_PORT") {
                    Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                        var: "SMTP_PORT".to_string(),
                        reason: format!("{raw:?} is not a port number"),
                    })?,
                    None => DEFAULT_SMTP_PORT,
                };
                let from_email = var("SENDER_EMAIL").ok_or_else(|| ConfigError::MissingRequired {
                    var: "SENDER_EMAIL".to_string(),
                    hint: "Required when SMTP_HOST is set".to_string(),
                })?;
                Some(SmtpConfig {
                    host,
                    port,
                    username: var("SMTP_USERNAME").unwrap_or_default(),
                    password: var("SMTP_PASSWORD").unwrap_or_default(),
                    from_email,
                })
            }
            None => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            security,
            environment,
            cors_origins,
            imagekit,
            smtp,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if let Some(origin) = self
            .cors_origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(ConfigError::Invalid {
                var: "CORS_ORIGINS".to_string(),
                reason: format!("{origin:?} is not an http(s) origin"),
            });
        }

        if self
            .imagekit
            .as_ref()
            .is_some_and(|imagekit| !imagekit.url_endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                var: "IMAGEKIT_URL_ENDPOINT".to_string(),
                reason: "Must be an https URL".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse a variable with default fallback
fn parse_or<T, F>(var: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
