//! Session cookie policy.
//!
//! The session token travels in a single `HttpOnly` cookie named `token`.
//! Production deployments serve the frontend from another site, so the cookie
//! is `Secure` with `SameSite=None` there and `SameSite=Strict` otherwise.
//! Removal cookies carry exactly the same attributes as the cookie they
//! replace, or browsers keep the original.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use community_hub::auth::SESSION_TTL_DAYS;
use time::Duration;

use crate::config::Environment;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Attributes applied to every session cookie the server emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    secure: bool,
    same_site: SameSite,
    max_age: Duration,
}

impl CookiePolicy {
    pub fn for_environment(environment: Environment) -> Self {
        let (secure, same_site) = if environment.is_production() {
            (true, SameSite::None)
        } else {
            (false, SameSite::Strict)
        };
        Self {
            secure,
            same_site,
            max_age: Duration::days(SESSION_TTL_DAYS),
        }
    }

    fn build(&self, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(max_age)
            .build()
    }

    /// Cookie carrying a freshly issued session token
    pub fn session_cookie(&self, token: impl Into<String>) -> Cookie<'static> {
        self.build(token.into(), self.max_age)
    }

    /// Empty, already-expired cookie with the session cookie's attributes
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.build(String::new(), Duration::ZERO)
    }

    pub fn attach(&self, jar: CookieJar, token: impl Into<String>) -> CookieJar {
        jar.add(self.session_cookie(token))
    }

    /// Always emits the removal cookie, whether or not the request carried one
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal_cookie())
    }
}

/// Session token carried by the request, if any
pub fn extract(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Session token read straight from request headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    extract(&CookieJar::from_headers(headers))
}
