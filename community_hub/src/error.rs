//! Error taxonomy shared by every module.
//!
//! Each module keeps its own error enum; `kind()` on those enums folds them
//! into one of these categories so the HTTP layer can pick a status code
//! without knowing module internals.

use std::fmt;

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing or malformed.
    Validation,
    /// The identity or resource does not exist.
    NotFound,
    /// No credential, or the credential did not verify.
    Unauthorized,
    /// Authenticated, but not the owner of the resource.
    Forbidden,
    /// A unique field is already taken.
    Conflict,
    /// The store, CDN or mail relay failed.
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Upstream => "upstream",
        };
        f.write_str(name)
    }
}
