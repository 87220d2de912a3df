//! Media CDN access.
//!
//! Images for posts and stories live on an external CDN. The [`MediaStore`]
//! trait covers the three calls the feed needs: upload, list a folder, and
//! fetch one file's details.
//!
//! - [`imagekit`]: ImageKit REST client used in production
//! - [`memory`]: in-process store for development and tests

pub mod imagekit;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::ErrorKind;

pub use imagekit::{ImageKitConfig, ImageKitStore};
pub use memory::MemoryMediaStore;

/// CDN folder holding post images
pub const POST_FOLDER: &str = "/User-Post";

/// CDN folder holding story images
pub const STORY_FOLDER: &str = "/Filter-Post";

/// Most files returned by one folder listing
pub const LIST_LIMIT: usize = 100;

/// Media errors
#[derive(Debug, Error)]
pub enum MediaError {
    /// Transport-level failure talking to the CDN
    #[error("CDN request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// CDN answered with an error status
    #[error("CDN returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Upload payload is not a usable data URI
    #[error("Invalid file data: {0}")]
    InvalidData(String),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::InvalidData(_) => ErrorKind::Validation,
            MediaError::Http(_) | MediaError::Api { .. } => ErrorKind::Upstream,
        }
    }
}

pub type MediaResult<T> = Result<T, MediaError>;

/// A file as the CDN describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub file_id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file to push to the CDN
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
    pub folder: String,
    pub metadata: BTreeMap<String, String>,
}

/// Parsed `data:` URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parse a base64 `data:` URI.
    pub fn parse(data: &'a str) -> MediaResult<Self> {
        let rest = data
            .strip_prefix("data:")
            .ok_or_else(|| MediaError::InvalidData("expected a data: URI".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| MediaError::InvalidData("missing payload".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| MediaError::InvalidData("payload must be base64".to_string()))?;

        if mime_type.is_empty() || !mime_type.contains('/') {
            return Err(MediaError::InvalidData(format!("bad mime type {mime_type:?}")));
        }
        if payload.is_empty() {
            return Err(MediaError::InvalidData("empty payload".to_string()));
        }

        Ok(Self { mime_type, payload })
    }

    /// Decoded size in bytes
    pub fn decoded_len(&self) -> u64 {
        let padding = self.payload.bytes().rev().take_while(|b| *b == b'=').count();
        (self.payload.len() * 3 / 4).saturating_sub(padding) as u64
    }
}

/// Upload, list and look up CDN files
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a file and return its CDN record
    async fn upload(&self, upload: MediaUpload) -> MediaResult<MediaFile>;

    /// Files in `folder`, at most `limit`
    async fn list(&self, folder: &str, limit: usize) -> MediaResult<Vec<MediaFile>>;

    /// One file, or `None` if the CDN has no such id
    async fn details(&self, file_id: &str) -> MediaResult<Option<MediaFile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_uri() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime_type, "image/png");
        assert_eq!(uri.payload, "aGVsbG8=");
        assert_eq!(uri.decoded_len(), 5);
    }

    #[test]
    fn test_rejects_malformed_data() {
        for bad in [
            "image/png;base64,aGVsbG8=",
            "data:image/png;base64",
            "data:image/png,aGVsbG8=",
            "data:;base64,aGVsbG8=",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(DataUri::parse(bad), Err(MediaError::InvalidData(_))),
                "{bad} should be rejected"
            );
        }
    }
}
