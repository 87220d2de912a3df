//! ImageKit REST client.

use async_trait::async_trait;
use reqwest::{StatusCode, Url, multipart};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{MediaError, MediaFile, MediaResult, MediaStore, MediaUpload};

const UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
const API_URL: &str = "https://api.imagekit.io/v1/files";

/// ImageKit account settings
///
/// Server-side calls authenticate with the private key alone.
#[derive(Debug, Clone)]
pub struct ImageKitConfig {
    pub private_key: String,
    pub url_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// [`MediaStore`] backed by an ImageKit account
pub struct ImageKitStore {
    client: reqwest::Client,
    config: ImageKitConfig,
}

impl ImageKitStore {
    pub fn new(config: ImageKitConfig) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    /// Delivery URL for a stored file, served untransformed
    pub fn public_url(&self, file_path: &str) -> String {
        format!(
            "{}{}?noTransform=true",
            self.config.url_endpoint.trim_end_matches('/'),
            file_path
        )
    }

    /// Details endpoint for one file, or `None` when `file_id` is not a
    /// plain ImageKit id (ASCII letters, digits, `_` and `-`).
    fn details_url(file_id: &str) -> Option<Url> {
        let valid = !file_id.is_empty()
            && file_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return None;
        }

        let mut url = Url::parse(API_URL).ok()?;
        url.path_segments_mut().ok()?.push(file_id).push("details");
        Some(url)
    }

    fn with_public_url(&self, mut file: MediaFile) -> MediaFile {
        if !file.file_path.is_empty() {
            file.url = self.public_url(&file.file_path);
        }
        file
    }

    async fn api_error(response: reqwest::Response) -> MediaError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.message,
            Err(e) => format!("unreadable error body: {e}"),
        };
        log::error!("ImageKit request failed with {status}: {message}");
        MediaError::Api { status, message }
    }
}

#[async_trait]
impl MediaStore for ImageKitStore {
    async fn upload(&self, upload: MediaUpload) -> MediaResult<MediaFile> {
        let metadata = Value::Object(
            upload
                .metadata
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        );

        let mut form = multipart::Form::new()
            .text("file", upload.data)
            .text("fileName", upload.file_name)
            .text("folder", upload.folder);
        if metadata.as_object().is_some_and(|m| !m.is_empty()) {
            form = form.text("customMetadata", metadata.to_string());
        }

        let response = self
            .client
            .post(UPLOAD_URL)
            .basic_auth(&self.config.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let file: MediaFile = response.json().await?;
        log::info!("Uploaded {} to ImageKit as {}", file.name, file.file_id);
        Ok(file)
    }

    async fn list(&self, folder: &str, limit: usize) -> MediaResult<Vec<MediaFile>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(API_URL)
            .basic_auth(&self.config.private_key, Some(""))
            .query(&[("path", folder), ("limit", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let files: Vec<MediaFile> = response.json().await?;
        Ok(files.into_iter().map(|f| self.with_public_url(f)).collect())
    }

    async fn details(&self, file_id: &str) -> MediaResult<Option<MediaFile>> {
        let Some(url) = Self::details_url(file_id) else {
            log::warn!("Refusing ImageKit lookup for malformed file id {file_id:?}");
            return Ok(None);
        };

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.private_key, Some(""))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let file: MediaFile = response.json().await?;
                Ok(Some(self.with_public_url(file)))
            }
            _ => Err(Self::api_error(response).await),
        }
    }
}
