//! In-process media store.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DataUri, MediaFile, MediaResult, MediaStore, MediaUpload};

const URL_ENDPOINT: &str = "memory://media";

/// [`MediaStore`] that keeps uploads in memory
#[derive(Default)]
pub struct MemoryMediaStore {
    files: RwLock<Vec<MediaFile>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, upload: MediaUpload) -> MediaResult<MediaFile> {
        let data = DataUri::parse(&upload.data)?;
        let file_type = if data.mime_type.starts_with("image/") {
            "image"
        } else {
            "non-image"
        };
        let file_path = format!("{}/{}", upload.folder.trim_end_matches('/'), upload.file_name);

        let file = MediaFile {
            file_id: Uuid::new_v4().simple().to_string(),
            name: upload.file_name,
            url: format!("{URL_ENDPOINT}{file_path}?noTransform=true"),
            file_path,
            file_type: file_type.to_string(),
            height: None,
            width: None,
            size: data.decoded_len(),
            created_at: Some(Utc::now()),
        };

        self.files.write().await.push(file.clone());
        Ok(file)
    }

    async fn list(&self, folder: &str, limit: usize) -> MediaResult<Vec<MediaFile>> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let files = self.files.read().await;

        Ok(files
            .iter()
            .filter(|f| f.file_path.starts_with(&prefix))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn details(&self, file_id: &str) -> MediaResult<Option<MediaFile>> {
        let files = self.files.read().await;
        Ok(files.iter().find(|f| f.file_id == file_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn upload(folder: &str, name: &str) -> MediaUpload {
        MediaUpload {
            file_name: name.to_string(),
            data: "data:image/png;base64,aGVsbG8=".to_string(),
            folder: folder.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_folder() {
        let store = MemoryMediaStore::new();
        store.upload(upload("/User-Post", "a.png")).await.unwrap();
        store.upload(upload("/Filter-Post", "b.png")).await.unwrap();
        store.upload(upload("/User-Post", "c.png")).await.unwrap();

        let posts = store.list("/User-Post", 100).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(store.list("/User-Post", 1).await.unwrap().len(), 1);
        assert_eq!(store.list("/Filter-Post", 100).await.unwrap()[0].name, "b.png");
    }

    #[tokio::test]
    async fn test_details_by_id() {
        let store = MemoryMediaStore::new();
        let file = store.upload(upload("/User-Post", "a.png")).await.unwrap();

        assert_eq!(store.details(&file.file_id).await.unwrap(), Some(file));
        assert_eq!(store.details("missing").await.unwrap(), None);
    }
}
