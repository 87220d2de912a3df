//! Posts and stories.
//!
//! Uploads go to the CDN first, into `/User-Post` for posts and
//! `/Filter-Post` for stories, and the record pointing at the CDN file is
//! stored afterwards. The author is always the authenticated caller.

pub mod errors;
pub mod models;

pub use errors::{FeedError, FeedResult};
pub use models::{
    MAX_CAPTION_LENGTH, MediaRef, Post, PostId, PostImage, PostLink, STORY_TTL_HOURS, Story,
    StoryId, StoryView, UploadRequest, Visibility,
};

use chrono::{DateTime, Duration, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use uuid::Uuid;

use crate::{
    auth::{UserId, UserSummary},
    db::{PostRepository, StoryRepository, UserRepository},
    media::{DataUri, LIST_LIMIT, MediaFile, MediaStore, MediaUpload, POST_FOLDER, STORY_FOLDER},
};

/// A validated upload, ready for the CDN
struct PreparedUpload {
    extension: String,
    data: String,
    caption: Option<String>,
    visibility: Visibility,
}

fn prepare(request: UploadRequest) -> FeedResult<PreparedUpload> {
    if request.file_name.trim().is_empty() || request.file_data.is_empty() {
        return Err(FeedError::MissingField("fileName and fileData are required"));
    }

    let caption = request
        .caption
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if caption
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_CAPTION_LENGTH)
    {
        return Err(FeedError::InvalidField {
            field: "caption",
            reason: format!("must be at most {MAX_CAPTION_LENGTH} characters"),
        });
    }

    let uri = DataUri::parse(&request.file_data)?;
    let extension = match request.file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => uri
            .mime_type
            .rsplit('/')
            .next()
            .unwrap_or("bin")
            .to_ascii_lowercase(),
    };

    Ok(PreparedUpload {
        extension,
        data: request.file_data,
        caption,
        visibility: request.visibility.unwrap_or_default(),
    })
}

fn media_ref(file: MediaFile, now: DateTime<Utc>) -> MediaRef {
    MediaRef {
        url: file.url,
        file_id: file.file_id,
        uploaded_at: now,
    }
}

/// Feed manager
#[derive(Clone)]
pub struct FeedManager {
    posts: Arc<dyn PostRepository>,
    stories: Arc<dyn StoryRepository>,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
}

impl FeedManager {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        stories: Arc<dyn StoryRepository>,
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            posts,
            stories,
            users,
            media,
        }
    }

    async fn upload_to(
        &self,
        folder: &str,
        record_id: Uuid,
        id_key: &str,
        subject: UserId,
        upload: &PreparedUpload,
    ) -> FeedResult<MediaFile> {
        let metadata = BTreeMap::from([
            (id_key.to_string(), record_id.to_string()),
            ("authorId".to_string(), subject.to_string()),
        ]);

        Ok(self
            .media
            .upload(MediaUpload {
                file_name: format!("{}.{}", record_id, upload.extension),
                data: upload.data.clone(),
                folder: folder.to_string(),
                metadata,
            })
            .await?)
    }

    /// Upload an image and create a post for it
    ///
    /// # Errors
    ///
    /// * `FeedError::MissingField` - No file name or data
    /// * `FeedError::InvalidField` - Caption too long
    /// * `FeedError::Media` - Data is not a base64 data URI, or the CDN failed
    pub async fn upload_post(&self, subject: UserId, request: UploadRequest) -> FeedResult<Post> {
        let upload = prepare(request)?;
        let id = Uuid::new_v4();
        let file = self
            .upload_to(POST_FOLDER, id, "postId", subject, &upload)
            .await?;

        let now = Utc::now();
        let post = Post {
            id,
            author: subject,
            caption: upload.caption,
            visibility: upload.visibility,
            media: vec![media_ref(file, now)],
            tags: Vec::new(),
            is_edited: false,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.posts.insert_post(&post).await {
            log::error!("Post {} uploaded to the CDN but not stored: {}", id, e);
            return Err(e);
        }
        log::info!("User {} created post {}", subject, id);
        Ok(post)
    }

    /// CDN images in the post folder, each with the post that owns it
    pub async fn post_images(&self) -> FeedResult<Vec<PostImage>> {
        let files = self.media.list(POST_FOLDER, LIST_LIMIT).await?;
        let file_ids: Vec<String> = files.iter().map(|f| f.file_id.clone()).collect();
        let posts = self.posts.posts_with_media(&file_ids).await?;

        let owners: HashMap<&str, &Post> = posts
            .iter()
            .flat_map(|p| p.media.iter().map(move |m| (m.file_id.as_str(), p)))
            .collect();

        Ok(files
            .into_iter()
            .map(|file| {
                let post = owners.get(file.file_id.as_str()).map(|p| PostLink::from(*p));
                PostImage { file, post }
            })
            .collect())
    }

    /// All posts, newest first
    pub async fn list_posts(&self) -> FeedResult<Vec<Post>> {
        self.posts.list_posts().await
    }

    pub async fn get_post(&self, post_id: PostId) -> FeedResult<Post> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or(FeedError::PostNotFound(post_id))
    }

    /// CDN details of one post image
    pub async fn media_detail(&self, file_id: &str) -> FeedResult<MediaFile> {
        self.media
            .details(file_id)
            .await?
            .ok_or_else(|| FeedError::FileNotFound(file_id.to_string()))
    }

    /// Upload an image and create a story for it
    pub async fn upload_story(&self, subject: UserId, request: UploadRequest) -> FeedResult<Story> {
        let upload = prepare(request)?;
        let id = Uuid::new_v4();
        let file = self
            .upload_to(STORY_FOLDER, id, "storyId", subject, &upload)
            .await?;

        let now = Utc::now();
        let story = Story {
            id,
            author: subject,
            caption: upload.caption,
            visibility: upload.visibility,
            media: vec![media_ref(file, now)],
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.stories.insert_story(&story).await {
            log::error!("Story {} uploaded to the CDN but not stored: {}", id, e);
            return Err(e);
        }
        log::info!("User {} created story {}", subject, id);
        Ok(story)
    }

    /// CDN files in the story folder
    pub async fn story_files(&self) -> FeedResult<Vec<MediaFile>> {
        Ok(self.media.list(STORY_FOLDER, LIST_LIMIT).await?)
    }

    /// CDN details of one story file
    pub async fn story_file_detail(&self, file_id: &str) -> FeedResult<MediaFile> {
        self.media_detail(file_id).await
    }

    fn story_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(STORY_TTL_HOURS)
    }

    /// Live stories, newest first, with their authors' cards
    pub async fn list_stories(&self) -> FeedResult<Vec<StoryView>> {
        let stories = self
            .stories
            .stories_since(Self::story_cutoff(Utc::now()))
            .await?;

        let mut author_ids: Vec<UserId> = stories.iter().map(|s| s.author).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<UserId, UserSummary> = self
            .users
            .find_many(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        Ok(stories
            .into_iter()
            .map(|story| StoryView {
                author_profile: authors.get(&story.author).cloned(),
                story,
            })
            .collect())
    }

    /// One live story
    pub async fn get_story(&self, story_id: StoryId) -> FeedResult<Story> {
        let cutoff = Self::story_cutoff(Utc::now());
        self.stories
            .find_story(story_id)
            .await?
            .filter(|s| s.created_at >= cutoff)
            .ok_or(FeedError::StoryNotFound(story_id))
    }
}
