//! Post and story data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::{
    auth::{UserId, UserSummary},
    media::MediaFile,
};

pub type PostId = Uuid;
pub type StoryId = Uuid;

/// Maximum caption length, in characters
pub const MAX_CAPTION_LENGTH: usize = 1000;

/// How long a story stays visible
pub const STORY_TTL_HOURS: i64 = 24;

/// Who a post or story is meant for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Followers,
    Favourite,
    Community,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Followers => "followers",
            Visibility::Favourite => "favourite",
            Visibility::Community => "community",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "followers" => Ok(Visibility::Followers),
            "favourite" => Ok(Visibility::Favourite),
            "community" => Ok(Visibility::Community),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

/// Pointer from a post or story to its CDN file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub file_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A post in the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub caption: Option<String>,
    pub visibility: Visibility,
    pub media: Vec<MediaRef>,
    pub tags: Vec<UserId>,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A story; only shown for a day after it is posted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub author: UserId,
    pub caption: Option<String>,
    pub visibility: Visibility,
    pub media: Vec<MediaRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upload body shared by posts and stories; the author is always the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    /// `data:<mime>;base64,<payload>`
    pub file_data: String,
    pub caption: Option<String>,
    pub visibility: Option<Visibility>,
}

/// The slice of a post shown next to its image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostLink {
    pub post_id: PostId,
    pub author: UserId,
    pub caption: Option<String>,
    pub visibility: Visibility,
    pub tags: Vec<UserId>,
}

impl From<&Post> for PostLink {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.id,
            author: post.author,
            caption: post.caption.clone(),
            visibility: post.visibility,
            tags: post.tags.clone(),
        }
    }
}

/// A CDN image with the post that owns it, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostImage {
    #[serde(flatten)]
    pub file: MediaFile,
    pub post: Option<PostLink>,
}

/// A story with its author's public card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryView {
    #[serde(flatten)]
    pub story: Story,
    #[serde(rename = "authorProfile")]
    pub author_profile: Option<UserSummary>,
}
