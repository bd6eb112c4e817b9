//! Shared API request/response types for the stories and posts endpoints.
//!
//! Field names follow the web client's expectations (`_id`, `user`,
//! `createdAt`), so these types serialize to the same JSON the client already
//! consumes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Max story/post text length.
pub const MAX_CONTENT_LEN: usize = 5_000;
/// Background colors are CSS values (`#1e293b`, `linear-gradient(...)`).
const MAX_BACKGROUND_COLOR_LEN: usize = 128;
/// Max images attached to a single post.
pub const MAX_POST_IMAGES: usize = 4;

/// Returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.field, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// What a story displays. Image and video stories carry uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Text => "text",
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// Whether a story of this type cannot exist without an uploaded file.
    pub fn requires_upload(&self) -> bool {
        matches!(self, MediaType::Image | MediaType::Video)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MediaType::Text),
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(UnknownVariant {
                field: "media_type",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MediaType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Layout of a feed post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Text,
    Image,
    TextWithImage,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Text => "text",
            PostType::Image => "image",
            PostType::TextWithImage => "text_with_image",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(PostType::Text),
            "image" => Ok(PostType::Image),
            "text_with_image" => Ok(PostType::TextWithImage),
            other => Err(UnknownVariant {
                field: "post_type",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for PostType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Text fields of a story upload (multipart form).
#[derive(Debug, Clone, Default, Validate)]
pub struct StoryFields {
    #[garde(length(max = MAX_CONTENT_LEN))]
    pub content: Option<String>,
    #[garde(required)]
    pub media_type: Option<MediaType>,
    #[garde(length(max = MAX_BACKGROUND_COLOR_LEN))]
    pub background_color: Option<String>,
}

/// Text fields of a post upload (multipart form). Images travel as file parts.
#[derive(Debug, Clone, Default, Validate)]
pub struct PostFields {
    #[garde(length(max = MAX_CONTENT_LEN))]
    pub content: Option<String>,
    #[garde(required)]
    pub post_type: Option<PostType>,
    #[garde(range(max = MAX_POST_IMAGES))]
    pub image_count: usize,
}

/// Returned after creating a story.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateStoryResponse {
    pub success: bool,
    #[serde(rename = "storyId")]
    pub story_id: Uuid,
}

/// A live story as shown in the stories bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Author identity.
    pub user: String,
    pub content: Option<String>,
    /// Empty for text stories.
    pub media_url: String,
    pub media_type: MediaType,
    pub background_color: Option<String>,
    /// Identities that have viewed the story.
    pub views_count: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Stories visible to the caller: own stories first, then connections and
/// followed users.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoriesResponse {
    pub success: bool,
    pub stories: Vec<Story>,
}

/// A feed post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: String,
    pub content: Option<String>,
    pub image_urls: Vec<String>,
    pub post_type: PostType,
    /// Identities that liked the post.
    pub likes_count: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostsResponse {
    pub success: bool,
    pub posts: Vec<Post>,
}

/// Like or unlike a post.
#[derive(Debug, Serialize, Deserialize)]
pub struct LikePostPayload {
    #[serde(rename = "postId")]
    pub post_id: Uuid,
}

/// Generic envelope for acknowledgements and failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
