use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::api::{MediaType, PostType};
use sqlx::FromRow;
use uuid::Uuid;

/// Profile row. Ids are issued by the identity provider, never generated here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral story. Removed 24 hours after `created_at`, either by the sweep
/// that runs before every listing or by the scheduled deletion job.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub author_id: String,
    pub content: Option<String>,
    /// Empty unless media was uploaded.
    pub media_url: String,
    #[sqlx(try_from = "String")]
    pub media_type: MediaType,
    pub background_color: Option<String>,
    pub viewer_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Story> for shared::api::Story {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            user: story.author_id,
            content: story.content,
            media_url: story.media_url,
            media_type: story.media_type,
            background_color: story.background_color,
            views_count: story.viewer_ids,
            created_at: story.created_at,
        }
    }
}

/// Story about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub author_id: String,
    pub content: Option<String>,
    pub media_url: String,
    pub media_type: MediaType,
    pub background_color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewStory {
    /// Checks the invariants the `stories` table also enforces.
    pub fn validate(&self) -> Result<(), String> {
        let has_content = self.content.as_deref().is_some_and(|c| !c.is_empty());
        let has_media = !self.media_url.is_empty();

        if !has_content && !has_media {
            return Err("Story must have either content or media".to_string());
        }
        if self.media_type.requires_upload() && !has_media {
            return Err(format!("{} stories must include media", self.media_type));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: String,
    pub content: Option<String>,
    pub image_urls: Vec<String>,
    #[sqlx(try_from = "String")]
    pub post_type: PostType,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for shared::api::Post {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            user: post.author_id,
            content: post.content,
            image_urls: post.image_urls,
            post_type: post.post_type,
            likes_count: post.likes,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author_id: String,
    pub content: Option<String>,
    pub image_urls: Vec<String>,
    pub post_type: PostType,
}
