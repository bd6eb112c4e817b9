//! Story lifecycle: creation, scoped listing and 24 hour expiry.
//!
//! Stories disappear through two independent paths, both delete-if-exists:
//! a system-wide sweep that runs before every listing, and a per-story
//! deletion job scheduled at creation and consumed by the worker.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shared::api::MediaType;
use uuid::Uuid;

use crate::{
    models::{NewStory, Story},
    repos::{RelationshipRepo, Repos, StoryRepo, UserRepo, scope_set},
    services::{MediaStore, UploadRequest},
    stores::{JobEvent, JobScheduler},
};

pub const STORY_TTL_HOURS: i64 = 24;

pub fn story_ttl() -> Duration {
    Duration::hours(STORY_TTL_HOURS)
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStory {
    pub author_id: String,
    pub content: Option<String>,
    pub media_type: MediaType,
    pub media: Option<MediaFile>,
    pub background_color: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("user not authenticated")]
    Unauthenticated,
    #[error("user not found")]
    UserNotFound,
    #[error("media file required")]
    MediaRequired,
    #[error("invalid file upload")]
    InvalidUpload,
    #[error("media upload failed: {0}")]
    MediaUploadFailed(String),
    #[error("{0}")]
    ValidationFailed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct StoryLifecycleManager {
    stories: Arc<dyn StoryRepo>,
    users: Arc<dyn UserRepo>,
    relationships: Arc<dyn RelationshipRepo>,
    media: Arc<dyn MediaStore>,
    jobs: Arc<dyn JobScheduler>,
}

impl StoryLifecycleManager {
    pub fn new(repos: &Repos, media: Arc<dyn MediaStore>, jobs: Arc<dyn JobScheduler>) -> Self {
        Self {
            stories: repos.stories.clone(),
            users: repos.users.clone(),
            relationships: repos.relationships.clone(),
            media,
            jobs,
        }
    }

    pub async fn create(&self, request: CreateStory) -> Result<Uuid, StoryError> {
        self.create_at(request, Utc::now()).await
    }

    /// Create a story as of `now`.
    ///
    /// Media is uploaded before anything is persisted, so a failed upload
    /// leaves no row behind. Scheduling the deletion job is best effort.
    pub async fn create_at(
        &self,
        request: CreateStory,
        now: DateTime<Utc>,
    ) -> Result<Uuid, StoryError> {
        if request.author_id.is_empty() {
            return Err(StoryError::Unauthenticated);
        }

        let media_url = if request.media_type.requires_upload() {
            let file = request.media.ok_or(StoryError::MediaRequired)?;
            self.upload_media(&request.author_id, file, now).await?
        } else {
            String::new()
        };

        let new_story = NewStory {
            author_id: request.author_id,
            content: request.content,
            media_url,
            media_type: request.media_type,
            background_color: request.background_color,
            created_at: now,
        };
        new_story.validate().map_err(StoryError::ValidationFailed)?;

        let story = self.stories.create(&new_story).await?;

        tracing::info!(
            story_id = %story.id,
            author_id = %story.author_id,
            media_type = %story.media_type,
            "story created"
        );

        self.schedule_deletion(&story).await;

        Ok(story.id)
    }

    async fn upload_media(
        &self,
        author_id: &str,
        file: MediaFile,
        now: DateTime<Utc>,
    ) -> Result<String, StoryError> {
        if file.bytes.is_empty() {
            return Err(StoryError::InvalidUpload);
        }

        let original = file
            .file_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("file");
        let file_name = format!("story_{}_{}_{}", author_id, now.timestamp_millis(), original);

        let uploaded = self
            .media
            .upload(UploadRequest {
                bytes: file.bytes,
                file_name,
                folder: None,
            })
            .await
            .map_err(|e| StoryError::MediaUploadFailed(format!("{:#}", e)))?;

        if uploaded.url.is_empty() {
            return Err(StoryError::MediaUploadFailed(
                "media host returned an empty URL".to_string(),
            ));
        }

        Ok(uploaded.url)
    }

    async fn schedule_deletion(&self, story: &Story) {
        let event = JobEvent::story_delete(story.id, story.created_at + story_ttl());

        if let Err(err) = self.jobs.send(&event).await {
            tracing::warn!(
                story_id = %story.id,
                error = %err,
                "failed to schedule story deletion, relying on sweep"
            );
            sentry::capture_error(err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static));
        }
    }

    pub async fn list_visible(&self, viewer_id: &str) -> Result<Vec<Story>, StoryError> {
        self.list_visible_at(viewer_id, Utc::now()).await
    }

    /// Stories `viewer_id` can see as of `now`: their own first, then those of
    /// connections and followed users, each group newest first.
    pub async fn list_visible_at(
        &self,
        viewer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>, StoryError> {
        if viewer_id.is_empty() {
            return Err(StoryError::Unauthenticated);
        }

        self.users
            .find_by_id(viewer_id)
            .await?
            .ok_or(StoryError::UserNotFound)?;

        self.sweep_expired(now).await?;

        let scope = scope_set(self.relationships.as_ref(), viewer_id).await?;
        let scoped = self.stories.list_by_authors(&scope).await?;
        let own = self.stories.list_by_author(viewer_id).await?;

        Ok(merge_visible(own, scoped, now - story_ttl()))
    }

    /// Delete every story older than the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, StoryError> {
        let removed = self.stories.delete_created_before(now - story_ttl()).await?;
        if removed > 0 {
            tracing::info!(removed, "swept expired stories");
        }
        Ok(removed)
    }

    /// Delete a single story if it still exists.
    pub async fn delete_story(&self, id: Uuid) -> Result<bool, StoryError> {
        let deleted = self.stories.delete(id).await?;
        tracing::debug!(story_id = %id, deleted, "story deletion");
        Ok(deleted)
    }
}

/// Own stories first, then the rest, skipping ids already seen and anything
/// created before `cutoff`.
fn merge_visible(own: Vec<Story>, scoped: Vec<Story>, cutoff: DateTime<Utc>) -> Vec<Story> {
    let mut seen = HashSet::new();
    own.into_iter()
        .chain(scoped)
        .filter(|story| story.created_at >= cutoff)
        .filter(|story| seen.insert(story.id))
        .collect()
}
