//! Shared test utilities for API handler tests.
//!
//! Provides mock factories, an in-memory story store for time-based
//! scenarios, and a `TestStateBuilder` for constructing `AppState` with only
//! the collaborators each test cares about.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_user};
//!
//! let mut user_repo = MockUserRepo::new();
//! user_repo.expect_find_by_id().returning(|id| Ok(Some(mock_user(id))));
//!
//! let state = TestStateBuilder::new()
//!     .with_user_repo(user_repo)
//!     .build();
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{Request, header::CONTENT_TYPE},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use shared::api::MediaType;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{NewStory, Story, User};
use crate::repos::{
    MockPostRepo, MockRelationshipRepo, MockStoryRepo, MockUserRepo, Repos, StoryRepo,
};
use crate::services::{AuthResolver, MediaStore, MockMediaStore, MockTokenVerifier};
use crate::state::AppState;
use crate::stores::{JobScheduler, MockJobScheduler};
use crate::stories::StoryLifecycleManager;

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        redis_url: "redis://test".to_string(),
        clerk_jwt_key: "test".to_string(),
        clerk_issuer: None,
        clerk_authorized_parties: None,
        imagekit_private_key: "private_test".to_string(),
        imagekit_url_endpoint: "https://ik.imagekit.io/test".to_string(),
        max_upload_bytes: 1024 * 1024,
        job_poll_interval_secs: 30,
        http_timeout_secs: 5,
        cors_origin: None,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Creates a mock user with the given identity.
pub fn mock_user(id: &str) -> User {
    User {
        id: id.to_string(),
        full_name: format!("User {}", id),
        username: id.to_string(),
        profile_picture: None,
        created_at: Utc::now(),
    }
}

/// The row a store would return for `story`.
pub fn persisted(story: &NewStory) -> Story {
    Story {
        id: Uuid::new_v4(),
        author_id: story.author_id.clone(),
        content: story.content.clone(),
        media_url: story.media_url.clone(),
        media_type: story.media_type,
        background_color: story.background_color.clone(),
        viewer_ids: vec![],
        created_at: story.created_at,
    }
}

/// A text story by `author_id` created at `at`.
pub fn story_at(author_id: &str, at: DateTime<Utc>) -> Story {
    persisted(&NewStory {
        author_id: author_id.to_string(),
        content: Some(format!("story by {}", author_id)),
        media_url: String::new(),
        media_type: MediaType::Text,
        background_color: None,
        created_at: at,
    })
}

/// Story store backed by a vector, for tests that move the clock.
#[derive(Default)]
pub struct InMemoryStoryRepo {
    stories: Mutex<Vec<Story>>,
}

impl InMemoryStoryRepo {
    pub fn insert_at(&self, author_id: &str, at: DateTime<Utc>) -> Uuid {
        let story = story_at(author_id, at);
        let id = story.id;
        self.stories.lock().unwrap().push(story);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Story> {
        self.stories
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.stories.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn newest_first(&self, keep: impl Fn(&Story) -> bool) -> Vec<Story> {
        let mut stories: Vec<Story> = self
            .stories
            .lock()
            .unwrap()
            .iter()
            .filter(|s| keep(s))
            .cloned()
            .collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        stories
    }
}

#[async_trait]
impl StoryRepo for InMemoryStoryRepo {
    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn create(&self, story: &NewStory) -> anyhow::Result<Story> {
        let stored = persisted(story);
        self.stories.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_by_authors(&self, author_ids: &[String]) -> anyhow::Result<Vec<Story>> {
        Ok(self.newest_first(|s| author_ids.contains(&s.author_id)))
    }

    async fn list_by_author(&self, author_id: &str) -> anyhow::Result<Vec<Story>> {
        Ok(self.newest_first(|s| s.author_id == author_id))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut stories = self.stories.lock().unwrap();
        let before = stories.len();
        stories.retain(|s| s.id != id);
        Ok(stories.len() < before)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut stories = self.stories.lock().unwrap();
        let before = stories.len();
        stories.retain(|s| s.created_at >= cutoff);
        Ok((before - stories.len()) as u64)
    }
}

/// One part of a multipart body.
pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

const BOUNDARY: &str = "storyline-test-boundary";

/// Builds the multipart extractor the create handlers take from the given parts.
pub async fn multipart(parts: &[FormPart<'_>]) -> WithRejection<Multipart, AppError> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    WithRejection::<Multipart, AppError>::from_request(request, &())
        .await
        .unwrap()
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for anything not explicitly set, so a call
/// into an unconfigured collaborator fails the test.
pub struct TestStateBuilder {
    story_repo: Option<Arc<dyn StoryRepo>>,
    user_repo: Option<MockUserRepo>,
    relationship_repo: Option<MockRelationshipRepo>,
    post_repo: Option<MockPostRepo>,
    token_verifier: Option<MockTokenVerifier>,
    media_store: Option<MockMediaStore>,
    job_scheduler: Option<MockJobScheduler>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            story_repo: None,
            user_repo: None,
            relationship_repo: None,
            post_repo: None,
            token_verifier: None,
            media_store: None,
            job_scheduler: None,
        }
    }

    pub fn with_story_repo(mut self, repo: MockStoryRepo) -> Self {
        self.story_repo = Some(Arc::new(repo));
        self
    }

    pub fn with_in_memory_stories(mut self, repo: Arc<InMemoryStoryRepo>) -> Self {
        self.story_repo = Some(repo);
        self
    }

    pub fn with_user_repo(mut self, repo: MockUserRepo) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn with_relationship_repo(mut self, repo: MockRelationshipRepo) -> Self {
        self.relationship_repo = Some(repo);
        self
    }

    pub fn with_post_repo(mut self, repo: MockPostRepo) -> Self {
        self.post_repo = Some(repo);
        self
    }

    pub fn with_token_verifier(mut self, verifier: MockTokenVerifier) -> Self {
        self.token_verifier = Some(verifier);
        self
    }

    pub fn with_media_store(mut self, store: MockMediaStore) -> Self {
        self.media_store = Some(store);
        self
    }

    pub fn with_job_scheduler(mut self, scheduler: MockJobScheduler) -> Self {
        self.job_scheduler = Some(scheduler);
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let repos = Repos {
            stories: self
                .story_repo
                .unwrap_or_else(|| Arc::new(MockStoryRepo::new())),
            users: Arc::new(self.user_repo.unwrap_or_else(MockUserRepo::new)),
            relationships: Arc::new(
                self.relationship_repo
                    .unwrap_or_else(MockRelationshipRepo::new),
            ),
            posts: Arc::new(self.post_repo.unwrap_or_else(MockPostRepo::new)),
        };

        let auth = AuthResolver::new(Arc::new(
            self.token_verifier.unwrap_or_else(MockTokenVerifier::new),
        ));
        let media = Arc::new(self.media_store.unwrap_or_else(MockMediaStore::new))
            as Arc<dyn MediaStore>;
        let jobs = Arc::new(self.job_scheduler.unwrap_or_else(default_job_scheduler))
            as Arc<dyn JobScheduler>;
        let stories = StoryLifecycleManager::new(&repos, media.clone(), jobs.clone());

        AppState {
            config: test_config(),
            repos,
            auth,
            media,
            jobs,
            stories,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts every scheduled job.
fn default_job_scheduler() -> MockJobScheduler {
    let mut jobs = MockJobScheduler::new();
    jobs.expect_send().returning(|_| Ok(()));
    jobs
}
