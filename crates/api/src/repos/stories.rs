//! Story repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{NewStory, Story};

const STORY_COLUMNS: &str =
    "id, author_id, content, media_url, media_type, background_color, viewer_ids, created_at";

/// Repository for story operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryRepo: Send + Sync {
    /// Check database connectivity.
    async fn health_check(&self) -> Result<()>;

    /// Insert a story and return the stored row.
    async fn create(&self, story: &NewStory) -> Result<Story>;

    /// Stories by any of the given authors, newest first.
    async fn list_by_authors(&self, author_ids: &[String]) -> Result<Vec<Story>>;

    /// Stories by a single author, newest first.
    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Story>>;

    /// Delete a story. Returns false if it was already gone.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Delete every story created strictly before `cutoff`.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// PostgreSQL implementation of StoryRepo.
#[derive(Clone)]
pub struct PgStoryRepo {
    pool: Pool<Postgres>,
}

impl PgStoryRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepo for PgStoryRepo {
    async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn create(&self, story: &NewStory) -> Result<Story> {
        let sql = format!(
            "INSERT INTO stories (author_id, content, media_url, media_type, background_color, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {STORY_COLUMNS}"
        );
        let story = sqlx::query_as::<_, Story>(&sql)
            .bind(&story.author_id)
            .bind(&story.content)
            .bind(&story.media_url)
            .bind(story.media_type.as_str())
            .bind(&story.background_color)
            .bind(story.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(story)
    }

    async fn list_by_authors(&self, author_ids: &[String]) -> Result<Vec<Story>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories
             WHERE author_id = ANY($1)
             ORDER BY created_at DESC"
        );
        let stories = sqlx::query_as::<_, Story>(&sql)
            .bind(author_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(stories)
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Story>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories
             WHERE author_id = $1
             ORDER BY created_at DESC"
        );
        let stories = sqlx::query_as::<_, Story>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(stories)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM stories WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
