//! Post repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{NewPost, Post};

const POST_COLUMNS: &str = "id, author_id, content, image_urls, post_type, likes, created_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Posts by any of the given authors, newest first.
    async fn list_by_authors(&self, author_ids: &[String]) -> Result<Vec<Post>>;

    /// Flip `user_id`'s like on a post. Returns `Some(true)` if the post is
    /// now liked, `Some(false)` if unliked, `None` if the post does not exist.
    async fn toggle_like(&self, post_id: Uuid, user_id: &str) -> Result<Option<bool>>;
}

/// PostgreSQL implementation of PostRepo.
#[derive(Clone)]
pub struct PgPostRepo {
    pool: Pool<Postgres>,
}

impl PgPostRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepo for PgPostRepo {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let sql = format!(
            "INSERT INTO posts (author_id, content, image_urls, post_type)
             VALUES ($1, $2, $3, $4)
             RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(&post.author_id)
            .bind(&post.content)
            .bind(&post.image_urls)
            .bind(post.post_type.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    async fn list_by_authors(&self, author_ids: &[String]) -> Result<Vec<Post>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE author_id = ANY($1)
             ORDER BY created_at DESC"
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(author_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: &str) -> Result<Option<bool>> {
        // Single statement so concurrent toggles cannot lose an update.
        let liked = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE posts
            SET likes = CASE
                WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                ELSE array_append(likes, $2)
            END
            WHERE id = $1
            RETURNING $2 = ANY(likes)
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(liked)
    }
}
