//! Social graph repository for PostgreSQL.
//!
//! Connections are mutual and stored once per pair with `user_a < user_b`.
//! Follows are directed.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipRepo: Send + Sync {
    /// Identities mutually connected to `user_id`.
    async fn connections(&self, user_id: &str) -> Result<Vec<String>>;

    /// Identities `user_id` follows.
    async fn following(&self, user_id: &str) -> Result<Vec<String>>;
}

/// Everyone whose content `user_id` sees: the user, then connections, then
/// followed users. No duplicates.
pub async fn scope_set(relationships: &dyn RelationshipRepo, user_id: &str) -> Result<Vec<String>> {
    let connections = relationships.connections(user_id).await?;
    let following = relationships.following(user_id).await?;

    let mut scope = vec![user_id.to_string()];
    for id in connections.into_iter().chain(following) {
        if !scope.contains(&id) {
            scope.push(id);
        }
    }
    Ok(scope)
}

/// PostgreSQL implementation of RelationshipRepo.
#[derive(Clone)]
pub struct PgRelationshipRepo {
    pool: Pool<Postgres>,
}

impl PgRelationshipRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationshipRepo for PgRelationshipRepo {
    async fn connections(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END
            FROM connections
            WHERE user_a = $1 OR user_b = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn following(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT followee_id FROM follows WHERE follower_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
