//! Scheduled job queue for Redis (sorted sets keyed by due time).

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most jobs taken from one queue in a single poll.
const CLAIM_BATCH: isize = 100;

/// Event names understood by the worker.
pub mod events {
    pub const STORY_DELETE: &str = "app/story.delete";
}

/// A named event to be delivered no earlier than `run_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub name: String,
    pub data: serde_json::Value,
    pub run_at: DateTime<Utc>,
}

impl JobEvent {
    pub fn story_delete(story_id: Uuid, run_at: DateTime<Utc>) -> Self {
        Self {
            name: events::STORY_DELETE.to_string(),
            data: serde_json::json!({ "storyId": story_id }),
            run_at,
        }
    }

    /// Story referenced by a deletion event, if the payload carries one.
    pub fn story_id(&self) -> Option<Uuid> {
        self.data
            .get("storyId")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Check Redis connectivity.
    async fn health_check(&self) -> Result<()>;

    /// Enqueue an event for delivery at its `run_at`.
    async fn send(&self, event: &JobEvent) -> Result<()>;

    /// Take up to a batch of events named `name` that are due at `now`. An
    /// event is returned to exactly one caller even with several workers
    /// polling.
    async fn claim_due(&self, name: &str, now: DateTime<Utc>) -> Result<Vec<JobEvent>>;
}

/// Redis implementation of JobScheduler.
#[derive(Clone)]
pub struct RedisJobScheduler {
    client: redis::Client,
}

impl RedisJobScheduler {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn queue_key(name: &str) -> String {
        format!("jobs:{}", name)
    }
}

#[async_trait]
impl JobScheduler for RedisJobScheduler {
    async fn health_check(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn send(&self, event: &JobEvent) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::queue_key(&event.name);
        let member = serde_json::to_string(event)?;

        let _: () = conn
            .zadd(&key, member, event.run_at.timestamp_millis() as f64)
            .await?;
        Ok(())
    }

    async fn claim_due(&self, name: &str, now: DateTime<Utc>) -> Result<Vec<JobEvent>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::queue_key(name);

        let members: Vec<String> = conn
            .zrangebyscore_limit(
                &key,
                f64::NEG_INFINITY,
                now.timestamp_millis() as f64,
                0,
                CLAIM_BATCH,
            )
            .await?;

        claim_members(&key, members, |member| {
            let mut conn = conn.clone();
            let key = key.clone();
            async move { Ok(conn.zrem::<_, _, i64>(&key, &member).await?) }
        })
        .await
    }
}

/// Remove each member and keep the ones this caller removed. Jobs already
/// taken off the queue are returned even if a later removal fails.
async fn claim_members<F, Fut>(
    key: &str,
    members: Vec<String>,
    mut remove: F,
) -> Result<Vec<JobEvent>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<i64>>,
{
    let mut claimed = Vec::with_capacity(members.len());
    for member in members {
        // Whoever removes the member owns the job.
        let removed = match remove(member.clone()).await {
            Ok(removed) => removed,
            Err(e) if claimed.is_empty() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, %key, claimed = claimed.len(), "claim interrupted");
                break;
            }
        };
        if removed != 1 {
            continue;
        }

        match serde_json::from_str::<JobEvent>(&member) {
            Ok(event) => claimed.push(event),
            Err(e) => tracing::warn!(error = %e, %key, "dropping malformed job"),
        }
    }

    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_delete_event_carries_story_id() {
        let id = Uuid::new_v4();
        let event = JobEvent::story_delete(id, Utc::now());

        assert_eq!(event.name, "app/story.delete");
        assert_eq!(event.story_id(), Some(id));
    }

    #[test]
    fn story_id_is_none_for_foreign_payloads() {
        let event = JobEvent {
            name: events::STORY_DELETE.to_string(),
            data: serde_json::json!({ "storyId": "not-a-uuid" }),
            run_at: Utc::now(),
        };
        assert_eq!(event.story_id(), None);

        let event = JobEvent {
            data: serde_json::json!({}),
            ..event
        };
        assert_eq!(event.story_id(), None);
    }

    fn member(run_at: DateTime<Utc>) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let event = JobEvent::story_delete(id, run_at);
        (id, serde_json::to_string(&event).unwrap())
    }

    #[tokio::test]
    async fn claims_only_members_this_caller_removed() {
        let now = Utc::now();
        let (mine, first) = member(now);
        let (_, taken) = member(now);

        let claimed = claim_members("jobs:test", vec![first.clone(), taken], |m| {
            let won = m == first;
            async move { Ok(if won { 1 } else { 0 }) }
        })
        .await
        .unwrap();

        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].story_id(), Some(mine));
    }

    #[tokio::test]
    async fn failed_removal_keeps_jobs_already_claimed() {
        let now = Utc::now();
        let (first_id, first) = member(now);
        let (_, second) = member(now);
        let (_, third) = member(now);

        let mut calls = 0;
        let claimed = claim_members("jobs:test", vec![first, second, third], |_| {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 1 {
                    Ok(1)
                } else {
                    Err(anyhow::anyhow!("connection reset"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(
            claimed.iter().map(JobEvent::story_id).collect::<Vec<_>>(),
            vec![Some(first_id)]
        );
    }

    #[tokio::test]
    async fn failure_before_any_claim_is_an_error() {
        let (_, only) = member(Utc::now());

        let result = claim_members("jobs:test", vec![only], |_| async {
            Err(anyhow::anyhow!("connection reset"))
        })
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn queue_key_is_namespaced_by_event() {
        assert_eq!(
            RedisJobScheduler::queue_key(events::STORY_DELETE),
            "jobs:app/story.delete"
        );
    }
}
