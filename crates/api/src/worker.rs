//! Background consumer for scheduled story deletions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    stores::{JobScheduler, events},
    stories::StoryLifecycleManager,
};

/// Poll the job queue forever, deleting stories whose deletion job is due.
pub async fn run_deletion_worker(
    manager: StoryLifecycleManager,
    jobs: Arc<dyn JobScheduler>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match process_due(&manager, jobs.as_ref(), Utc::now()).await {
            Ok(0) => {}
            Ok(processed) => tracing::info!(processed, "processed story deletion jobs"),
            Err(e) => tracing::error!(error = ?e, "story deletion worker failed"),
        }
    }
}

/// Claim and run every deletion job due at `now`. Returns how many jobs were
/// claimed. A failed delete is logged; the sweep catches it later.
pub async fn process_due(
    manager: &StoryLifecycleManager,
    jobs: &dyn JobScheduler,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let due = jobs.claim_due(events::STORY_DELETE, now).await?;

    for event in &due {
        let Some(story_id) = event.story_id() else {
            tracing::warn!(data = %event.data, "deletion job without a story id");
            continue;
        };

        match manager.delete_story(story_id).await {
            Ok(true) => tracing::info!(%story_id, "story deleted by scheduled job"),
            Ok(false) => tracing::debug!(%story_id, "story already gone"),
            Err(e) => tracing::warn!(%story_id, error = %e, "scheduled story deletion failed"),
        }
    }

    Ok(due.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{JobEvent, MockJobScheduler};
    use crate::test_utils::{InMemoryStoryRepo, TestStateBuilder};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn due_jobs_delete_their_stories() {
        let stories = Arc::new(InMemoryStoryRepo::default());
        let now = Utc::now();
        let expired = stories.insert_at("alice", now - chrono::Duration::hours(24));
        let live = stories.insert_at("alice", now);

        let state = TestStateBuilder::new()
            .with_in_memory_stories(stories.clone())
            .build();

        let mut jobs = MockJobScheduler::new();
        jobs.expect_claim_due()
            .with(eq(events::STORY_DELETE), eq(now))
            .times(1)
            .returning(move |_, _| Ok(vec![JobEvent::story_delete(expired, now)]));

        let processed = process_due(&state.stories, &jobs, now).await.unwrap();

        assert_eq!(processed, 1);
        assert!(stories.get(expired).is_none());
        assert!(stories.get(live).is_some());
    }

    #[tokio::test]
    async fn already_deleted_story_is_not_an_error() {
        let stories = Arc::new(InMemoryStoryRepo::default());
        let state = TestStateBuilder::new()
            .with_in_memory_stories(stories)
            .build();
        let now = Utc::now();

        let mut jobs = MockJobScheduler::new();
        jobs.expect_claim_due()
            .returning(move |_, _| Ok(vec![JobEvent::story_delete(uuid::Uuid::new_v4(), now)]));

        assert_eq!(process_due(&state.stories, &jobs, now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn malformed_job_is_skipped() {
        let state = TestStateBuilder::new()
            .with_in_memory_stories(Arc::new(InMemoryStoryRepo::default()))
            .build();
        let now = Utc::now();

        let mut jobs = MockJobScheduler::new();
        jobs.expect_claim_due().returning(move |_, _| {
            Ok(vec![JobEvent {
                name: events::STORY_DELETE.to_string(),
                data: serde_json::json!({ "id": 7 }),
                run_at: now,
            }])
        });

        assert_eq!(process_due(&state.stories, &jobs, now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn queue_errors_propagate() {
        let state = TestStateBuilder::new().build();
        let mut jobs = MockJobScheduler::new();
        jobs.expect_claim_due()
            .returning(|_, _| Err(anyhow::anyhow!("redis down")));

        assert!(process_due(&state.stories, &jobs, Utc::now()).await.is_err());
    }
}
