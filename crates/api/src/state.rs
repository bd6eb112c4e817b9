use std::sync::Arc;

use crate::{
    config::Config,
    repos::Repos,
    services::{AuthResolver, MediaStore},
    stores::JobScheduler,
    stories::StoryLifecycleManager,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// Caller identity resolution (Clerk).
    pub auth: AuthResolver,
    /// Media host (ImageKit).
    pub media: Arc<dyn MediaStore>,
    /// Delayed job queue (Redis).
    pub jobs: Arc<dyn JobScheduler>,
    /// Story creation, listing and expiry.
    pub stories: StoryLifecycleManager,
}
