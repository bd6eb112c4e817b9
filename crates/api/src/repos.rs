//! Database repositories (PostgreSQL).
//!
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **stories** - Ephemeral stories (create, scoped listing, expiry deletes)
//! - **users** - Profile lookups
//! - **relationships** - Connections and follows, and the viewer scope set
//! - **posts** - Feed posts and likes
//!
//! ## Usage in Handlers
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let user = state.repos.users.find_by_id(&user_id).await?;
//!     let scope = scope_set(state.repos.relationships.as_ref(), &user_id).await?;
//! }
//! ```

mod posts;
mod relationships;
mod stories;
mod users;

pub use posts::{PgPostRepo, PostRepo};
pub use relationships::{PgRelationshipRepo, RelationshipRepo, scope_set};
pub use stories::{PgStoryRepo, StoryRepo};
pub use users::{PgUserRepo, UserRepo};

#[cfg(test)]
pub use posts::MockPostRepo;
#[cfg(test)]
pub use relationships::MockRelationshipRepo;
#[cfg(test)]
pub use stories::MockStoryRepo;
#[cfg(test)]
pub use users::MockUserRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub stories: Arc<dyn StoryRepo>,
    pub users: Arc<dyn UserRepo>,
    pub relationships: Arc<dyn RelationshipRepo>,
    pub posts: Arc<dyn PostRepo>,
}
