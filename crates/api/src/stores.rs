//! Ephemeral stores (Redis).
//!
//! ## Stores
//!
//! - **jobs** - Delayed events such as story deletion, one sorted set per event
//!
//! ## Redis Key Patterns
//!
//! ```text
//! jobs:{event_name}   → Sorted set of JobEvent JSON, scored by due time (ms)
//! ```

mod jobs;

pub use jobs::{JobEvent, JobScheduler, RedisJobScheduler, events};

#[cfg(test)]
pub use jobs::MockJobScheduler;
