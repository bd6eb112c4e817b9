//! HTTP handlers, one module per resource.

pub mod health;
pub mod posts;
pub mod stories;

use axum::{Router, middleware::from_fn_with_state};

use crate::{middleware::session::attach_session, state::AppState};

/// Empty form values count as absent.
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// All routes, with the session cookie layer applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/stories", stories::router())
        .nest("/posts", posts::router())
        .layer(from_fn_with_state(state.clone(), attach_session))
        .with_state(state)
}
