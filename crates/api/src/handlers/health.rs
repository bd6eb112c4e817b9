//! Health check endpoint for load balancers and monitoring.
//!
//! Returns 200 OK if the database and Redis are reachable, 503 Service
//! Unavailable otherwise.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
    redis: bool,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (db, redis) = tokio::join!(
        state.repos.stories.health_check(),
        state.jobs.health_check()
    );

    if let Err(e) = &db {
        tracing::warn!(error = %e, "database health check failed");
    }
    if let Err(e) = &redis {
        tracing::warn!(error = %e, "redis health check failed");
    }

    let healthy = db.is_ok() && redis.is_ok();

    let response = HealthResponse {
        status: if healthy { "ok" } else { "unhealthy" },
        database: db.is_ok(),
        redis: redis.is_ok(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
