mod clerk;
mod config;
mod error;
mod handlers;
mod imagekit;
mod middleware;
mod models;
mod repos;
mod services;
mod state;
mod stores;
mod stories;
#[cfg(test)]
mod test_utils;
mod worker;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{extract::DefaultBodyLimit, http};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    repos::{PgPostRepo, PgRelationshipRepo, PgStoryRepo, PgUserRepo, Repos},
    services::{AuthResolver, ClerkTokenVerifier, ImageKitMediaStore},
    state::AppState,
    stores::RedisJobScheduler,
    stories::StoryLifecycleManager,
};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "Storyline API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = envy::prefixed("STORYLINE_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    // Run migrations via init container only (--migrate flag)
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let redis = redis::Client::open(config.redis_url.as_str())?;

    let clerk = clerk::Client::new(
        &config.clerk_jwt_key,
        config.clerk_issuer.as_deref(),
        config.authorized_parties(),
    )?;
    let imagekit = imagekit::Client::new(
        &config.imagekit_private_key,
        &config.imagekit_url_endpoint,
        Duration::from_secs(config.http_timeout_secs),
    )?;

    let repos = Repos {
        stories: Arc::new(PgStoryRepo::new(database.clone())),
        users: Arc::new(PgUserRepo::new(database.clone())),
        relationships: Arc::new(PgRelationshipRepo::new(database.clone())),
        posts: Arc::new(PgPostRepo::new(database)),
    };

    let auth = AuthResolver::new(Arc::new(ClerkTokenVerifier::new(clerk)));
    let media = Arc::new(ImageKitMediaStore::new(imagekit));
    let jobs = Arc::new(RedisJobScheduler::new(redis));
    let stories = StoryLifecycleManager::new(&repos, media.clone(), jobs.clone());

    let worker = tokio::spawn(worker::run_deletion_worker(
        stories.clone(),
        jobs.clone(),
        Duration::from_secs(config.job_poll_interval_secs),
    ));

    let state = AppState {
        config: config.clone(),
        repos,
        auth,
        media,
        jobs,
        stories,
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let mut app = handlers::router(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        // Story videos are large; raise axum's 2MB multipart default to the same cap.
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes));

    if let Some(origin) = &config.cors_origin {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin.parse::<http::HeaderValue>()?)
                .allow_methods([http::Method::GET, http::Method::POST])
                .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
                .allow_credentials(true),
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker.abort();
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
