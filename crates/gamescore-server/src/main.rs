//! GameScore Server
//!
//! Hosts live scoring events: score submission, cached public scoreboards
//! and server-sent event streams that push every new score to watchers.
//!
//! Uses SQLite (embedded) for persistence and in-process caches for reads.

mod config;
mod error;
mod extractors;
mod handlers;
mod services;
mod storage;


use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use gamescore_core::{RateLimitPolicy, RateLimiter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::error::ApiError;
use crate::services::{AccessService, CacheRegistry, EventService, LiveUpdates, ScoreService};
use crate::storage::Database;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub caches: Arc<CacheRegistry>,
    pub live: LiveUpdates,
    pub rate_limiter: RateLimiter,
    pub events: Arc<EventService>,
    pub scores: Arc<ScoreService>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let db = Arc::new(db);
        let caches = Arc::new(CacheRegistry::new(&config.cache));
        let live = LiveUpdates::new();
        let access = Arc::new(AccessService::new(db.clone(), caches.clone()));
        let events = Arc::new(EventService::new(
            db.clone(),
            caches.clone(),
            access.clone(),
            live.clone(),
        ));
        let scores = Arc::new(ScoreService::new(db, caches.clone(), access, live.clone()));

        Self {
            caches,
            live,
            rate_limiter: RateLimiter::new(),
            events,
            scores,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Count a request from `ip` against the window for `path`
    pub fn check_rate_limit(
        &self,
        ip: &str,
        path: &str,
        policy: RateLimitPolicy,
    ) -> Result<(), ApiError> {
        let decision = self
            .rate_limiter
            .check(&format!("{}:{}", ip, path), policy);
        if decision.allowed {
            Ok(())
        } else {
            Err(ApiError::rate_limited(decision))
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing, RUST_LOG overrides the default level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting GameScore Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let database_path = config.database_path();
    info!(
        "Config loaded: bind={}, db={}",
        config.bind_address, database_path
    );

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create data directory {}",
                config.data_dir.display()
            )
        })?;

    info!("Initializing SQLite database...");
    let db = Database::new(&database_path)
        .await
        .context("Failed to initialize database")?;

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    let cleanup_every = Duration::from_secs(config.rate_limit.cleanup_interval_secs.max(1));

    let state = AppState::new(config, db);
    let _cleanup = state.rate_limiter.start_cleanup_task(cleanup_every);

    let app = app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server ready to accept connections");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // REST API routes
        .nest("/api/v1", api_routes())
        // Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(handlers::events::create))
        .route("/events/public", get(handlers::events::list_public))
        .route(
            "/events/:id",
            get(handlers::events::get).patch(handlers::events::update),
        )
        .route(
            "/events/:id/scores",
            get(handlers::scores::list).post(handlers::scores::submit),
        )
        .route("/events/:id/stream", get(handlers::stream::stream))
        .route("/events/:id/listeners", get(handlers::stream::listeners))
        .route(
            "/public/:token/scoreboard",
            get(handlers::public::scoreboard),
        )
}
