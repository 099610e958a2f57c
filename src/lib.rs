use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod assistant;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mood;
pub mod session;

use assistant::KeywordResponder;
use auth::rate_limit::RateLimitState;
use clock::SystemClock;
use config::Config;
use db::SqliteSlots;
use session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub sessions: SessionRegistry,
    pub ws_tx: broadcast::Sender<String>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Arc<Config>) -> Self {
        let (ws_tx, _) = broadcast::channel::<String>(256);

        let sessions = SessionRegistry::new(
            Arc::new(SqliteSlots::new(db.clone())),
            Arc::new(SystemClock),
            Arc::new(KeywordResponder),
            config.chat_reply_delay(),
        )
        .with_notifier(ws_tx.clone());

        Self {
            db,
            config,
            sessions,
            ws_tx,
            rate_limiter: RateLimitState::new(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Mood
        .route(
            "/api/mood/entries",
            get(handlers::mood::list_entries).post(handlers::mood::add_entry),
        )
        .route("/api/mood/today", get(handlers::mood::today_entry))
        .route("/api/mood/stats", get(handlers::mood::get_stats))
        // Chat
        .route(
            "/api/chat/messages",
            get(handlers::chat::list_messages)
                .post(handlers::chat::send_message)
                .delete(handlers::chat::clear_messages),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .allow_credentials(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    let mut origins: Vec<HeaderValue> = config
        .frontend_url
        .parse::<HeaderValue>()
        .ok()
        .into_iter()
        .collect();
    // Extra comma-separated origins, e.g. for testing from another device on the LAN.
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<HeaderValue>() {
                origins.push(hv);
            }
        }
    }
    origins
}
