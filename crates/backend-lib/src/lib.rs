// ============================
// parlor-backend-lib/src/lib.rs
// ============================
//! Core backend library for the Parlor chat server.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod room;
pub mod routes;
pub mod storage;
pub mod ws_router;

use crate::auth::{SessionManager, UserStore};
use crate::config::Settings;
use crate::room::RoomHandle;
use crate::storage::MessageStore;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState<S> {
    /// Settings manager
    pub settings: Arc<Settings>,
    /// Message store backend
    pub storage: S,
    /// User account store
    pub users: Arc<UserStore>,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// Handle to the room actor
    pub room: RoomHandle,
}

impl<S> AppState<S>
where
    S: MessageStore + Clone + 'static,
{
    /// Create a new application state, spawning the room actor and the
    /// session cleanup task.
    pub fn new(storage: S, settings: Settings) -> anyhow::Result<Self> {
        let users = Arc::new(UserStore::load(&settings.data_dir)?);
        let sessions = Arc::new(SessionManager::new(Duration::from_secs(
            settings.session_ttl_secs,
        )));
        let room = room::spawn_room(storage.clone());

        Ok(Self {
            settings: Arc::new(settings),
            storage,
            users,
            sessions,
            room,
        })
    }
}

/// Assemble the full application router: HTTP API, WebSocket, CORS and
/// request tracing.
pub fn app_router<S>(state: Arc<AppState<S>>) -> Router
where
    S: MessageStore + Clone + 'static,
{
    let cors = cors_layer(&state.settings);
    Router::new()
        .merge(routes::router(state.clone()))
        .merge(ws_router::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
