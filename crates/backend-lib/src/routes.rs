// ============================
// parlor-backend-lib/src/routes.rs
// ============================
//! HTTP API: registration, login, sessions, and message history.
use crate::auth::{Session, SessionManager};
use crate::error::AppError;
use crate::storage::{MessageStore, HISTORY_LIMIT};
use crate::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use parlor_common::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Create the HTTP API router
pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: MessageStore + Clone + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(register::<S>))
        .route("/api/login", post(login::<S>))
        .route("/api/logout", post(logout::<S>))
        .route("/api/check-auth", get(check_auth::<S>))
        .route("/api/messages", get(recent_messages::<S>))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

async fn register<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError>
where
    S: MessageStore + Clone + 'static,
{
    state
        .users
        .register(&credentials.username, &credentials.password)
        .await?;
    tracing::info!("registered user '{}'", credentials.username);

    let token = state.sessions.create(&credentials.username);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            username: credentials.username,
            token,
        }),
    ))
}

async fn login<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError>
where
    S: MessageStore + Clone + 'static,
{
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    state
        .users
        .verify(&credentials.username, &credentials.password)?;
    tracing::info!("user '{}' logged in", credentials.username);

    let token = state.sessions.create(&credentials.username);
    Ok(Json(AuthResponse {
        username: credentials.username,
        token,
    }))
}

async fn logout<S>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Json<serde_json::Value>
where
    S: MessageStore + Clone + 'static,
{
    if let Some(token) = bearer_token(&headers) {
        if state.sessions.destroy(token) {
            tracing::info!("session destroyed");
        }
    }
    Json(serde_json::json!({ "message": "Logged out successfully" }))
}

/// Always 200; reports whether the presented token maps to a live session
async fn check_auth<S>(State(state): State<Arc<AppState<S>>>, headers: HeaderMap) -> Json<AuthStatus>
where
    S: MessageStore + Clone + 'static,
{
    let session = bearer_token(&headers).and_then(|token| state.sessions.get(token));
    match session {
        Some(session) => Json(AuthStatus {
            is_authenticated: true,
            username: Some(session.username),
        }),
        None => Json(AuthStatus {
            is_authenticated: false,
            username: None,
        }),
    }
}

/// Get recent messages; requires a live session
async fn recent_messages<S>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatMessage>>, AppError>
where
    S: MessageStore + Clone + 'static,
{
    let _session = authorize(&state.sessions, &headers)?;
    let messages = state.storage.recent_messages(HISTORY_LIMIT).await?;
    Ok(Json(messages))
}

fn authorize(sessions: &SessionManager, headers: &HeaderMap) -> Result<Session, AppError> {
    bearer_token(headers)
        .and_then(|token| sessions.get(token))
        .ok_or_else(|| AppError::Auth("Please log in".to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
