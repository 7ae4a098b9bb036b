//! API routes for practiced
//!
//! Each route is one user action against the caller's session context;
//! practice actions answer with a fresh session snapshot.

use crate::auth::{extract_session_token, require_session};
use crate::error::ApiError;
use crate::server::AppState;
use crate::sessions::mask_token;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use practice_common::api::{
    AnswerRequest, ClearInventoryResponse, CredentialsRequest, HealthResponse, InventoryItemView,
    InventoryResponse, LoginResponse, MessageResponse,
};
use practice_common::{PracticeError, PracticeStats, RegisterOutcome, SessionSnapshot};
use std::sync::Arc;
use tracing::{info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Auth Routes
// ============================================================================

pub fn auth_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/logout", post(logout))
}

async fn register(
    State(state): State<AppStateArc>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(req) = body?;
    match state.credentials.register(&req.username, &req.password).await? {
        RegisterOutcome::Registered => Ok((
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "User registered successfully! Please log in.".to_string(),
            }),
        )),
        RegisterOutcome::AlreadyExists => Err(PracticeError::UsernameTaken.into()),
    }
}

async fn login(
    State(state): State<AppStateArc>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body?;
    if !state
        .credentials
        .authenticate(&req.username, &req.password)
        .await?
    {
        warn!("Failed login for {}", req.username);
        return Err(PracticeError::InvalidCredentials.into());
    }

    let session = state.flow.start(&req.username)?;
    let snapshot = session.snapshot();
    let token = state.sessions.create(session).await;
    info!("{} logged in (session {})", req.username, mask_token(&token));

    Ok(Json(LoginResponse {
        token: token.to_string(),
        session: snapshot,
    }))
}

/// Dropping an unknown session is not an error
async fn logout(State(state): State<AppStateArc>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = extract_session_token(&headers) {
        if state.sessions.remove(&token).await {
            info!("Session {} logged out", mask_token(&token));
        }
    }
    StatusCode::NO_CONTENT
}

// ============================================================================
// Practice Routes
// ============================================================================

pub fn practice_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/practice", get(current_practice))
        .route("/v1/practice/answer", post(submit_answer))
        .route("/v1/practice/next", post(next_question))
        .route("/v1/practice/stats", get(practice_stats))
}

async fn current_practice(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn submit_answer(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    body: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let Json(req) = body?;
    let mut session = session.lock().await;
    let snapshot = state.flow.submit(&mut session, req.answer).await?;
    Ok(Json(snapshot))
}

async fn next_question(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = require_session(&state, &headers).await?;
    let mut session = session.lock().await;
    let snapshot = state.flow.next_question(&mut session)?;
    Ok(Json(snapshot))
}

async fn practice_stats(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<PracticeStats>, ApiError> {
    let username = session_username(&state, &headers).await?;
    let stats = state
        .log
        .stats(&username)
        .await
        .map_err(PracticeError::from)?;
    Ok(Json(stats))
}

// ============================================================================
// Inventory Routes
// ============================================================================

pub fn inventory_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/inventory", get(list_inventory).delete(clear_inventory))
}

async fn list_inventory(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<InventoryResponse>, ApiError> {
    let username = session_username(&state, &headers).await?;
    let titles = state
        .inventory
        .list(&username)
        .await
        .map_err(PracticeError::from)?;

    let catalog = state.flow.catalog();
    let items = titles
        .into_iter()
        .map(|title| InventoryItemView {
            url: catalog.url_for(&title).map(str::to_string),
            title,
        })
        .collect();

    Ok(Json(InventoryResponse { username, items }))
}

async fn clear_inventory(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<ClearInventoryResponse>, ApiError> {
    let username = session_username(&state, &headers).await?;
    let removed = state
        .inventory
        .clear(&username)
        .await
        .map_err(PracticeError::from)?;
    Ok(Json(ClearInventoryResponse { removed }))
}

async fn session_username(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let session = require_session(state, headers).await?;
    let username = session.lock().await.username().to_string();
    Ok(username)
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.len().await,
        reward_items: state.flow.catalog().len(),
    })
}
