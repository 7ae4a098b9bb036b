//! Session lookup from the Authorization header

use crate::server::AppState;
use crate::sessions::SessionHandle;
use axum::http::HeaderMap;
use practice_common::PracticeError;
use uuid::Uuid;

/// Extract the session token from the Authorization header.
///
/// Supports "Authorization: Bearer <token>" and a bare token.
pub fn extract_session_token(headers: &HeaderMap) -> Option<Uuid> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
    Uuid::parse_str(token).ok()
}

/// The caller's live session, or `NotLoggedIn`
pub async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SessionHandle, PracticeError> {
    let token = extract_session_token(headers).ok_or(PracticeError::NotLoggedIn)?;
    state
        .sessions
        .get(&token)
        .await
        .ok_or(PracticeError::NotLoggedIn)
}
