use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::users::queries::get_user_by_id;

/// Header carrying the signed-in user's id.
pub const SESSION_HEADER: &str = "x-user-id";

/// Reads the session id from the request headers. `Ok(None)` when no session
/// header was sent.
pub fn session_user_id(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid session".to_string()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(raw.trim())
        .map(Some)
        .map_err(|_| AppError::Unauthorized("Invalid session".to_string()))
}

async fn load_session_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    get_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session is no longer valid".to_string()))
}

/// The signed-in user, reloaded from the database on every request.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = session_user_id(&parts.headers)?
            .ok_or_else(|| AppError::Unauthorized("Please sign in".to_string()))?;
        Ok(CurrentUser(load_session_user(state, id).await?))
    }
}

/// Like `CurrentUser` but tolerates a missing session.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_user_id(&parts.headers)? {
            Some(id) => Ok(MaybeUser(get_user_by_id(&state.db, id).await?)),
            None => Ok(MaybeUser(None)),
        }
    }
}

// ──────────────────────────────────────────────────────────────
// Role checks
// ──────────────────────────────────────────────────────────────

fn ensure_active(user: &User) -> Result<(), AppError> {
    if !user.is_active {
        return Err(AppError::Forbidden(
            "Your account has been deactivated. Please contact support.".to_string(),
        ));
    }
    Ok(())
}

pub fn require_contributor(user: &User) -> Result<(), AppError> {
    ensure_active(user)?;
    if user.role != Role::Contributor {
        return Err(AppError::Forbidden(
            "Only contributors can record sentences".to_string(),
        ));
    }
    Ok(())
}

/// Approved reviewers only. Pending and rejected reviewers are refused.
pub fn require_reviewer(user: &User) -> Result<(), AppError> {
    ensure_active(user)?;
    if !user.is_approved_reviewer() {
        return Err(AppError::Forbidden(
            "Only approved reviewers can review recordings".to_string(),
        ));
    }
    Ok(())
}

pub fn require_reviewer_or_admin(user: &User) -> Result<(), AppError> {
    if user.role == Role::Admin {
        return ensure_active(user);
    }
    require_reviewer(user)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    ensure_active(user)?;
    if user.role != Role::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}
