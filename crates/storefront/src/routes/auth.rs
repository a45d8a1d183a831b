//! Admin auth route handlers.
//!
//! Login proxies the backend's token endpoint and stores the issued token
//! in the session; dashboard handlers read it from there. Logout revokes
//! the token on the backend and drops it from the session.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::models::session::AdminSession;
use crate::models::session_keys;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginView {
    pub username: String,
    pub is_staff: bool,
}

/// Log in as an admin.
///
/// Bad credentials or a non-staff account surface the backend's message
/// with its status.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginView>> {
    let login = state
        .api()
        .login(&request.username, &request.password)
        .await?;

    session
        .insert(session_keys::ADMIN, &AdminSession {
            token: login.token,
            username: login.username.clone(),
        })
        .await?;

    Ok(Json(LoginView {
        username: login.username,
        is_staff: login.is_staff,
    }))
}

/// Log out the current admin.
///
/// Best-effort token revocation; the session entry is removed regardless.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    if let Ok(Some(admin)) = session.get::<AdminSession>(session_keys::ADMIN).await
        && let Err(e) = state.api().logout(&admin.token).await
    {
        tracing::warn!(error = %e, "Backend token revocation failed");
    }

    session.remove::<AdminSession>(session_keys::ADMIN).await?;
    Ok(StatusCode::NO_CONTENT)
}
