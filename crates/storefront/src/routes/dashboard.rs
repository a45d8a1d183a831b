//! Dashboard route handlers (admin only).
//!
//! Pure data-fetch proxies over the backend analytics endpoints. The admin
//! token from the session is forwarded on every call; the backend is the
//! authority on whether it is still valid.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::types::{DashboardStats, Order};
use crate::error::{AppError, Result};
use crate::models::session::AdminSession;
use crate::models::session_keys;
use crate::state::AppState;

/// Get the logged-in admin from the session.
async fn require_admin(session: &Session) -> Result<AdminSession> {
    session
        .get::<AdminSession>(session_keys::ADMIN)
        .await
        .ok()
        .flatten()
        .ok_or_else(|| AppError::Unauthorized("admin login required".to_string()))
}

/// Get dashboard statistics.
#[instrument(skip(state, session))]
pub async fn stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<DashboardStats>> {
    let admin = require_admin(&session).await?;
    Ok(Json(state.api().dashboard_stats(&admin.token).await?))
}

/// Get the most recent orders.
#[instrument(skip(state, session))]
pub async fn recent_orders(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Order>>> {
    let admin = require_admin(&session).await?;
    Ok(Json(state.api().recent_orders(&admin.token).await?))
}
