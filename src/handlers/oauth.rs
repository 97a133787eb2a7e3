use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::audit::{self, SecurityEventType};
use crate::auth::middleware::{AuthenticatedUser, ClientMeta};
use crate::error::AppError;
use crate::oauth;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Serialize)]
pub struct AuthorizeUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub integration: String,
}

// --- Handlers ---

pub async fn authorize_url(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<AuthorizeUrlResponse>, AppError> {
    Ok(Json(AuthorizeUrlResponse {
        url: oauth::authorization_url(&state.config),
    }))
}

pub async fn exchange(
    user: AuthenticatedUser,
    client: ClientMeta,
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<oauth::ExchangeConfirmation>, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("code must not be empty".to_string()));
    }

    let result = oauth::exchange_code(
        &state.db,
        state.ats.as_ref(),
        &state.config,
        &user.user_id,
        &req.code,
    )
    .await;

    // Audited whether the vendor accepted the code or not.
    audit::record(
        &state.db,
        &user.user_id,
        SecurityEventType::OauthExchange,
        serde_json::json!({
            "integration": state.ats.integration_id(),
            "outcome": if result.is_ok() { "success" } else { "failure" },
        }),
        &client,
    )
    .await;

    result.map(Json)
}

pub async fn status(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, AppError> {
    let connected =
        oauth::is_connected(&state.db, &user.user_id, state.ats.integration_id()).await?;
    Ok(Json(StatusResponse {
        connected,
        integration: state.ats.integration_id().to_string(),
    }))
}

pub async fn disconnect(
    user: AuthenticatedUser,
    client: ClientMeta,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = oauth::disconnect(&state.db, &user.user_id, state.ats.integration_id()).await;

    // Audited whether the delete went through or not.
    audit::record(
        &state.db,
        &user.user_id,
        SecurityEventType::OauthDisconnect,
        serde_json::json!({
            "integration": state.ats.integration_id(),
            "outcome": if result.is_ok() { "success" } else { "failure" },
        }),
        &client,
    )
    .await;

    result?;
    Ok(Json(serde_json::json!({ "status": "disconnected" })))
}
