use axum::{extract::Path, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::audit::{self, SecurityEventType};
use crate::auth::middleware::{AuthenticatedUser, ClientMeta};
use crate::error::AppError;
use crate::vault;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct StoreKeyRequest {
    pub service_name: String,
    pub api_key: String,
    pub key_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreKeyResponse {
    pub service_name: String,
    pub stored: bool,
}

#[derive(Debug, Serialize)]
pub struct TestKeyResponse {
    pub service_name: String,
    pub valid: bool,
    pub detail: String,
}

// --- Handlers ---

pub async fn store_key(
    user: AuthenticatedUser,
    client: ClientMeta,
    State(state): State<AppState>,
    Json(req): Json<StoreKeyRequest>,
) -> Result<Json<StoreKeyResponse>, AppError> {
    let result = vault::store(
        &state.db,
        &state.cipher,
        &user.user_id,
        &req.service_name,
        &req.api_key,
        req.key_label.clone(),
    )
    .await;

    audit::record(
        &state.db,
        &user.user_id,
        SecurityEventType::KeyStored,
        serde_json::json!({
            "service_name": req.service_name,
            "key_fingerprint": audit::fingerprint(&req.api_key),
            "outcome": if result.is_ok() { "success" } else { "failure" },
        }),
        &client,
    )
    .await;

    result?;

    // The key itself is never echoed back.
    Ok(Json(StoreKeyResponse {
        service_name: req.service_name,
        stored: true,
    }))
}

pub async fn list_keys(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<vault::EntrySummary>>, AppError> {
    let entries = vault::list(&state.db, &user.user_id).await?;
    Ok(Json(entries))
}

pub async fn delete_key(
    user: AuthenticatedUser,
    client: ClientMeta,
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = vault::delete(&state.db, &user.user_id, &service_name).await;

    audit::record(
        &state.db,
        &user.user_id,
        SecurityEventType::KeyDeleted,
        serde_json::json!({
            "service_name": service_name,
            "outcome": if result.is_ok() { "success" } else { "failure" },
        }),
        &client,
    )
    .await;

    result?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

pub async fn test_key(
    user: AuthenticatedUser,
    client: ClientMeta,
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Result<Json<TestKeyResponse>, AppError> {
    let result = vault::test(
        &state.db,
        &state.cipher,
        &state.http,
        &user.user_id,
        &service_name,
    )
    .await;

    audit::record(
        &state.db,
        &user.user_id,
        SecurityEventType::KeyTested,
        serde_json::json!({
            "service_name": service_name,
            "outcome": match &result {
                Ok(o) if o.valid => "valid",
                Ok(_) => "invalid",
                Err(_) => "failure",
            },
        }),
        &client,
    )
    .await;

    let outcome = result?;
    Ok(Json(TestKeyResponse {
        service_name,
        valid: outcome.valid,
        detail: outcome.detail,
    }))
}
