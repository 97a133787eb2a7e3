use axum::{extract::State, Json};

use crate::audit::{self, SecurityEventType};
use crate::auth::middleware::{AuthenticatedUser, ClientMeta};
use crate::error::AppError;
use crate::proxy::{self, ForwardRequest, ForwardResponse};
use crate::AppState;

/// The one choke point for secondary-CRM traffic. Audit first, then forward,
/// so the log records attempts that never reached the vendor.
pub async fn forward(
    user: AuthenticatedUser,
    client: ClientMeta,
    State(state): State<AppState>,
    Json(req): Json<ForwardRequest>,
) -> Result<Json<ForwardResponse>, AppError> {
    audit::record(
        &state.db,
        &user.user_id,
        SecurityEventType::ApiRequest,
        serde_json::json!({
            "service_name": req.service_name,
            "endpoint": proxy::audit_endpoint(&req.endpoint),
            "method": req.method,
        }),
        &client,
    )
    .await;

    let resp = proxy::forward(
        &state.db,
        &state.cipher,
        &state.http,
        &user.user_id,
        &client,
        &req,
    )
    .await?;
    Ok(Json(resp))
}
