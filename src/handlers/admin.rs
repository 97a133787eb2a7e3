use axum::extract::{Query, State};
use axum::Json;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::auth::middleware::AdminAuth;
use crate::error::AppError;
use crate::oauth;
use crate::sync::{STATE_FAILED, STATE_SYNCED, STATE_UNSYNCED};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct EventPageQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SecurityEventResponse {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    pub event_details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct EventPageResponse {
    pub events: Vec<SecurityEventResponse>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connected_tokens: u64,
    pub vault_entries: u64,
    pub security_events: u64,
    pub jobs_unsynced: u64,
    pub jobs_synced: u64,
    pub jobs_failed: u64,
}

// --- Handlers ---

pub async fn list_security_events(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Query(page): Query<EventPageQuery>,
) -> Result<Json<EventPageResponse>, AppError> {
    let limit = page.limit.unwrap_or(50).min(200);
    let offset = page.offset.unwrap_or(0);

    let events = audit::list(&state.db, limit, offset).await?;
    let total = audit::count(&state.db).await?;

    Ok(Json(EventPageResponse {
        events: events
            .into_iter()
            .map(|e| SecurityEventResponse {
                id: e.id,
                user_id: e.user_id,
                event_type: e.event_type,
                event_details: serde_json::from_str(&e.event_details)
                    .unwrap_or(serde_json::Value::Null),
                ip_address: e.ip_address,
                user_agent: e.user_agent,
                created_at: e.created_at.to_string(),
            })
            .collect(),
        total,
    }))
}

pub async fn stats(
    _admin: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let connected_tokens = entity::stored_token::Entity::find().count(&state.db).await?;
    let vault_entries = entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::IsActive.eq(true))
        .count(&state.db)
        .await?;
    let security_events = audit::count(&state.db).await?;

    let jobs_by = |sync_state: &'static str| {
        entity::job::Entity::find()
            .filter(entity::job::Column::SyncState.eq(sync_state))
            .count(&state.db)
    };

    Ok(Json(StatsResponse {
        connected_tokens,
        vault_entries,
        security_events,
        jobs_unsynced: jobs_by(STATE_UNSYNCED).await?,
        jobs_synced: jobs_by(STATE_SYNCED).await?,
        jobs_failed: jobs_by(STATE_FAILED).await?,
    }))
}

/// External-scheduler entry point for the expiry-triggered refresh sweep.
pub async fn refresh_sweep(
    _admin: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<oauth::SweepOutcome>, AppError> {
    let outcome = oauth::refresh_expiring(&state.db, state.ats.as_ref(), &state.config).await?;

    tracing::info!(
        refreshed = outcome.refreshed,
        failed = outcome.failed,
        skipped = outcome.skipped,
        "Token refresh sweep complete"
    );

    Ok(Json(outcome))
}
