use axum::{extract::State, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::oauth;
use crate::sync::STATE_UNSYNCED;
use crate::vendors::demo;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCandidateRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoteListingResponse {
    /// "live" or "demo" — the UI labels demo data prominently.
    pub source: &'static str,
    pub jobs: Vec<serde_json::Value>,
}

// --- Handlers ---

pub async fn list_jobs(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<entity::job::Model>>, AppError> {
    let jobs = entity::job::Entity::find()
        .filter(entity::job::Column::UserId.eq(user.user_id.as_str()))
        .order_by_asc(entity::job::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(jobs))
}

pub async fn create_job(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<entity::job::Model>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }

    let now = chrono::Utc::now().naive_utc();
    let model = entity::job::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user.user_id),
        title: Set(req.title),
        status: Set(req.status.unwrap_or_else(|| "open".to_string())),
        external_system: Set(None),
        external_id: Set(None),
        sync_state: Set(STATE_UNSYNCED.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let job = model.insert(&state.db).await?;
    Ok(Json(job))
}

pub async fn create_candidate(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCandidateRequest>,
) -> Result<Json<entity::candidate::Model>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }

    let now = chrono::Utc::now().naive_utc();
    let model = entity::candidate::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user.user_id),
        name: Set(req.name),
        email: Set(req.email),
        phone: Set(req.phone),
        external_system: Set(None),
        external_id: Set(None),
        sync_state: Set(STATE_UNSYNCED.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let candidate = model.insert(&state.db).await?;
    Ok(Json(candidate))
}

/// Live ATS job listing with the degraded-mode fallback: when the vendor is
/// unreachable the caller gets the fixed demo dataset, clearly labeled.
/// Write paths never take this branch.
pub async fn list_remote_jobs(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<RemoteListingResponse>, AppError> {
    let token = oauth::find_token(&state.db, &user.user_id, state.ats.integration_id())
        .await?
        .ok_or(AppError::NotConnected)?;

    match state.ats.list_jobs(&token.access_token).await {
        Ok(jobs) => Ok(Json(RemoteListingResponse {
            source: "live",
            jobs: jobs
                .into_iter()
                .map(|j| {
                    serde_json::json!({
                        "id": j.id,
                        "title": j.title,
                        "status": j.status,
                    })
                })
                .collect(),
        })),
        Err(AppError::HttpClient(e)) => {
            tracing::warn!("ATS unreachable, serving demo listing: {e}");
            Ok(Json(RemoteListingResponse {
                source: "demo",
                jobs: demo::demo_jobs(),
            }))
        }
        Err(AppError::UpstreamError { status, .. }) if status >= 500 => {
            tracing::warn!("ATS returned {status}, serving demo listing");
            Ok(Json(RemoteListingResponse {
                source: "demo",
                jobs: demo::demo_jobs(),
            }))
        }
        Err(e) => Err(e),
    }
}
