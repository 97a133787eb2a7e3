use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use crate::error::AppError;
use crate::oauth;
use crate::vendors::ats::{AtsApi, CandidateDraft, JobDraft};

pub const STATE_UNSYNCED: &str = "unsynced";
pub const STATE_SYNCED: &str = "synced";
pub const STATE_FAILED: &str = "sync_failed";

/// Concurrent vendor calls in flight per batch. Modest on purpose: most ATS
/// plans rate-limit aggressively.
const MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Jobs,
    Candidates,
}

impl EntityKind {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "jobs" => Ok(EntityKind::Jobs),
            "candidates" => Ok(EntityKind::Candidates),
            other => Err(AppError::BadRequest(format!(
                "unknown entity type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SyncOutcome {
    pub local_to_remote: u64,
    pub remote_to_local: u64,
    pub failed: u64,
}

/// Shared back-off gate for one vendor within one batch. A 429 parks every
/// worker until the advertised retry-after has elapsed; the batch itself is
/// never aborted.
#[derive(Clone)]
struct RateGate {
    resume_at: Arc<Mutex<Option<Instant>>>,
}

impl RateGate {
    fn new() -> Self {
        Self {
            resume_at: Arc::new(Mutex::new(None)),
        }
    }

    async fn wait_ready(&self) {
        let deadline = { *self.resume_at.lock().await };
        if let Some(deadline) = deadline {
            tokio::time::sleep_until(deadline).await;
        }
    }

    async fn suspend_for(&self, wait: Duration) {
        let mut resume_at = self.resume_at.lock().await;
        let candidate = Instant::now() + wait;
        if resume_at.map_or(true, |r| candidate > r) {
            *resume_at = Some(candidate);
        }
    }
}

enum PushResult {
    Pushed,
    Failed,
}

/// Push then pull for one entity type. Requires a connected token.
pub async fn bidirectional(
    db: &DatabaseConnection,
    ats: Arc<dyn AtsApi>,
    user_id: &str,
    kind: EntityKind,
) -> Result<SyncOutcome, AppError> {
    let token = oauth::find_token(db, user_id, ats.integration_id())
        .await?
        .ok_or(AppError::NotConnected)?;

    let (pushed, push_failed) = match kind {
        EntityKind::Jobs => push_jobs(db, ats.clone(), &token.access_token, user_id).await?,
        EntityKind::Candidates => {
            push_candidates(db, ats.clone(), &token.access_token, user_id).await?
        }
    };

    let pulled = match kind {
        EntityKind::Jobs => pull_jobs(db, ats.as_ref(), &token.access_token, user_id).await?,
        EntityKind::Candidates => {
            pull_candidates(db, ats.as_ref(), &token.access_token, user_id).await?
        }
    };

    Ok(SyncOutcome {
        local_to_remote: pushed,
        remote_to_local: pulled,
        failed: push_failed,
    })
}

/// Create one remote record, honoring the shared rate gate. A 429 suspends
/// the gate and the record is retried once after the back-off.
async fn dispatch_create<F, Fut>(gate: &RateGate, create: F) -> Result<String, AppError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<String, AppError>>,
{
    gate.wait_ready().await;
    match create().await {
        Err(AppError::RateLimited { retry_after_secs }) => {
            gate.suspend_for(Duration::from_secs(retry_after_secs)).await;
            gate.wait_ready().await;
            create().await
        }
        other => other,
    }
}

pub async fn push_jobs(
    db: &DatabaseConnection,
    ats: Arc<dyn AtsApi>,
    access_token: &str,
    user_id: &str,
) -> Result<(u64, u64), AppError> {
    let unsynced = entity::job::Entity::find()
        .filter(entity::job::Column::UserId.eq(user_id))
        .filter(entity::job::Column::ExternalId.is_null())
        .all(db)
        .await?;

    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let gate = RateGate::new();
    let mut handles = Vec::with_capacity(unsynced.len());

    for job in unsynced {
        let semaphore = semaphore.clone();
        let gate = gate.clone();
        let ats = ats.clone();
        let db = db.clone();
        let access_token = access_token.to_string();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("push semaphore closed");

            let draft = JobDraft {
                title: job.title.clone(),
                status: job.status.clone(),
            };
            let integration = ats.integration_id().to_string();
            let result =
                dispatch_create(&gate, || ats.create_job(&access_token, &draft)).await;

            commit_job_result(&db, job, &integration, result).await
        }));
    }

    collect_push_results(handles).await
}

pub async fn push_candidates(
    db: &DatabaseConnection,
    ats: Arc<dyn AtsApi>,
    access_token: &str,
    user_id: &str,
) -> Result<(u64, u64), AppError> {
    let unsynced = entity::candidate::Entity::find()
        .filter(entity::candidate::Column::UserId.eq(user_id))
        .filter(entity::candidate::Column::ExternalId.is_null())
        .all(db)
        .await?;

    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let gate = RateGate::new();
    let mut handles = Vec::with_capacity(unsynced.len());

    for candidate in unsynced {
        let semaphore = semaphore.clone();
        let gate = gate.clone();
        let ats = ats.clone();
        let db = db.clone();
        let access_token = access_token.to_string();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("push semaphore closed");

            let draft = CandidateDraft {
                name: candidate.name.clone(),
                email: candidate.email.clone(),
                phone: candidate.phone.clone(),
            };
            let integration = ats.integration_id().to_string();
            let result =
                dispatch_create(&gate, || ats.create_candidate(&access_token, &draft)).await;

            commit_candidate_result(&db, candidate, &integration, result).await
        }));
    }

    collect_push_results(handles).await
}

/// Each record's transition commits individually: one failure never rolls
/// back or blocks its batch siblings.
async fn commit_job_result(
    db: &DatabaseConnection,
    job: entity::job::Model,
    integration: &str,
    result: Result<String, AppError>,
) -> PushResult {
    let now = Utc::now().naive_utc();
    match result {
        Ok(remote_id) => {
            let mut active: entity::job::ActiveModel = job.into();
            active.external_system = Set(Some(integration.to_string()));
            active.external_id = Set(Some(remote_id));
            active.sync_state = Set(STATE_SYNCED.to_string());
            active.updated_at = Set(now);
            match active.update(db).await {
                Ok(_) => PushResult::Pushed,
                Err(e) => {
                    tracing::error!("Failed to commit pushed job binding: {e}");
                    PushResult::Failed
                }
            }
        }
        Err(e) => {
            tracing::warn!(job_id = %job.id, "Job push failed: {e}");
            let mut active: entity::job::ActiveModel = job.into();
            active.sync_state = Set(STATE_FAILED.to_string());
            active.updated_at = Set(now);
            if let Err(e) = active.update(db).await {
                tracing::error!("Failed to record job sync failure: {e}");
            }
            PushResult::Failed
        }
    }
}

async fn commit_candidate_result(
    db: &DatabaseConnection,
    candidate: entity::candidate::Model,
    integration: &str,
    result: Result<String, AppError>,
) -> PushResult {
    let now = Utc::now().naive_utc();
    match result {
        Ok(remote_id) => {
            let mut active: entity::candidate::ActiveModel = candidate.into();
            active.external_system = Set(Some(integration.to_string()));
            active.external_id = Set(Some(remote_id));
            active.sync_state = Set(STATE_SYNCED.to_string());
            active.updated_at = Set(now);
            match active.update(db).await {
                Ok(_) => PushResult::Pushed,
                Err(e) => {
                    tracing::error!("Failed to commit pushed candidate binding: {e}");
                    PushResult::Failed
                }
            }
        }
        Err(e) => {
            tracing::warn!(candidate_id = %candidate.id, "Candidate push failed: {e}");
            let mut active: entity::candidate::ActiveModel = candidate.into();
            active.sync_state = Set(STATE_FAILED.to_string());
            active.updated_at = Set(now);
            if let Err(e) = active.update(db).await {
                tracing::error!("Failed to record candidate sync failure: {e}");
            }
            PushResult::Failed
        }
    }
}

async fn collect_push_results(
    handles: Vec<tokio::task::JoinHandle<PushResult>>,
) -> Result<(u64, u64), AppError> {
    let mut pushed = 0;
    let mut failed = 0;
    for handle in handles {
        match handle.await {
            Ok(PushResult::Pushed) => pushed += 1,
            Ok(PushResult::Failed) => failed += 1,
            Err(e) => {
                tracing::error!("Push worker panicked: {e}");
                failed += 1;
            }
        }
    }
    Ok((pushed, failed))
}

/// Import remote jobs that have no local binding yet. Re-running against an
/// unchanged remote dataset inserts nothing.
pub async fn pull_jobs(
    db: &DatabaseConnection,
    ats: &dyn AtsApi,
    access_token: &str,
    user_id: &str,
) -> Result<u64, AppError> {
    let remote = ats.list_jobs(access_token).await?;
    let integration = ats.integration_id();
    let now = Utc::now().naive_utc();
    let mut pulled = 0;

    for job in remote {
        let exists = entity::job::Entity::find()
            .filter(entity::job::Column::ExternalSystem.eq(integration))
            .filter(entity::job::Column::ExternalId.eq(job.id.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let model = entity::job::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(job.title),
            status: Set(job.status),
            external_system: Set(Some(integration.to_string())),
            external_id: Set(Some(job.id)),
            sync_state: Set(STATE_SYNCED.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(db).await?;
        pulled += 1;
    }

    Ok(pulled)
}

pub async fn pull_candidates(
    db: &DatabaseConnection,
    ats: &dyn AtsApi,
    access_token: &str,
    user_id: &str,
) -> Result<u64, AppError> {
    let remote = ats.list_candidates(access_token).await?;
    let integration = ats.integration_id();
    let now = Utc::now().naive_utc();
    let mut pulled = 0;

    for candidate in remote {
        let exists = entity::candidate::Entity::find()
            .filter(entity::candidate::Column::ExternalSystem.eq(integration))
            .filter(entity::candidate::Column::ExternalId.eq(candidate.id.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let model = entity::candidate::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            name: Set(candidate.name),
            email: Set(candidate.email),
            phone: Set(candidate.phone),
            external_system: Set(Some(integration.to_string())),
            external_id: Set(Some(candidate.id)),
            sync_state: Set(STATE_SYNCED.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(db).await?;
        pulled += 1;
    }

    Ok(pulled)
}
