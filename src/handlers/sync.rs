use axum::{extract::Path, extract::State, Json};

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::sync::{self, EntityKind, SyncOutcome};
use crate::AppState;

pub async fn run(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> Result<Json<SyncOutcome>, AppError> {
    let kind = EntityKind::parse(&entity_type)?;
    let outcome = sync::bidirectional(&state.db, state.ats.clone(), &user.user_id, kind).await?;

    tracing::info!(
        entity = entity_type,
        pushed = outcome.local_to_remote,
        pulled = outcome.remote_to_local,
        failed = outcome.failed,
        "Sync batch complete"
    );

    Ok(Json(outcome))
}
