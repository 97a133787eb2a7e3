use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;

use crate::audit::{self, SecurityEventType};
use crate::auth::middleware::ClientMeta;
use crate::config::{Config, FALLBACK_ATS_CLIENT_ID};
use crate::error::AppError;
use crate::vendors::ats::{AtsApi, TokenGrant};

/// Redacted confirmation returned after a successful exchange. Raw tokens
/// stay server-side; the caller only learns that the connection exists.
#[derive(Debug, Serialize)]
pub struct ExchangeConfirmation {
    pub connected: bool,
    pub integration: String,
    pub api_domain: Option<String>,
    pub scope: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SweepOutcome {
    pub refreshed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Build the vendor consent URL. A missing client id degrades to the
/// published fallback so the user still reaches the consent screen; the
/// degradation is logged, not silent.
pub fn authorization_url(config: &Config) -> String {
    let client_id = match &config.ats_client_id {
        Some(id) => id.as_str(),
        None => {
            tracing::warn!(
                "ATS_CLIENT_ID not configured; falling back to the published default client id"
            );
            FALLBACK_ATS_CLIENT_ID
        }
    };

    let url = reqwest::Url::parse_with_params(
        &format!("{}/oauth/v2/auth", config.ats_accounts_base.trim_end_matches('/')),
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("scope", config.ats_scopes.as_str()),
            ("redirect_uri", config.ats_redirect_uri.as_str()),
            ("access_type", "offline"),
        ],
    )
    .expect("static authorize URL is always parseable");

    url.to_string()
}

/// Exchange an authorization code and persist the grant, all-or-nothing.
/// Replaces any prior grant for the same (user, integration) atomically so
/// the at-most-one-row invariant holds across reconnects.
pub async fn exchange_code(
    db: &DatabaseConnection,
    ats: &dyn AtsApi,
    config: &Config,
    user_id: &str,
    code: &str,
) -> Result<ExchangeConfirmation, AppError> {
    let grant = ats.exchange_code(code, &config.ats_redirect_uri).await?;
    let integration = ats.integration_id().to_string();

    store_grant(db, user_id, &integration, &grant).await?;

    Ok(ExchangeConfirmation {
        connected: true,
        integration,
        api_domain: grant.api_domain,
        scope: grant.scope,
    })
}

async fn store_grant(
    db: &DatabaseConnection,
    user_id: &str,
    integration: &str,
    grant: &TokenGrant,
) -> Result<(), AppError> {
    let now = Utc::now();
    let expires_at = (now + Duration::seconds(grant.expires_in)).naive_utc();

    let txn = db.begin().await?;

    entity::stored_token::Entity::delete_many()
        .filter(entity::stored_token::Column::UserId.eq(user_id))
        .filter(entity::stored_token::Column::Integration.eq(integration))
        .exec(&txn)
        .await?;

    let model = entity::stored_token::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        integration: Set(integration.to_string()),
        access_token: Set(grant.access_token.clone()),
        refresh_token: Set(grant.refresh_token.clone()),
        expires_at: Set(expires_at),
        api_domain: Set(grant.api_domain.clone()),
        accounts_server: Set(grant.accounts_server.clone()),
        scope: Set(grant.scope.clone()),
        created_at: Set(now.naive_utc()),
        updated_at: Set(now.naive_utc()),
    };
    model.insert(&txn).await?;

    txn.commit().await?;
    Ok(())
}

pub async fn find_token(
    db: &DatabaseConnection,
    user_id: &str,
    integration: &str,
) -> Result<Option<entity::stored_token::Model>, AppError> {
    let token = entity::stored_token::Entity::find()
        .filter(entity::stored_token::Column::UserId.eq(user_id))
        .filter(entity::stored_token::Column::Integration.eq(integration))
        .one(db)
        .await?;
    Ok(token)
}

/// "Has the user ever connected" — row existence only. Freshness is the API
/// gateway's concern at call time, not this check's.
pub async fn is_connected(
    db: &DatabaseConnection,
    user_id: &str,
    integration: &str,
) -> Result<bool, AppError> {
    Ok(find_token(db, user_id, integration).await?.is_some())
}

/// Delete the grant. Idempotent: disconnecting twice is a no-op.
pub async fn disconnect(
    db: &DatabaseConnection,
    user_id: &str,
    integration: &str,
) -> Result<(), AppError> {
    entity::stored_token::Entity::delete_many()
        .filter(entity::stored_token::Column::UserId.eq(user_id))
        .filter(entity::stored_token::Column::Integration.eq(integration))
        .exec(db)
        .await?;
    Ok(())
}

/// Scheduler-driven sweep: refresh every grant within the configured window
/// of expiry. Per-token failures are counted and logged, never fatal — one
/// user's revoked consent must not stall everyone else's refresh.
pub async fn refresh_expiring(
    db: &DatabaseConnection,
    ats: &dyn AtsApi,
    config: &Config,
) -> Result<SweepOutcome, AppError> {
    let cutoff =
        (Utc::now() + Duration::seconds(config.token_refresh_window_secs)).naive_utc();

    let tokens = entity::stored_token::Entity::find()
        .filter(entity::stored_token::Column::Integration.eq(ats.integration_id()))
        .all(db)
        .await?;

    let mut outcome = SweepOutcome::default();
    // Scheduler-originated: there is no client request to attribute.
    let client = ClientMeta::default();

    for token in tokens {
        if token.expires_at > cutoff {
            outcome.skipped += 1;
            continue;
        }

        let user_id = token.user_id.clone();
        let integration = token.integration.clone();

        let refreshed = match ats.refresh_grant(&token.refresh_token).await {
            Ok(grant) => {
                let now = Utc::now();
                let mut active: entity::stored_token::ActiveModel = token.into();
                active.access_token = Set(grant.access_token);
                active.expires_at =
                    Set((now + Duration::seconds(grant.expires_in)).naive_utc());
                // Vendors that rotate refresh tokens send a new one; keep the
                // old one when they don't.
                if !grant.refresh_token.is_empty() {
                    active.refresh_token = Set(grant.refresh_token);
                }
                active.updated_at = Set(now.naive_utc());
                match active.update(db).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!(user_id = %user_id, "Failed to persist refreshed token: {e}");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Token refresh failed: {e}");
                false
            }
        };

        if refreshed {
            outcome.refreshed += 1;
        } else {
            outcome.failed += 1;
        }

        audit::record(
            db,
            &user_id,
            SecurityEventType::TokenRefresh,
            serde_json::json!({
                "integration": integration,
                "outcome": if refreshed { "success" } else { "failure" },
            }),
            &client,
        )
        .await;
    }

    Ok(outcome)
}
