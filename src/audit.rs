use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set};
use sha2::{Digest, Sha256};

use crate::auth::middleware::ClientMeta;
use crate::error::AppError;

/// Closed set of identity-sensitive operations worth an audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventType {
    KeyStored,
    KeyRetrieved,
    KeyDeleted,
    KeyTested,
    ApiRequest,
    OauthExchange,
    OauthDisconnect,
    TokenRefresh,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::KeyStored => "key_stored",
            SecurityEventType::KeyRetrieved => "key_retrieved",
            SecurityEventType::KeyDeleted => "key_deleted",
            SecurityEventType::KeyTested => "key_tested",
            SecurityEventType::ApiRequest => "api_request",
            SecurityEventType::OauthExchange => "oauth_exchange",
            SecurityEventType::OauthDisconnect => "oauth_disconnect",
            SecurityEventType::TokenRefresh => "token_refresh",
        }
    }
}

/// Append one security event. Called on both success and failure paths so the
/// trail stays complete; if the insert itself fails we log and move on rather
/// than masking the caller's own result.
pub async fn record(
    db: &DatabaseConnection,
    user_id: &str,
    event_type: SecurityEventType,
    details: serde_json::Value,
    client: &ClientMeta,
) {
    let now = chrono::Utc::now().naive_utc();
    let model = entity::security_event::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        event_type: Set(event_type.as_str().to_string()),
        event_details: Set(details.to_string()),
        ip_address: Set(client.ip_address.clone()),
        user_agent: Set(client.user_agent.clone()),
        created_at: Set(now),
    };

    if let Err(e) = model.insert(db).await {
        tracing::error!(
            event_type = event_type.as_str(),
            "Failed to append security event: {e}"
        );
    }
}

/// Newest-first page of events for the admin dashboard.
pub async fn list(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
) -> Result<Vec<entity::security_event::Model>, AppError> {
    let events = entity::security_event::Entity::find()
        .order_by_desc(entity::security_event::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;
    Ok(events)
}

pub async fn count(db: &DatabaseConnection) -> Result<u64, AppError> {
    Ok(entity::security_event::Entity::find().count(db).await?)
}

/// SHA-256 fingerprint of a secret: safe to put in audit details, useless to
/// an attacker reading the log.
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}
