pub mod cipher;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;

use crate::error::AppError;
use crate::vendors::{CrmVendor, ProbeOutcome};
use cipher::KeyCipher;

/// What `list` exposes: metadata only, never key material.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    pub service_name: String,
    pub key_label: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Encrypt and upsert one key for (user, service). A second store for the
/// same service supersedes the first; a previously soft-deleted entry is
/// reactivated in place.
pub async fn store(
    db: &DatabaseConnection,
    key_cipher: &KeyCipher,
    user_id: &str,
    service_name: &str,
    api_key: &str,
    key_label: Option<String>,
) -> Result<(), AppError> {
    if api_key.trim().is_empty() {
        return Err(AppError::BadRequest("api_key must not be empty".to_string()));
    }
    // Only vendors the proxy can actually authenticate against are storable.
    CrmVendor::from_service(service_name)?;

    let encrypted_key = key_cipher.encrypt(api_key)?;
    let now = Utc::now().naive_utc();

    let existing = entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::UserId.eq(user_id))
        .filter(entity::vault_entry::Column::ServiceName.eq(service_name))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut active: entity::vault_entry::ActiveModel = row.into();
            active.encrypted_key = Set(encrypted_key);
            active.key_label = Set(key_label);
            active.is_active = Set(true);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            let model = entity::vault_entry::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                user_id: Set(user_id.to_string()),
                service_name: Set(service_name.to_string()),
                encrypted_key: Set(encrypted_key),
                key_label: Set(key_label),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            };
            model.insert(db).await?;
        }
    }

    Ok(())
}

/// Decrypt the active key for the owner. Server-side callers only — there is
/// no route that returns this to a browser.
pub async fn retrieve(
    db: &DatabaseConnection,
    key_cipher: &KeyCipher,
    user_id: &str,
    service_name: &str,
) -> Result<String, AppError> {
    let row = entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::UserId.eq(user_id))
        .filter(entity::vault_entry::Column::ServiceName.eq(service_name))
        .filter(entity::vault_entry::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::KeyNotFound(service_name.to_string()))?;

    key_cipher.decrypt(&row.encrypted_key)
}

/// Soft delete. Idempotent; deleting a missing or already-deleted entry is a
/// no-op so the UI can retry freely.
pub async fn delete(
    db: &DatabaseConnection,
    user_id: &str,
    service_name: &str,
) -> Result<(), AppError> {
    let row = entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::UserId.eq(user_id))
        .filter(entity::vault_entry::Column::ServiceName.eq(service_name))
        .filter(entity::vault_entry::Column::IsActive.eq(true))
        .one(db)
        .await?;

    if let Some(row) = row {
        let mut active: entity::vault_entry::ActiveModel = row.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(db).await?;
    }

    Ok(())
}

pub async fn list(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<EntrySummary>, AppError> {
    let rows = entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::UserId.eq(user_id))
        .filter(entity::vault_entry::Column::IsActive.eq(true))
        .order_by_asc(entity::vault_entry::Column::ServiceName)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| EntrySummary {
            service_name: r.service_name,
            key_label: r.key_label,
            created_at: r.created_at.to_string(),
            updated_at: r.updated_at.to_string(),
        })
        .collect())
}

/// Retrieve + vendor probe. The key never appears in the outcome.
pub async fn test(
    db: &DatabaseConnection,
    key_cipher: &KeyCipher,
    http: &reqwest::Client,
    user_id: &str,
    service_name: &str,
) -> Result<ProbeOutcome, AppError> {
    let vendor = CrmVendor::from_service(service_name)?;
    let api_key = retrieve(db, key_cipher, user_id, service_name).await?;
    vendor.probe(http, &api_key).await
}
