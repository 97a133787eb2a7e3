use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One encrypted API key per (user, named service).
///
/// `encrypted_key` is base64(nonce || AES-256-GCM ciphertext). Deleting a key
/// flips `is_active` instead of removing the row so the audit trail keeps a
/// referent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vault_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub service_name: String,
    pub encrypted_key: String,
    pub key_label: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
