use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One OAuth token grant per (user, integration).
///
/// `access_token` and `refresh_token` are server-side only and must never be
/// serialized into an API response. Handlers return derived facts (connected,
/// api_domain, scope) instead of the row itself.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stored_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub integration: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: chrono::NaiveDateTime,
    pub api_domain: Option<String>,
    pub accounts_server: Option<String>,
    pub scope: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
