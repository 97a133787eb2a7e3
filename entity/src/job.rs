use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Local job record, optionally bound to a remote ATS record.
///
/// `external_id` is the reconciliation key: NULL means the row has never been
/// pushed; a non-NULL value is unique per `external_system`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: String,
    pub external_system: Option<String>,
    pub external_id: Option<String>,
    pub sync_state: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
