//! Membership entity model
//!
//! SeaORM entity for the `memberships` table, which binds one identity to one
//! tenant. Roles are stored as a JSON array of strings.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

use super::identity::Entity as Identity;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "memberships")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Identity this membership refers to (unique together with tenant_id)
    pub identity_id: String,

    /// Tenant namespace; every query on this table filters on it
    pub tenant_id: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub roles: JsonValue,

    pub first_name: String,

    pub last_name: String,

    /// Lowercased `first_name`, matched by name search
    pub first_name_search: String,

    pub last_name_search: String,

    /// Tenant-local activation; `false` means soft-deleted
    pub is_active: bool,

    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Identity",
        from = "Column::IdentityId",
        to = "super::identity::Column::Id"
    )]
    Identity,
}

impl Related<Identity> for Entity {
    fn to() -> RelationDef {
        Relation::Identity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
