//! Identity entity model
//!
//! SeaORM entity for the `identities` table: one global record per email,
//! shared by every tenant the person belongs to.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    /// 24-character hex identifier, assigned on first insert
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Globally unique email (exact-string equality)
    #[sea_orm(unique)]
    pub email: String,

    pub phone: Option<String>,

    pub avatar_url: Option<String>,

    /// Global activation flag
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
