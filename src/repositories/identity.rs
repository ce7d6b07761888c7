//! Identity repository for database operations
//!
//! Encapsulates SeaORM access to the global `identities` table. Identities are
//! not tenant scoped; tenant isolation is enforced through memberships.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;

use super::StoreError;
use crate::domain::{IdentityPatch, IdentitySeed, new_object_id};
use crate::models::identity::{self, Entity as Identity};

/// Repository for identity database operations
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl IdentityRepository {
    /// Creates a new IdentityRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a new identity or touches `updated_at` on the existing row for `email`.
    ///
    /// The write is a single `INSERT ... ON CONFLICT (email) DO UPDATE`, so two
    /// concurrent callers for the same email always end up with one row.
    pub async fn upsert_by_email(
        &self,
        email: &str,
        seed: &IdentitySeed,
    ) -> Result<identity::Model, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let candidate = identity::ActiveModel {
            id: Set(new_object_id()),
            email: Set(email.to_string()),
            phone: Set(seed.phone.clone()),
            avatar_url: Set(seed.avatar_url.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Identity::insert(candidate)
            .on_conflict(
                OnConflict::column(identity::Column::Email)
                    .update_column(identity::Column::UpdatedAt)
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("upsert_identity", format!("email={email}"), e))?;

        // Re-read by the unique key; the generated id is discarded on conflict
        self.find_by_email(email)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                operation: "upsert_identity",
                key: format!("email={email}"),
                reason: "row missing after upsert".to_string(),
            })
    }

    /// Finds an identity by exact email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<identity::Model>, StoreError> {
        Identity::find()
            .filter(identity::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("find_identity_by_email", format!("email={email}"), e))
    }

    /// Finds an identity by its ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<identity::Model>, StoreError> {
        Identity::find_by_id(id.to_string())
            .one(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("find_identity", format!("identity_id={id}"), e))
    }

    /// Applies the present patch fields and bumps `updated_at`
    pub async fn update(
        &self,
        id: &str,
        patch: &IdentityPatch,
    ) -> Result<Option<identity::Model>, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut update = Identity::update_many()
            .col_expr(identity::Column::UpdatedAt, Expr::value(now))
            .filter(identity::Column::Id.eq(id));

        if let Some(phone) = &patch.phone {
            update = update.col_expr(identity::Column::Phone, Expr::value(phone.clone()));
        }
        if let Some(avatar_url) = &patch.avatar_url {
            update = update.col_expr(identity::Column::AvatarUrl, Expr::value(avatar_url.clone()));
        }

        let result = update
            .exec(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("update_identity", format!("identity_id={id}"), e))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }
}
