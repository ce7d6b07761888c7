//! # Repository Layer
//!
//! SeaORM repositories for the `identities` and `memberships` tables and the
//! [`UserStore`] abstraction the association service is written against.
//! Every membership query is scoped by the caller-supplied tenant id.

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

use crate::domain::{
    Identity, IdentityPatch, IdentitySeed, Membership, MembershipPatch, NewMembership, Profile,
    ProfilePage,
};
use crate::validation::Pagination;

pub mod identity;
pub mod membership;
pub mod store;

pub use identity::IdentityRepository;
pub use membership::MembershipRepository;
pub use store::SeaOrmUserStore;

/// Storage failure with the operation and key it happened on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation}: duplicate key for {key}")]
    DuplicateKey { operation: &'static str, key: String },
    #[error("{operation} failed for {key}: {source}")]
    Database {
        operation: &'static str,
        key: String,
        #[source]
        source: DbErr,
    },
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },
    #[error("{operation}: corrupt record {key}: {reason}")]
    Corrupt {
        operation: &'static str,
        key: String,
        reason: String,
    },
}

impl StoreError {
    /// Classifies a database error, turning unique violations into `DuplicateKey`.
    pub fn from_db(operation: &'static str, key: impl Into<String>, source: DbErr) -> Self {
        let key = key.into();
        if is_unique_violation(&source) {
            tracing::debug!(operation, key = %key, error = ?source, "Unique constraint violation detected");
            return Self::DuplicateKey { operation, key };
        }
        Self::Database {
            operation,
            key,
            source,
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Returns true when the error is a unique-constraint violation on Postgres or SQLite.
pub fn is_unique_violation(error: &DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code()
        && (code.as_ref() == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code.as_ref()))
    {
        return true;
    }

    false
}

/// Persistence operations needed by the association service.
///
/// Implementations must scope every membership access by `tenant_id` and
/// must make `upsert_identity_by_email` a single atomic write.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts an identity for `email` or returns the existing one with `updated_at` touched.
    async fn upsert_identity_by_email(
        &self,
        email: &str,
        seed: &IdentitySeed,
    ) -> Result<Identity, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] when the (identity, tenant) pair exists.
    async fn insert_membership(&self, new: &NewMembership) -> Result<Membership, StoreError>;

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Finds the membership for the pair regardless of its activation state.
    async fn find_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Membership>, StoreError>;

    /// Returns the profile only when both rows exist and the membership is active.
    async fn find_identity_and_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Profile>, StoreError>;

    async fn list_memberships(
        &self,
        tenant_id: &str,
        pagination: Pagination,
    ) -> Result<ProfilePage, StoreError>;

    async fn search_memberships(
        &self,
        tenant_id: &str,
        query: &str,
        pagination: Pagination,
    ) -> Result<ProfilePage, StoreError>;

    /// Writes the present patch fields; `None` when the identity does not exist.
    async fn update_identity(
        &self,
        identity_id: &str,
        patch: &IdentityPatch,
    ) -> Result<Option<Identity>, StoreError>;

    /// Writes the present patch fields; `None` when the membership does not exist.
    async fn update_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
        patch: &MembershipPatch,
    ) -> Result<Option<Membership>, StoreError>;

    /// Soft-deletes the membership. Returns false when no row matched.
    async fn deactivate_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<bool, StoreError>;
}
