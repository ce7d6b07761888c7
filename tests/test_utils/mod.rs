//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations applied, wiring the store and service on top of them, and
//! a store wrapper that counts calls and can inject latency.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use user_service::domain::{
    Identity, IdentityPatch, IdentitySeed, Membership, MembershipPatch, NewMembership, Profile,
    ProfilePage,
};
use user_service::repositories::{SeaOrmUserStore, StoreError, UserStore};
use user_service::service::{CreateUserRequest, UserService};
use user_service::validation::Pagination;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up an in-memory SQLite database with all migrations applied and returns an Arc.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Store over a fresh database.
pub async fn setup_store() -> Result<SeaOrmUserStore> {
    Ok(SeaOrmUserStore::new(setup_test_db_arc().await?))
}

/// Service over a fresh database, returning the store it wraps for direct inspection.
pub async fn setup_service() -> Result<(UserService, Arc<CountingStore>)> {
    let store = Arc::new(CountingStore::new(setup_store().await?));
    let service = UserService::new(store.clone(), TEST_TIMEOUT);
    Ok((service, store))
}

/// Create-user request with names and no phone.
pub fn create_request(email: &str, tenant_id: &str, first: &str, last: &str) -> CreateUserRequest {
    CreateUserRequest {
        email: email.to_string(),
        tenant_id: tenant_id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        phone: String::new(),
    }
}

/// [`UserStore`] wrapper recording how often each operation ran.
pub struct CountingStore {
    inner: SeaOrmUserStore,
    calls: Mutex<HashMap<&'static str, usize>>,
    delay: Mutex<Option<Duration>>,
}

impl CountingStore {
    pub fn new(inner: SeaOrmUserStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &SeaOrmUserStore {
        &self.inner
    }

    /// Number of calls made to `operation` so far.
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    /// Total number of store calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Delays every subsequent call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn record(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn upsert_identity_by_email(
        &self,
        email: &str,
        seed: &IdentitySeed,
    ) -> Result<Identity, StoreError> {
        self.record("upsert_identity_by_email").await;
        self.inner.upsert_identity_by_email(email, seed).await
    }

    async fn insert_membership(&self, new: &NewMembership) -> Result<Membership, StoreError> {
        self.record("insert_membership").await;
        self.inner.insert_membership(new).await
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.record("find_identity_by_email").await;
        self.inner.find_identity_by_email(email).await
    }

    async fn find_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Membership>, StoreError> {
        self.record("find_membership").await;
        self.inner.find_membership(identity_id, tenant_id).await
    }

    async fn find_identity_and_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Profile>, StoreError> {
        self.record("find_identity_and_membership").await;
        self.inner
            .find_identity_and_membership(identity_id, tenant_id)
            .await
    }

    async fn list_memberships(
        &self,
        tenant_id: &str,
        pagination: Pagination,
    ) -> Result<ProfilePage, StoreError> {
        self.record("list_memberships").await;
        self.inner.list_memberships(tenant_id, pagination).await
    }

    async fn search_memberships(
        &self,
        tenant_id: &str,
        query: &str,
        pagination: Pagination,
    ) -> Result<ProfilePage, StoreError> {
        self.record("search_memberships").await;
        self.inner
            .search_memberships(tenant_id, query, pagination)
            .await
    }

    async fn update_identity(
        &self,
        identity_id: &str,
        patch: &IdentityPatch,
    ) -> Result<Option<Identity>, StoreError> {
        self.record("update_identity").await;
        self.inner.update_identity(identity_id, patch).await
    }

    async fn update_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
        patch: &MembershipPatch,
    ) -> Result<Option<Membership>, StoreError> {
        self.record("update_membership").await;
        self.inner
            .update_membership(identity_id, tenant_id, patch)
            .await
    }

    async fn deactivate_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<bool, StoreError> {
        self.record("deactivate_membership").await;
        self.inner
            .deactivate_membership(identity_id, tenant_id)
            .await
    }
}
