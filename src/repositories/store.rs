//! SeaORM-backed [`UserStore`].

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::membership::MembershipWithIdentity;
use super::{IdentityRepository, MembershipRepository, StoreError, UserStore};
use crate::domain::{
    Identity, IdentityPatch, IdentitySeed, Membership, MembershipPatch, NewMembership, Profile,
    ProfilePage,
};
use crate::models::membership;
use crate::validation::Pagination;

/// [`UserStore`] implementation over the identity and membership repositories
#[derive(Debug, Clone)]
pub struct SeaOrmUserStore {
    identities: IdentityRepository,
    memberships: MembershipRepository,
}

impl SeaOrmUserStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            identities: IdentityRepository::new(db.clone()),
            memberships: MembershipRepository::new(db),
        }
    }
}

fn to_membership(
    operation: &'static str,
    model: membership::Model,
) -> Result<Membership, StoreError> {
    let key = format!("membership_id={}", model.id);
    Membership::try_from(model).map_err(|e| StoreError::Corrupt {
        operation,
        key,
        reason: format!("roles: {e}"),
    })
}

/// Pairs joined rows into profiles, skipping memberships whose identity is gone
fn to_page(
    operation: &'static str,
    rows: Vec<MembershipWithIdentity>,
    total: u64,
) -> Result<ProfilePage, StoreError> {
    let mut profiles = Vec::with_capacity(rows.len());
    for (membership, identity) in rows {
        let Some(identity) = identity else {
            tracing::warn!(
                membership_id = %membership.id,
                identity_id = %membership.identity_id,
                tenant_id = %membership.tenant_id,
                "Membership references a missing identity, skipping"
            );
            continue;
        };
        profiles.push(Profile {
            identity: Identity::from(identity),
            membership: to_membership(operation, membership)?,
        });
    }
    Ok(ProfilePage { profiles, total })
}

#[async_trait]
impl UserStore for SeaOrmUserStore {
    async fn upsert_identity_by_email(
        &self,
        email: &str,
        seed: &IdentitySeed,
    ) -> Result<Identity, StoreError> {
        Ok(self.identities.upsert_by_email(email, seed).await?.into())
    }

    async fn insert_membership(&self, new: &NewMembership) -> Result<Membership, StoreError> {
        let model = self.memberships.insert(new).await?;
        to_membership("insert_membership", model)
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.find_by_email(email).await?.map(Identity::from))
    }

    async fn find_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Membership>, StoreError> {
        self.memberships
            .find(identity_id, tenant_id)
            .await?
            .map(|model| to_membership("find_membership", model))
            .transpose()
    }

    async fn find_identity_and_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Profile>, StoreError> {
        let Some(identity) = self.identities.find_by_id(identity_id).await? else {
            return Ok(None);
        };
        let Some(membership) = self.memberships.find(identity_id, tenant_id).await? else {
            return Ok(None);
        };
        if !membership.is_active {
            return Ok(None);
        }

        Ok(Some(Profile {
            identity: identity.into(),
            membership: to_membership("find_identity_and_membership", membership)?,
        }))
    }

    async fn list_memberships(
        &self,
        tenant_id: &str,
        pagination: Pagination,
    ) -> Result<ProfilePage, StoreError> {
        let (rows, total) = self.memberships.list_active(tenant_id, pagination).await?;
        to_page("list_memberships", rows, total)
    }

    async fn search_memberships(
        &self,
        tenant_id: &str,
        query: &str,
        pagination: Pagination,
    ) -> Result<ProfilePage, StoreError> {
        let (rows, total) = self
            .memberships
            .search_active(tenant_id, query, pagination)
            .await?;
        to_page("search_memberships", rows, total)
    }

    async fn update_identity(
        &self,
        identity_id: &str,
        patch: &IdentityPatch,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .identities
            .update(identity_id, patch)
            .await?
            .map(Identity::from))
    }

    async fn update_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
        patch: &MembershipPatch,
    ) -> Result<Option<Membership>, StoreError> {
        self.memberships
            .update(identity_id, tenant_id, patch)
            .await?
            .map(|model| to_membership("update_membership", model))
            .transpose()
    }

    async fn deactivate_membership(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<bool, StoreError> {
        self.memberships.deactivate(identity_id, tenant_id).await
    }
}
