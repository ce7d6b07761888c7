//! # User Association Service
//!
//! Orchestrates validation and storage to create, read, search, update and
//! soft-delete tenant-scoped users. Input is validated before any storage
//! access, and every store call is bounded by the configured operation timeout.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    IdentityPatch, IdentitySeed, MembershipPatch, NewMembership, Profile, ProfilePage,
};
use crate::repositories::{StoreError, UserStore};
use crate::validation::{
    self, Pagination, ValidationError, validate_avatar_url, validate_email, validate_name,
    validate_object_id, validate_phone, validate_roles, validate_search_query, validate_tenant_id,
};

/// Failure kinds surfaced to callers of [`UserService`]
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
    #[error("User already exists in this tenant")]
    AlreadyMember,
    #[error("User not found in this tenant")]
    NotFound,
    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Input for [`UserService::create_user`]. Empty names and phone are allowed.
#[derive(Debug, Clone, Default)]
pub struct CreateUserRequest {
    pub email: String,
    pub tenant_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Input for [`UserService::update_user`]; absent or empty fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub roles: Option<Vec<String>>,
}

/// A page of profiles with the clamped pagination that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub profiles: Vec<Profile>,
    pub total: u64,
    pub pagination: Pagination,
}

impl UserPage {
    fn new(page: ProfilePage, pagination: Pagination) -> Self {
        Self {
            profiles: page.profiles,
            total: page.total,
            pagination,
        }
    }
}

/// Tenant-aware user operations over a [`UserStore`]
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    op_timeout: Duration,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// Creates the identity if needed and joins it to the tenant.
    ///
    /// Any existing membership for the same pair, active or not, fails with
    /// `AlreadyMember`.
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<Profile, ServiceError> {
        let email = validate_email(&request.email)?;
        let tenant_id = validate_tenant_id(&request.tenant_id)?;
        let first_name = optional_name(&request.first_name, "first_name")?;
        let last_name = optional_name(&request.last_name, "last_name")?;
        let phone = validate_phone(&request.phone)?;
        let phone = (!phone.is_empty()).then_some(phone);

        let existing = self
            .call(
                "Failed to create user",
                "find_identity_by_email",
                self.store.find_identity_by_email(&email),
            )
            .await?;

        if let Some(identity) = existing {
            let membership = self
                .call(
                    "Failed to create user",
                    "find_membership",
                    self.store.find_membership(&identity.id, &tenant_id),
                )
                .await?;

            if let Some(membership) = membership {
                tracing::info!(
                    identity_id = %identity.id,
                    membership_active = membership.is_active,
                    "User already member of tenant"
                );
                return Err(ServiceError::AlreadyMember);
            }
        }

        let seed = IdentitySeed {
            phone,
            avatar_url: None,
        };
        let identity = self
            .call(
                "Failed to create user",
                "upsert_identity_by_email",
                self.store.upsert_identity_by_email(&email, &seed),
            )
            .await?;

        let new = NewMembership::with_default_role(&identity.id, &tenant_id, first_name, last_name);
        let membership = match self
            .bounded("insert_membership", self.store.insert_membership(&new))
            .await
        {
            Ok(membership) => membership,
            Err(error) if error.is_duplicate_key() => {
                tracing::info!(identity_id = %identity.id, "Concurrent join detected for tenant");
                return Err(ServiceError::AlreadyMember);
            }
            Err(error) => return Err(internal("Failed to create user", error)),
        };

        tracing::info!(
            identity_id = %identity.id,
            membership_id = %membership.id,
            "User joined tenant"
        );

        Ok(Profile {
            identity,
            membership,
        })
    }

    /// Returns the active profile for the identity within the tenant
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str, tenant_id: &str) -> Result<Profile, ServiceError> {
        let id = validate_object_id(id)?;
        let tenant_id = validate_tenant_id(tenant_id)?;

        self.call(
            "Failed to get user",
            "find_identity_and_membership",
            self.store.find_identity_and_membership(&id, &tenant_id),
        )
        .await?
        .ok_or(ServiceError::NotFound)
    }

    /// Lists the tenant's active users, newest first
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        tenant_id: &str,
        page: i64,
        page_size: i64,
    ) -> Result<UserPage, ServiceError> {
        let tenant_id = validate_tenant_id(tenant_id)?;
        let pagination = validation::validate_pagination(page, page_size);

        let page = self
            .call(
                "Failed to list users",
                "list_memberships",
                self.store.list_memberships(&tenant_id, pagination),
            )
            .await?;

        Ok(UserPage::new(page, pagination))
    }

    /// Searches the tenant's active users by display name
    #[instrument(skip(self))]
    pub async fn search_users(
        &self,
        tenant_id: &str,
        query: &str,
        page: i64,
        page_size: i64,
    ) -> Result<UserPage, ServiceError> {
        let tenant_id = validate_tenant_id(tenant_id)?;
        let query = validate_search_query(query)?;
        let pagination = validation::validate_pagination(page, page_size);

        let page = self
            .call(
                "Failed to search users",
                "search_memberships",
                self.store
                    .search_memberships(&tenant_id, &query, pagination),
            )
            .await?;

        Ok(UserPage::new(page, pagination))
    }

    /// Applies the non-empty request fields and returns the merged profile.
    ///
    /// Each entity is written only when one of its fields actually changes.
    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        id: &str,
        tenant_id: &str,
        request: UpdateUserRequest,
    ) -> Result<Profile, ServiceError> {
        let id = validate_object_id(id)?;
        let tenant_id = validate_tenant_id(tenant_id)?;

        let first_name = present(request.first_name.as_deref())
            .map(|name| validate_name(name, "first_name"))
            .transpose()?;
        let last_name = present(request.last_name.as_deref())
            .map(|name| validate_name(name, "last_name"))
            .transpose()?;
        let phone = present(request.phone.as_deref())
            .map(validate_phone)
            .transpose()?;
        let avatar_url = present(request.avatar_url.as_deref())
            .map(validate_avatar_url)
            .transpose()?;
        let roles: Option<BTreeSet<String>> = match request.roles.as_deref() {
            Some(roles) if !roles.is_empty() => Some(validate_roles(roles)?),
            _ => None,
        };

        let Profile {
            mut identity,
            mut membership,
        } = self
            .call(
                "Failed to fetch user",
                "find_identity_and_membership",
                self.store.find_identity_and_membership(&id, &tenant_id),
            )
            .await?
            .ok_or(ServiceError::NotFound)?;

        let identity_patch = IdentityPatch {
            phone: phone.filter(|phone| identity.phone.as_ref() != Some(phone)),
            avatar_url: avatar_url.filter(|url| identity.avatar_url.as_ref() != Some(url)),
        };
        let membership_patch = MembershipPatch {
            first_name: first_name.filter(|name| *name != membership.first_name),
            last_name: last_name.filter(|name| *name != membership.last_name),
            roles: roles.filter(|roles| *roles != membership.roles),
        };

        if !identity_patch.is_empty() {
            identity = self
                .call(
                    "Failed to update user",
                    "update_identity",
                    self.store.update_identity(&id, &identity_patch),
                )
                .await?
                .ok_or(ServiceError::NotFound)?;
        }

        if !membership_patch.is_empty() {
            membership = self
                .call(
                    "Failed to update user",
                    "update_membership",
                    self.store
                        .update_membership(&id, &tenant_id, &membership_patch),
                )
                .await?
                .ok_or(ServiceError::NotFound)?;
        }

        if identity_patch.is_empty() && membership_patch.is_empty() {
            tracing::debug!(identity_id = %id, "Update carried no changes");
        } else {
            tracing::info!(identity_id = %id, "User updated");
        }

        Ok(Profile {
            identity,
            membership,
        })
    }

    /// Deactivates the tenant membership; the identity is left untouched
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str, tenant_id: &str) -> Result<(), ServiceError> {
        let id = validate_object_id(id)?;
        let tenant_id = validate_tenant_id(tenant_id)?;

        let membership = self
            .call(
                "Failed to delete user",
                "find_membership",
                self.store.find_membership(&id, &tenant_id),
            )
            .await?;
        if !membership.is_some_and(|membership| membership.is_active) {
            return Err(ServiceError::NotFound);
        }

        let deactivated = self
            .call(
                "Failed to delete user",
                "deactivate_membership",
                self.store.deactivate_membership(&id, &tenant_id),
            )
            .await?;
        if !deactivated {
            return Err(ServiceError::NotFound);
        }

        tracing::info!(identity_id = %id, "Tenant membership deactivated");
        Ok(())
    }

    /// Runs a store call under the operation timeout
    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout_ms: self.op_timeout.as_millis(),
            }),
        }
    }

    /// Runs a bounded store call and maps any failure to `Internal`
    async fn call<T, F>(
        &self,
        context: &'static str,
        operation: &'static str,
        future: F,
    ) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.bounded(operation, future)
            .await
            .map_err(|error| internal(context, error))
    }
}

fn internal(context: &'static str, source: StoreError) -> ServiceError {
    tracing::error!(error = %source, context, "Store operation failed");
    ServiceError::Internal { context, source }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Names may be omitted at creation; empty input is stored as an empty string
fn optional_name(name: &str, field: &'static str) -> Result<String, ValidationError> {
    if name.trim().is_empty() {
        Ok(String::new())
    } else {
        validate_name(name, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_name_accepts_blank() {
        assert_eq!(optional_name("   ", "first_name").unwrap(), "");
        assert_eq!(optional_name(" Ada ", "first_name").unwrap(), "Ada");
        assert!(matches!(
            optional_name("Ada1", "first_name"),
            Err(ValidationError::InvalidCharacters { field: "first_name" })
        ));
    }

    #[test]
    fn test_present_skips_blank_values() {
        assert_eq!(present(None), None);
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(Some("x")), Some("x"));
    }

    #[test]
    fn test_service_error_messages() {
        assert_eq!(
            ServiceError::AlreadyMember.to_string(),
            "User already exists in this tenant"
        );
        let invalid: ServiceError = ValidationError::Required { field: "email" }.into();
        assert_eq!(invalid.to_string(), "email is required");
    }
}
