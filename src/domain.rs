//! # Domain Types
//!
//! Storage-independent views of identities and memberships, the [`Profile`]
//! pairing returned to callers, and the seed/patch shapes passed to the store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::models::{identity, membership};

/// Role assigned to every new membership.
pub const DEFAULT_ROLE: &str = "user";

/// Generates a new 24-character lowercase hex record identifier.
pub fn new_object_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}

/// Global user record, one per email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Association of one identity with one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub id: String,
    pub identity_id: String,
    pub tenant_id: String,
    pub roles: BTreeSet<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Read-time pairing of an identity with one of its memberships. Never persisted.
///
/// Both activation flags are kept as-is; callers decide how to combine them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub identity: Identity,
    pub membership: Membership,
}

/// One page of profiles plus the total number of matching memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePage {
    pub profiles: Vec<Profile>,
    pub total: u64,
}

/// Fields used when an identity is inserted for the first time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySeed {
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// A membership about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub identity_id: String,
    pub tenant_id: String,
    pub roles: BTreeSet<String>,
    pub first_name: String,
    pub last_name: String,
}

impl NewMembership {
    /// Active membership with the default role.
    pub fn with_default_role(
        identity_id: impl Into<String>,
        tenant_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            identity_id: identity_id.into(),
            tenant_id: tenant_id.into(),
            roles: BTreeSet::from([DEFAULT_ROLE.to_string()]),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Partial identity update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPatch {
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

impl IdentityPatch {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.avatar_url.is_none()
    }
}

/// Partial membership update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Option<BTreeSet<String>>,
}

impl MembershipPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.roles.is_none()
    }
}

impl From<identity::Model> for Identity {
    fn from(model: identity::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            phone: model.phone,
            avatar_url: model.avatar_url,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl TryFrom<membership::Model> for Membership {
    type Error = serde_json::Error;

    fn try_from(model: membership::Model) -> Result<Self, Self::Error> {
        let roles: BTreeSet<String> = serde_json::from_value(model.roles)?;
        Ok(Self {
            id: model.id,
            identity_id: model.identity_id,
            tenant_id: model.tenant_id,
            roles,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
            joined_at: model.joined_at.with_timezone(&Utc),
        })
    }
}

/// Serializes a role set into the JSON array stored in `memberships.roles`.
pub fn roles_to_json(roles: &BTreeSet<String>) -> serde_json::Value {
    serde_json::Value::Array(
        roles
            .iter()
            .cloned()
            .map(serde_json::Value::String)
            .collect(),
    )
}
