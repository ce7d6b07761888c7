//! # Data Models
//!
//! SeaORM entities for the `identities` and `memberships` tables, plus the
//! small response types shared by the HTTP layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod identity;
pub mod membership;

pub use identity::Entity as Identity;
pub use membership::Entity as Membership;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "user-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
