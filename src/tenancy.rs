//! # Tenant Context
//!
//! Extracts the `X-Tenant-ID` header for tenant-scoped routes and makes it
//! available to handlers through [`TenantExtension`]. Only presence and length
//! are checked here; the service applies the full tenant id validation.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::validation::{MAX_TENANT_ID_LEN, MIN_TENANT_ID_LEN};

/// Header carrying the caller's tenant
pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Tenant ID wrapper for type safety
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extractor for tenant ID from request extensions
#[derive(Debug, Clone)]
pub struct TenantExtension(pub TenantId);

/// Middleware that rejects tenant-scoped requests without a usable `X-Tenant-ID`
pub async fn tenant_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let tenant = extract_tenant_id(request.headers())?;
    tracing::debug!(tenant_id = %tenant, "Tenant context established");

    request.extensions_mut().insert(TenantExtension(tenant));
    Ok(next.run(request).await)
}

fn extract_tenant_id(headers: &HeaderMap) -> Result<TenantId, ApiError> {
    let value = headers
        .get(TENANT_ID_HEADER)
        .map(|value| value.to_str().map(str::trim));

    let tenant_id = match value {
        None | Some(Ok("")) => return Err(tenant_id_required()),
        Some(Ok(tenant_id)) => tenant_id,
        Some(Err(_)) => return Err(invalid_tenant_id("X-Tenant-ID must be valid UTF-8")),
    };

    let len = tenant_id.chars().count();
    if !(MIN_TENANT_ID_LEN..=MAX_TENANT_ID_LEN).contains(&len) {
        return Err(invalid_tenant_id(
            "X-Tenant-ID must be between 3 and 128 characters",
        ));
    }

    Ok(TenantId(tenant_id.to_string()))
}

fn tenant_id_required() -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "TENANT_ID_REQUIRED",
        "X-Tenant-ID header is required for all tenant operations",
    )
    .with_details(serde_json::json!({ "X-Tenant-ID": "Required header is missing" }))
}

fn invalid_tenant_id(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "INVALID_TENANT_ID", message)
        .with_details(serde_json::json!({ "X-Tenant-ID": message }))
}

/// OpenAPI header parameter for X-Tenant-ID
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct TenantHeader {
    /// Tenant identifier (3-128 characters of `[A-Za-z0-9_-]`) that scopes the request
    #[serde(rename = "X-Tenant-ID")]
    #[param(rename = "X-Tenant-ID", value_type = String)]
    pub tenant_id: String,
}

impl<S> FromRequestParts<S> for TenantExtension
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(tenant) = parts.extensions.get::<TenantExtension>() {
            return Ok(tenant.clone());
        }
        // Route mounted without the middleware: read the header directly
        extract_tenant_id(&parts.headers).map(TenantExtension)
    }
}
