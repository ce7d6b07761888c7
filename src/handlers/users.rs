//! # Users API Handlers
//!
//! HTTP endpoints for tenant-scoped user management. Every route requires the
//! `X-Tenant-ID` header; the tenant it names scopes all reads and writes.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Profile;
use crate::error::ApiError;
use crate::server::AppState;
use crate::service::{CreateUserRequest, UpdateUserRequest, UserPage};
use crate::tenancy::{TenantExtension, TenantHeader};

/// Request payload for adding a user to the caller's tenant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequestDto {
    /// Email address; links to an existing identity when one already uses it
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Tenant-local first name (optional)
    #[serde(default)]
    #[schema(example = "Ada")]
    pub first_name: String,
    /// Tenant-local last name (optional)
    #[serde(default)]
    #[schema(example = "Lovelace")]
    pub last_name: String,
    /// Phone number in E.164-like form (optional)
    #[serde(default)]
    #[schema(example = "+447700900123")]
    pub phone: String,
}

/// Request payload for a partial user update; omitted or empty fields are left unchanged
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequestDto {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "https://cdn.example.com/avatars/ada.png")]
    pub avatar_url: Option<String>,
    /// Replaces the tenant roles when non-empty
    #[schema(example = json!(["user", "admin"]))]
    pub roles: Option<Vec<String>>,
}

/// A user as seen from one tenant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Identity ID, shared across tenants
    #[schema(example = "65a1f0c2e4b0a1b2c3d4e5f6")]
    pub id: String,
    /// Membership ID, specific to this tenant
    pub membership_id: String,
    pub email: String,
    pub tenant_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub roles: Vec<String>,
    /// Global activation flag of the identity
    pub identity_active: bool,
    /// Activation flag of the membership in this tenant
    pub membership_active: bool,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for UserResponse {
    fn from(profile: Profile) -> Self {
        let Profile {
            identity,
            membership,
        } = profile;
        Self {
            id: identity.id,
            membership_id: membership.id,
            email: identity.email,
            tenant_id: membership.tenant_id,
            first_name: membership.first_name,
            last_name: membership.last_name,
            phone: identity.phone.filter(|phone| !phone.is_empty()),
            avatar_url: identity.avatar_url.filter(|url| !url.is_empty()),
            roles: membership.roles.into_iter().collect(),
            identity_active: identity.is_active,
            membership_active: membership.is_active,
            joined_at: membership.joined_at,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

/// Single-user response envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub data: UserResponse,
}

/// Paginated list of users
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    /// Total matching users across all pages
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl From<UserPage> for UserListResponse {
    fn from(page: UserPage) -> Self {
        Self {
            users: page.profiles.into_iter().map(UserResponse::from).collect(),
            total: page.total,
            page: page.pagination.page,
            page_size: page.pagination.page_size,
        }
    }
}

/// List response envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListEnvelope {
    pub data: UserListResponse,
}

/// Plain confirmation message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Query parameters for listing users
#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 20, max: 100)
    pub page_size: Option<i64>,
}

/// Query parameters for searching users
#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct SearchUsersQuery {
    /// Name search text (2-100 characters)
    pub q: Option<String>,
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 20, max: 100)
    pub page_size: Option<i64>,
}

/// Add a user to the caller's tenant
#[utoipa::path(
    post,
    path = "/api/v1/users",
    params(TenantHeader),
    request_body = CreateUserRequestDto,
    responses(
        (status = 201, description = "User added to tenant", body = UserEnvelope),
        (status = 400, description = "Validation failed or tenant header missing", body = ApiError),
        (status = 409, description = "User already belongs to this tenant", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    TenantExtension(tenant): TenantExtension,
    payload: Result<Json<CreateUserRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let Json(request) = payload?;

    let profile = state
        .service
        .create_user(CreateUserRequest {
            email: request.email,
            tenant_id: tenant.0,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            data: profile.into(),
        }),
    ))
}

/// List active users of the caller's tenant, newest first
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(TenantHeader, ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListEnvelope),
        (status = 400, description = "Validation failed or tenant header missing", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    TenantExtension(tenant): TenantExtension,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<UserListEnvelope>, ApiError> {
    let Query(query) = query?;

    let page = state
        .service
        .list_users(
            tenant.as_str(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(0),
        )
        .await?;

    Ok(Json(UserListEnvelope { data: page.into() }))
}

/// Search active users of the caller's tenant by name
#[utoipa::path(
    get,
    path = "/api/v1/users/search",
    params(TenantHeader, SearchUsersQuery),
    responses(
        (status = 200, description = "Page of matching users", body = UserListEnvelope),
        (status = 400, description = "Validation failed or tenant header missing", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn search_users(
    State(state): State<AppState>,
    TenantExtension(tenant): TenantExtension,
    query: Result<Query<SearchUsersQuery>, QueryRejection>,
) -> Result<Json<UserListEnvelope>, ApiError> {
    let Query(query) = query?;

    let page = state
        .service
        .search_users(
            tenant.as_str(),
            query.q.as_deref().unwrap_or_default(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(0),
        )
        .await?;

    Ok(Json(UserListEnvelope { data: page.into() }))
}

/// Fetch one user of the caller's tenant
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        TenantHeader,
        ("id" = String, Path, description = "Identity ID (24 hex characters)")
    ),
    responses(
        (status = 200, description = "User found", body = UserEnvelope),
        (status = 400, description = "Validation failed or tenant header missing", body = ApiError),
        (status = 404, description = "User not found in this tenant", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let profile = state.service.get_user(&id, tenant.as_str()).await?;

    Ok(Json(UserEnvelope {
        data: profile.into(),
    }))
}

/// Update a user of the caller's tenant
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(
        TenantHeader,
        ("id" = String, Path, description = "Identity ID (24 hex characters)")
    ),
    request_body = UpdateUserRequestDto,
    responses(
        (status = 200, description = "User updated", body = UserEnvelope),
        (status = 400, description = "Validation failed or tenant header missing", body = ApiError),
        (status = 404, description = "User not found in this tenant", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequestDto>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let Json(request) = payload?;

    let profile = state
        .service
        .update_user(
            &id,
            tenant.as_str(),
            UpdateUserRequest {
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                avatar_url: request.avatar_url,
                roles: request.roles,
            },
        )
        .await?;

    Ok(Json(UserEnvelope {
        data: profile.into(),
    }))
}

/// Remove a user from the caller's tenant (soft delete)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(
        TenantHeader,
        ("id" = String, Path, description = "Identity ID (24 hex characters)")
    ),
    responses(
        (status = 200, description = "Membership deactivated", body = MessageResponse),
        (status = 400, description = "Validation failed or tenant header missing", body = ApiError),
        (status = 404, description = "User not found in this tenant", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete_user(&id, tenant.as_str()).await?;

    Ok(Json(MessageResponse {
        message: "User removed from tenant".to_string(),
    }))
}
