//! Membership repository for database operations
//!
//! This module provides the MembershipRepository struct which encapsulates
//! SeaORM operations for the memberships table. Every method takes the tenant
//! id and filters on it; there is no unscoped accessor.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, LikeExpr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

use super::StoreError;
use crate::domain::{MembershipPatch, NewMembership, new_object_id, roles_to_json};
use crate::models::identity::{self, Entity as Identity};
use crate::models::membership::{self, Entity as Membership};
use crate::validation::Pagination;

/// A membership row with its identity hydrated by the join.
pub type MembershipWithIdentity = (membership::Model, Option<identity::Model>);

/// Repository for membership database operations
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts an active membership joined now.
    ///
    /// A second membership for the same (identity, tenant) pair is rejected by
    /// the composite unique index and surfaces as `StoreError::DuplicateKey`.
    pub async fn insert(&self, new: &NewMembership) -> Result<membership::Model, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let model = membership::Model {
            id: new_object_id(),
            identity_id: new.identity_id.clone(),
            tenant_id: new.tenant_id.clone(),
            roles: roles_to_json(&new.roles),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            first_name_search: fold_name(&new.first_name),
            last_name_search: fold_name(&new.last_name),
            is_active: true,
            joined_at: now,
        };

        let active = membership::ActiveModel {
            id: Set(model.id.clone()),
            identity_id: Set(model.identity_id.clone()),
            tenant_id: Set(model.tenant_id.clone()),
            roles: Set(model.roles.clone()),
            first_name: Set(model.first_name.clone()),
            last_name: Set(model.last_name.clone()),
            first_name_search: Set(model.first_name_search.clone()),
            last_name_search: Set(model.last_name_search.clone()),
            is_active: Set(model.is_active),
            joined_at: Set(model.joined_at),
        };

        Membership::insert(active)
            .exec_without_returning(&*self.db)
            .await
            .map_err(|e| {
                StoreError::from_db(
                    "insert_membership",
                    pair_key(&new.identity_id, &new.tenant_id),
                    e,
                )
            })?;

        Ok(model)
    }

    /// Finds the membership for an (identity, tenant) pair, active or not
    pub async fn find(
        &self,
        identity_id: &str,
        tenant_id: &str,
    ) -> Result<Option<membership::Model>, StoreError> {
        Membership::find()
            .filter(membership::Column::IdentityId.eq(identity_id))
            .filter(membership::Column::TenantId.eq(tenant_id))
            .one(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("find_membership", pair_key(identity_id, tenant_id), e))
    }

    /// Lists active memberships of a tenant, newest first, with identities joined
    pub async fn list_active(
        &self,
        tenant_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<MembershipWithIdentity>, u64), StoreError> {
        let key = format!("tenant_id={tenant_id}");

        let total = active_in_tenant(tenant_id)
            .count(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("count_memberships", key.clone(), e))?;

        let rows = active_in_tenant(tenant_id)
            .find_also_related(Identity)
            .order_by_desc(membership::Column::JoinedAt)
            .order_by_desc(membership::Column::Id)
            .offset(pagination.offset())
            .limit(pagination.page_size)
            .all(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("list_memberships", key, e))?;

        Ok((rows, total))
    }

    /// Searches active memberships of a tenant by display name.
    ///
    /// `query` is split on whitespace; a row matches when any term is a
    /// substring of the lowercased `first_name` or `last_name` copy. Rows whose
    /// name equals a term rank first, then prefix matches, then the rest.
    pub async fn search_active(
        &self,
        tenant_id: &str,
        query: &str,
        pagination: Pagination,
    ) -> Result<(Vec<MembershipWithIdentity>, u64), StoreError> {
        let key = format!("tenant_id={tenant_id}");
        let terms = search_terms(query);
        if terms.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let matches = name_condition(&terms, |term| format!("%{}%", escape_like(term)));

        let total = active_in_tenant(tenant_id)
            .filter(matches.clone())
            .count(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("count_search_memberships", key.clone(), e))?;

        let rows = active_in_tenant(tenant_id)
            .filter(matches)
            .find_also_related(Identity)
            .order_by(match_rank(&terms), Order::Asc)
            .order_by_desc(membership::Column::JoinedAt)
            .order_by_desc(membership::Column::Id)
            .offset(pagination.offset())
            .limit(pagination.page_size)
            .all(&*self.db)
            .await
            .map_err(|e| StoreError::from_db("search_memberships", key, e))?;

        Ok((rows, total))
    }

    /// Applies the present patch fields to the (identity, tenant) membership
    pub async fn update(
        &self,
        identity_id: &str,
        tenant_id: &str,
        patch: &MembershipPatch,
    ) -> Result<Option<membership::Model>, StoreError> {
        if patch.is_empty() {
            return self.find(identity_id, tenant_id).await;
        }

        let mut update = Membership::update_many()
            .filter(membership::Column::IdentityId.eq(identity_id))
            .filter(membership::Column::TenantId.eq(tenant_id));

        if let Some(first_name) = &patch.first_name {
            update = update
                .col_expr(membership::Column::FirstName, Expr::value(first_name.clone()))
                .col_expr(membership::Column::FirstNameSearch, Expr::value(fold_name(first_name)));
        }
        if let Some(last_name) = &patch.last_name {
            update = update
                .col_expr(membership::Column::LastName, Expr::value(last_name.clone()))
                .col_expr(membership::Column::LastNameSearch, Expr::value(fold_name(last_name)));
        }
        if let Some(roles) = &patch.roles {
            update = update.col_expr(membership::Column::Roles, Expr::value(roles_to_json(roles)));
        }

        let result = update.exec(&*self.db).await.map_err(|e| {
            StoreError::from_db("update_membership", pair_key(identity_id, tenant_id), e)
        })?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.find(identity_id, tenant_id).await
    }

    /// Marks the membership inactive; returns false when nothing matched
    pub async fn deactivate(&self, identity_id: &str, tenant_id: &str) -> Result<bool, StoreError> {
        let result = Membership::update_many()
            .col_expr(membership::Column::IsActive, Expr::value(false))
            .filter(membership::Column::IdentityId.eq(identity_id))
            .filter(membership::Column::TenantId.eq(tenant_id))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                StoreError::from_db("deactivate_membership", pair_key(identity_id, tenant_id), e)
            })?;

        Ok(result.rows_affected > 0)
    }
}

fn pair_key(identity_id: &str, tenant_id: &str) -> String {
    format!("identity_id={identity_id} tenant_id={tenant_id}")
}

fn active_in_tenant(tenant_id: &str) -> sea_orm::Select<Membership> {
    Membership::find()
        .filter(membership::Column::TenantId.eq(tenant_id))
        .filter(membership::Column::IsActive.eq(true))
}

/// Case folding shared by `*_name_search` columns and query terms; both
/// sides must go through this, never through SQL `LOWER()`.
fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Lowercased, de-duplicated whitespace-separated terms
fn search_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query.split_whitespace().map(fold_name) {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `first_name_search LIKE p OR last_name_search LIKE p` for every term's pattern
fn name_condition(terms: &[String], pattern: impl Fn(&str) -> String) -> Condition {
    terms.iter().fold(Condition::any(), |condition, term| {
        let pattern = pattern(term);
        condition
            .add(
                membership::Column::FirstNameSearch
                    .like(LikeExpr::new(pattern.clone()).escape('\\')),
            )
            .add(membership::Column::LastNameSearch.like(LikeExpr::new(pattern).escape('\\')))
    })
}

/// 0 for an exact name match, 1 for a prefix match, 2 otherwise
fn match_rank(terms: &[String]) -> SimpleExpr {
    let exact = terms.iter().fold(Condition::any(), |condition, term| {
        condition
            .add(membership::Column::FirstNameSearch.eq(term.clone()))
            .add(membership::Column::LastNameSearch.eq(term.clone()))
    });
    let prefix = name_condition(terms, |term| format!("{}%", escape_like(term)));

    Expr::case(exact, 0).case(prefix, 1).finally(2).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_terms_split_and_dedupe() {
        assert_eq!(search_terms("  Ada   LOVELACE ada "), vec!["ada", "lovelace"]);
        assert!(search_terms("   ").is_empty());
    }

    #[test]
    fn test_search_terms_fold_non_ascii() {
        assert_eq!(search_terms("ÉMILE Øster"), vec!["émile", "øster"]);
        assert_eq!(fold_name("Émile"), "émile");
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("o'neil"), "o'neil");
        assert_eq!(escape_like("100%_"), "100\\%\\_");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
