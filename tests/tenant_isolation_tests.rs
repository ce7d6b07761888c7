//! Tests ensuring tenant isolation at the store and service layers.

use anyhow::Result;
use sea_orm::{ConnectionTrait, Statement};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{create_request, setup_service, setup_test_db_arc};
use user_service::domain::{IdentitySeed, NewMembership};
use user_service::repositories::{SeaOrmUserStore, UserStore};
use user_service::service::{ServiceError, UpdateUserRequest};

#[tokio::test]
async fn unique_constraint_scoped_to_tenant() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let store = SeaOrmUserStore::new(db.clone());

    let identity = store
        .upsert_identity_by_email("shared@example.com", &IdentitySeed::default())
        .await?;
    store
        .insert_membership(&NewMembership::with_default_role(&identity.id, "tenant-a", "", ""))
        .await?;
    store
        .insert_membership(&NewMembership::with_default_role(&identity.id, "tenant-b", "", ""))
        .await?;

    let duplicate = store
        .insert_membership(&NewMembership::with_default_role(&identity.id, "tenant-a", "", ""))
        .await;
    assert!(duplicate.unwrap_err().is_duplicate_key());

    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM memberships".to_string(),
        ))
        .await?
        .expect("count row");
    let count: i64 = row.try_get("", "n")?;
    assert_eq!(count, 2);
    Ok(())
}

#[tokio::test]
async fn membership_requires_existing_identity() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let store = SeaOrmUserStore::new(db);

    let orphan = store
        .insert_membership(&NewMembership::with_default_role(
            "65a1f0c2e4b0a1b2c3d4e5f6",
            "tenant-a",
            "",
            "",
        ))
        .await;
    assert!(orphan.is_err());
    Ok(())
}

#[tokio::test]
async fn cross_tenant_reads_and_writes_are_not_found() -> Result<()> {
    let (service, store) = setup_service().await?;
    let owned = service
        .create_user(create_request("ada@example.com", "tenant-a", "Ada", "Lovelace"))
        .await?;
    let id = owned.identity.id.clone();

    assert!(matches!(
        service.get_user(&id, "tenant-b").await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        service
            .update_user(
                &id,
                "tenant-b",
                UpdateUserRequest {
                    first_name: Some("Mallory".to_string()),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        service.delete_user(&id, "tenant-b").await,
        Err(ServiceError::NotFound)
    ));
    assert_eq!(store.calls("update_membership"), 0);
    assert_eq!(store.calls("deactivate_membership"), 0);

    let untouched = service.get_user(&id, "tenant-a").await?;
    assert_eq!(untouched.membership.first_name, "Ada");
    assert!(untouched.membership.is_active);
    Ok(())
}

#[tokio::test]
async fn listing_and_search_never_cross_tenants() -> Result<()> {
    let (service, _) = setup_service().await?;
    for (email, tenant) in [
        ("a1@example.com", "tenant-a"),
        ("a2@example.com", "tenant-a"),
        ("b1@example.com", "tenant-b"),
    ] {
        service
            .create_user(create_request(email, tenant, "Shared", "Name"))
            .await?;
    }

    let page = service.list_users("tenant-b", 1, 100).await?;
    assert_eq!(page.total, 1);
    assert!(
        page.profiles
            .iter()
            .all(|profile| profile.membership.tenant_id == "tenant-b")
    );

    let page = service.search_users("tenant-a", "shared", 1, 100).await?;
    assert_eq!(page.total, 2);
    assert!(
        page.profiles
            .iter()
            .all(|profile| profile.membership.tenant_id == "tenant-a")
    );
    Ok(())
}
