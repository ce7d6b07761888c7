//! Migration to create the memberships table.
//!
//! A membership binds one identity to one tenant and carries the tenant-local
//! display name, roles and activation flag.

use sea_orm_migration::prelude::*;

use crate::m2026_01_05_000001_create_identities::Identities;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Memberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Memberships::Id)
                            .string_len(24)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Memberships::IdentityId)
                            .string_len(24)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Memberships::TenantId).string_len(128).not_null())
                    .col(ColumnDef::new(Memberships::Roles).json_binary().not_null())
                    .col(
                        ColumnDef::new(Memberships::FirstName)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Memberships::LastName)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Memberships::FirstNameSearch)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Memberships::LastNameSearch)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Memberships::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Memberships::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_identity_id")
                            .from(Memberships::Table, Memberships::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership per (identity, tenant) pair; also the concurrency guard
        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_identity_tenant")
                    .table(Memberships::Table)
                    .col(Memberships::IdentityId)
                    .col(Memberships::TenantId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Tenant-scoped listing
        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_tenant_id")
                    .table(Memberships::Table)
                    .col(Memberships::TenantId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Name search within a tenant, over the lowercased copies
        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_search_names")
                    .table(Memberships::Table)
                    .col(Memberships::TenantId)
                    .col(Memberships::LastNameSearch)
                    .col(Memberships::FirstNameSearch)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_memberships_search_names",
            "idx_memberships_tenant_id",
            "idx_memberships_identity_tenant",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Memberships::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Memberships {
    Table,
    Id,
    IdentityId,
    TenantId,
    Roles,
    FirstName,
    LastName,
    FirstNameSearch,
    LastNameSearch,
    IsActive,
    JoinedAt,
}
