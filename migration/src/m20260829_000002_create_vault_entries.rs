use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaultEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VaultEntries::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VaultEntries::UserId).text().not_null())
                    .col(
                        ColumnDef::new(VaultEntries::ServiceName)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaultEntries::EncryptedKey)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaultEntries::KeyLabel)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VaultEntries::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VaultEntries::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VaultEntries::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Storing again for the same service supersedes, never duplicates.
        manager
            .create_index(
                Index::create()
                    .name("ux-vault_entries-user_id-service_name")
                    .table(VaultEntries::Table)
                    .col(VaultEntries::UserId)
                    .col(VaultEntries::ServiceName)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaultEntries {
    Table,
    Id,
    UserId,
    ServiceName,
    EncryptedKey,
    KeyLabel,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
