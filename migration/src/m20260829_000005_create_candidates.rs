use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Candidates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candidates::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Candidates::UserId).text().not_null())
                    .col(ColumnDef::new(Candidates::Name).text().not_null())
                    .col(ColumnDef::new(Candidates::Email).string_len(255).null())
                    .col(ColumnDef::new(Candidates::Phone).string_len(64).null())
                    .col(
                        ColumnDef::new(Candidates::ExternalSystem)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Candidates::ExternalId)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Candidates::SyncState)
                            .string_len(16)
                            .not_null()
                            .default("unsynced"),
                    )
                    .col(
                        ColumnDef::new(Candidates::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Candidates::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux-candidates-external_system-external_id")
                    .table(Candidates::Table)
                    .col(Candidates::ExternalSystem)
                    .col(Candidates::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candidates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Candidates {
    Table,
    Id,
    UserId,
    Name,
    Email,
    Phone,
    ExternalSystem,
    ExternalId,
    SyncState,
    CreatedAt,
    UpdatedAt,
}
