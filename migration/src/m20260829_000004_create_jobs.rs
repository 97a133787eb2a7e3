use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Jobs::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Jobs::UserId).text().not_null())
                    .col(ColumnDef::new(Jobs::Title).text().not_null())
                    .col(
                        ColumnDef::new(Jobs::Status)
                            .string_len(32)
                            .not_null()
                            .default("open"),
                    )
                    .col(ColumnDef::new(Jobs::ExternalSystem).string_len(64).null())
                    .col(ColumnDef::new(Jobs::ExternalId).string_len(255).null())
                    .col(
                        ColumnDef::new(Jobs::SyncState)
                            .string_len(16)
                            .not_null()
                            .default("unsynced"),
                    )
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Two local rows must never bind to the same remote record.
        // NULL external_id rows (never pushed) are exempt per SQL semantics.
        manager
            .create_index(
                Index::create()
                    .name("ux-jobs-external_system-external_id")
                    .table(Jobs::Table)
                    .col(Jobs::ExternalSystem)
                    .col(Jobs::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    UserId,
    Title,
    Status,
    ExternalSystem,
    ExternalId,
    SyncState,
    CreatedAt,
    UpdatedAt,
}
