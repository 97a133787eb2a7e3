use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoredTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoredTokens::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoredTokens::UserId).text().not_null())
                    .col(
                        ColumnDef::new(StoredTokens::Integration)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StoredTokens::AccessToken).text().not_null())
                    .col(
                        ColumnDef::new(StoredTokens::RefreshToken)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoredTokens::ExpiresAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StoredTokens::ApiDomain).text().null())
                    .col(ColumnDef::new(StoredTokens::AccountsServer).text().null())
                    .col(ColumnDef::new(StoredTokens::Scope).text().not_null())
                    .col(
                        ColumnDef::new(StoredTokens::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(StoredTokens::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one active grant per (user, integration).
        manager
            .create_index(
                Index::create()
                    .name("ux-stored_tokens-user_id-integration")
                    .table(StoredTokens::Table)
                    .col(StoredTokens::UserId)
                    .col(StoredTokens::Integration)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoredTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StoredTokens {
    Table,
    Id,
    UserId,
    Integration,
    AccessToken,
    RefreshToken,
    ExpiresAt,
    ApiDomain,
    AccountsServer,
    Scope,
    CreatedAt,
    UpdatedAt,
}
