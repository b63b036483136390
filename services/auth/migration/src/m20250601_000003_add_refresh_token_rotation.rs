use sea_orm_migration::prelude::*;

const USED_AT_CHECK: &str = "chk_refresh_tokens_used_at_matches_is_used";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(RefreshTokens::Table)
                    .add_column(
                        ColumnDef::new(RefreshTokens::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .add_column(ColumnDef::new(RefreshTokens::UsedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!(
                "ALTER TABLE refresh_tokens ADD CONSTRAINT {USED_AT_CHECK} \
                 CHECK ((is_used AND used_at IS NOT NULL) OR (NOT is_used AND used_at IS NULL))"
            ))
            .await?;

        // Cleanup scans by expiry and consumption state.
        manager
            .create_index(
                Index::create()
                    .table(RefreshTokens::Table)
                    .col(RefreshTokens::ExpiresAt)
                    .name("idx_refresh_tokens_expires_at")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(RefreshTokens::Table)
                    .col(RefreshTokens::IsUsed)
                    .name("idx_refresh_tokens_is_used")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_refresh_tokens_is_used").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_refresh_tokens_expires_at").to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "ALTER TABLE refresh_tokens DROP CONSTRAINT IF EXISTS {USED_AT_CHECK}"
            ))
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(RefreshTokens::Table)
                    .drop_column(RefreshTokens::UsedAt)
                    .drop_column(RefreshTokens::IsUsed)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum RefreshTokens {
    Table,
    ExpiresAt,
    IsUsed,
    UsedAt,
}
