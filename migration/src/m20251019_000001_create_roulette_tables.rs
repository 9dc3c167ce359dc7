use sea_orm_migration::prelude::*;

/// Roulette Users (用户状态：余额 / 冷却 / 作弊码)
#[derive(DeriveIden)]
enum RouletteUsers {
    Table,
    UserId,
    Balance,
    Eligible,
    LastSpinAt,
    CheatKey,
    CheatKeyExpiresAt,
    CreatedAt,
    UpdatedAt,
}

/// Roulette Grants (配置 / 脚本解锁记录)
#[derive(DeriveIden)]
enum RouletteGrants {
    Table,
    Id,
    UserId,
    Kind,
    Seq,
    DownloadUrl,
    GrantedAt,
}

/// Roulette History (抽奖历史)
#[derive(DeriveIden)]
enum RouletteHistory {
    Table,
    Id,
    UserId,
    PrizeName,
    PrizeKind,
    Description,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// user_id 为外部身份 (Telegram 用户 ID 的字符串形式)，作为主键。
/// 解锁记录与历史只追加；清空历史是整体删除该用户的历史行。
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RouletteUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RouletteUsers::UserId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RouletteUsers::Balance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(RouletteUsers::Eligible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(RouletteUsers::LastSpinAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(RouletteUsers::CheatKey).string_len(32).null())
                    .col(
                        ColumnDef::new(RouletteUsers::CheatKeyExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RouletteUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(RouletteUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RouletteGrants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RouletteGrants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RouletteGrants::UserId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RouletteGrants::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(RouletteGrants::Seq).big_integer().not_null())
                    .col(
                        ColumnDef::new(RouletteGrants::DownloadUrl)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RouletteGrants::GrantedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roulette_grants_user")
                            .from(RouletteGrants::Table, RouletteGrants::UserId)
                            .to(RouletteUsers::Table, RouletteUsers::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一用户同一类型的序号唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_roulette_grants_user_kind_seq")
                    .table(RouletteGrants::Table)
                    .col(RouletteGrants::UserId)
                    .col(RouletteGrants::Kind)
                    .col(RouletteGrants::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RouletteHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RouletteHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RouletteHistory::UserId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RouletteHistory::PrizeName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RouletteHistory::PrizeKind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RouletteHistory::Description)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RouletteHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roulette_history_user")
                            .from(RouletteHistory::Table, RouletteHistory::UserId)
                            .to(RouletteUsers::Table, RouletteUsers::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_roulette_history_user")
                    .table(RouletteHistory::Table)
                    .col(RouletteHistory::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：历史 -> 解锁 -> 用户
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RouletteHistory::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RouletteGrants::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RouletteUsers::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
