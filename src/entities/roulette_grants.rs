use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use super::PrizeKind;

/// 配置 / 脚本解锁记录
/// - kind 只会是 config 或 lua_script
/// - seq 为用户在该类型下的顺序编号 (从 1 开始)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "roulette_grants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub kind: PrizeKind,
    pub seq: i64,
    pub download_url: String,
    pub granted_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
