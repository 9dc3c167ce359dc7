use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 轮盘用户状态表实体
/// 说明:
/// - user_id: 外部身份 (Telegram 用户 ID)，主键
/// - eligible: 缓存字段，每次读取前都会按 last_spin_at 重新计算
/// - cheat_key / cheat_key_expires_at: 最近一次抽中的作弊码（覆盖写）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "roulette_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(column_type = "Double")]
    pub balance: f64,
    pub eligible: bool,
    pub last_spin_at: Option<DateTime<Utc>>,
    pub cheat_key: Option<String>,
    pub cheat_key_expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
