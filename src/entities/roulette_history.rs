use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use super::PrizeKind;

/// 抽奖历史实体
/// - prize_name 冗余存储，奖品表调整后历史仍可回溯
/// - 只追加；清空历史时整体删除该用户的行
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "roulette_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub prize_name: String,
    pub prize_kind: PrizeKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
