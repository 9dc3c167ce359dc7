use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 奖品类型，决定发放逻辑
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum PrizeKind {
    #[sea_orm(string_value = "cheat")]
    Cheat,
    #[sea_orm(string_value = "config")]
    Config,
    #[sea_orm(string_value = "lua_script")]
    #[serde(alias = "lua")]
    LuaScript,
    #[sea_orm(string_value = "currency")]
    #[serde(alias = "nle")]
    Currency,
    #[sea_orm(string_value = "retry")]
    Retry,
}

impl std::fmt::Display for PrizeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrizeKind::Cheat => write!(f, "cheat"),
            PrizeKind::Config => write!(f, "config"),
            PrizeKind::LuaScript => write!(f, "lua_script"),
            PrizeKind::Currency => write!(f, "currency"),
            PrizeKind::Retry => write!(f, "retry"),
        }
    }
}
