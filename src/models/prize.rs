use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::PrizeKind;

/// 奖品定义（启动时加载，运行期不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeDefinition {
    /// 展示名称
    pub name: String,
    pub kind: PrizeKind,
    /// 相对权重 (正整数)
    pub weight: u32,
    /// 货币数量，仅 currency 类型
    #[serde(default)]
    pub amount: Option<f64>,
    /// 下载地址，仅 config / lua_script 类型；缺省时使用内置地址
    #[serde(default)]
    pub download_url: Option<String>,
}

impl PrizeDefinition {
    pub fn new(name: &str, kind: PrizeKind, weight: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            weight,
            amount: None,
            download_url: None,
        }
    }

    pub fn currency(name: &str, weight: u32, amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::new(name, PrizeKind::Currency, weight)
        }
    }
}

/// 奖品列表项（前端渲染轮盘用）
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizeResponse {
    pub name: String,
    pub kind: PrizeKind,
    pub weight: u32,
    /// 中奖概率 (百分比)
    pub probability: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}
