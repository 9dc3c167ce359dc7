use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entities::PrizeKind;
use crate::error::{AppError, AppResult};

use super::{CheatKey, Grant};

/// 用户 ID 最大长度（与 roulette_users.user_id 列宽一致）
pub const MAX_USER_ID_LEN: usize = 64;

/// 所有轮盘接口共用的请求体
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    /// 外部用户 ID（字符串或整数）
    #[serde(default, alias = "user_id")]
    #[schema(value_type = Option<String>, example = "123456789")]
    pub user_id: Option<Value>,
}

impl UserRequest {
    /// 校验并规整 userId；缺失、空串、超长或非字符串/整数均视为请求格式错误
    pub fn user_id(&self) -> AppResult<String> {
        let id = match &self.user_id {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => String::new(),
        };
        if id.is_empty() {
            return Err(AppError::MalformedRequest("userId is required".into()));
        }
        if id.chars().count() > MAX_USER_ID_LEN {
            return Err(AppError::MalformedRequest(format!(
                "userId must be at most {MAX_USER_ID_LEN} characters"
            )));
        }
        Ok(id)
    }
}

/// 用户状态响应
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusResponse {
    pub balance: f64,
    pub eligible: bool,
    /// 冷却中时为下次可抽时间，否则为空
    pub next_eligible_at: Option<DateTime<Utc>>,
}

/// 发放结果中与奖品类型相关的部分
#[derive(Debug, Clone, PartialEq)]
pub enum PrizePayload {
    Cheat {
        key: String,
        expires_at: DateTime<Utc>,
    },
    Download {
        download_url: String,
    },
    Currency {
        amount: f64,
        new_balance: f64,
    },
    Retry {
        message: String,
    },
}

/// 抽奖（Spin）响应
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    /// 仅 retry 类型为 false
    pub success: bool,
    pub prize_name: String,
    pub prize_kind: PrizeKind,
    pub next_eligible_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SpinResponse {
    pub fn new(
        prize_name: &str,
        prize_kind: PrizeKind,
        next_eligible_at: DateTime<Utc>,
        payload: PrizePayload,
    ) -> Self {
        let mut resp = SpinResponse {
            success: prize_kind != PrizeKind::Retry,
            prize_name: prize_name.to_string(),
            prize_kind,
            next_eligible_at,
            key: None,
            expires_at: None,
            download_url: None,
            amount: None,
            new_balance: None,
            message: None,
        };
        match payload {
            PrizePayload::Cheat { key, expires_at } => {
                resp.key = Some(key);
                resp.expires_at = Some(expires_at);
            }
            PrizePayload::Download { download_url } => resp.download_url = Some(download_url),
            PrizePayload::Currency {
                amount,
                new_balance,
            } => {
                resp.amount = Some(amount);
                resp.new_balance = Some(new_balance);
            }
            PrizePayload::Retry { message } => resp.message = Some(message),
        }
        resp
    }
}

/// 清空历史响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClearHistoryResponse {
    pub success: bool,
}

/// 用户已解锁内容
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlocksResponse {
    /// 未过期的作弊码
    pub cheat_key: Option<CheatKey>,
    pub configs: Vec<Grant>,
    pub scripts: Vec<Grant>,
}
