use actix_web::web;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::collections::BTreeMap;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Telegram WebApp 派生密钥所用的固定 key
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// 前端携带签名 init data 的请求头
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

/// auth_date 允许超前服务器时间的秒数
const CLOCK_SKEW_SECS: i64 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data is not a valid query string")]
    Malformed,
    #[error("init data signature mismatch")]
    BadSignature,
    #[error("init data auth_date is missing or out of range")]
    Expired,
    #[error("init data carries no user id")]
    MissingUser,
}

/// 签名校验通过后得到的 Telegram 身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramIdentity {
    pub user_id: String,
    pub auth_date: DateTime<Utc>,
}

/// Telegram WebApp init data 签名校验。
///
/// 校验串为除 `hash` 外所有字段按 key 排序后的 `key=value`，以换行拼接；
/// 密钥为 HMAC-SHA256("WebAppData", bot_token)。
/// `require_signature = false` 时（本地调试）中间件不调用校验。
#[derive(Clone)]
pub struct InitDataVerifier {
    secret_key: Vec<u8>,
    require_signature: bool,
    max_age: Duration,
}

impl InitDataVerifier {
    pub fn new(bot_token: &str, require_signature: bool, max_age_secs: i64) -> Self {
        Self {
            secret_key: hmac_sha256(WEB_APP_DATA_KEY, bot_token.as_bytes()),
            require_signature,
            max_age: Duration::seconds(max_age_secs),
        }
    }

    pub fn is_required(&self) -> bool {
        self.require_signature
    }

    /// 校验 URL 编码的 init data：签名、auth_date 时效，并取出 `user.id`
    pub fn authenticate(
        &self,
        init_data: &str,
        now: DateTime<Utc>,
    ) -> Result<TelegramIdentity, InitDataError> {
        let fields = web::Query::<BTreeMap<String, String>>::from_query(init_data)
            .map_err(|_| InitDataError::Malformed)?
            .into_inner();

        if !self.verify_fields(&fields) {
            return Err(InitDataError::BadSignature);
        }

        let auth_date = fields
            .get("auth_date")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(InitDataError::Expired)?;
        let too_old = now - auth_date > self.max_age;
        let from_future = auth_date - now > Duration::seconds(CLOCK_SKEW_SECS);
        if too_old || from_future {
            return Err(InitDataError::Expired);
        }

        let user_id = fields
            .get("user")
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|user| match user.get("id") {
                Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Some(n.to_string()),
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .ok_or(InitDataError::MissingUser)?;

        Ok(TelegramIdentity { user_id, auth_date })
    }

    /// 只校验签名；缺少 hash 或 hash 非十六进制均视为失败
    pub fn verify_fields(&self, fields: &BTreeMap<String, String>) -> bool {
        let Some(expected) = fields.get("hash") else {
            return false;
        };
        let Ok(expected) = hex::decode(expected) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret_key) else {
            return false;
        };
        mac.update(data_check_string(fields).as_bytes());
        // 常量时间比较
        mac.verify_slice(&expected).is_ok()
    }

    /// 计算字段的签名（十六进制），与 Telegram 客户端生成的 hash 一致
    pub fn sign(&self, fields: &BTreeMap<String, String>) -> String {
        hex::encode(hmac_sha256(
            &self.secret_key,
            data_check_string(fields).as_bytes(),
        ))
    }
}

/// 构造待签名串（BTreeMap 保证按 key 排序）
pub fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    // HMAC 接受任意长度的密钥，这里不会失败
    match HmacSha256::new_from_slice(key) {
        Ok(mut mac) => {
            mac.update(msg);
            mac.finalize().into_bytes().to_vec()
        }
        Err(_) => Vec::new(),
    }
}
