use chrono::{DateTime, Duration, Utc};

use crate::entities::PrizeKind;
use crate::models::{CheatKey, Grant, HistoryEntry, PrizeDefinition, PrizePayload, UserRecord};
use crate::services::prize_table::{DEFAULT_CONFIG_URL, DEFAULT_SCRIPT_URL};
use crate::utils::generate_cheat_key;

/// 作弊码有效期（天）
pub const CHEAT_KEY_DAYS: i64 = 30;

pub const RETRY_MESSAGE: &str = "Try again tomorrow!";

/// 一次发放的结果：历史记录 + 返回给前端的奖品详情
#[derive(Debug, Clone, PartialEq)]
pub struct Fulfillment {
    pub entry: HistoryEntry,
    pub payload: PrizePayload,
}

/// 将奖品效果写入用户状态:
/// - Cheat -> 生成新作弊码，覆盖旧码，30 天有效
/// - Config / LuaScript -> 追加解锁记录，编号为已有数量 + 1
/// - Currency -> 增加余额
/// - Retry -> 无发放
///
/// 冷却时间由调用方在发放前写入，这里只处理奖品本身。
pub fn apply(user: &mut UserRecord, prize: &PrizeDefinition, now: DateTime<Utc>) -> Fulfillment {
    let (description, payload) = match prize.kind {
        PrizeKind::Cheat => {
            let key = CheatKey {
                key: generate_cheat_key(),
                expires_at: now + Duration::days(CHEAT_KEY_DAYS),
            };
            let payload = PrizePayload::Cheat {
                key: key.key.clone(),
                expires_at: key.expires_at,
            };
            user.unlocked_cheat_key = Some(key);
            (format!("Cheat subscription for {CHEAT_KEY_DAYS} days"), payload)
        }
        PrizeKind::Config => {
            let url = grant_url(prize, DEFAULT_CONFIG_URL);
            push_grant(&mut user.unlocked_configs, &url, now);
            (
                "Premium config unlocked".to_string(),
                PrizePayload::Download { download_url: url },
            )
        }
        PrizeKind::LuaScript => {
            let url = grant_url(prize, DEFAULT_SCRIPT_URL);
            push_grant(&mut user.unlocked_scripts, &url, now);
            (
                "Lua script unlocked".to_string(),
                PrizePayload::Download { download_url: url },
            )
        }
        PrizeKind::Currency => {
            let amount = prize.amount.unwrap_or(0.0).max(0.0);
            user.balance += amount;
            (
                format!("{amount} units of currency"),
                PrizePayload::Currency {
                    amount,
                    new_balance: user.balance,
                },
            )
        }
        PrizeKind::Retry => (
            RETRY_MESSAGE.to_string(),
            PrizePayload::Retry {
                message: RETRY_MESSAGE.to_string(),
            },
        ),
    };

    Fulfillment {
        entry: HistoryEntry {
            timestamp: now,
            prize_name: prize.name.clone(),
            prize_kind: prize.kind,
            description,
        },
        payload,
    }
}

fn grant_url(prize: &PrizeDefinition, fallback: &str) -> String {
    prize
        .download_url
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

fn push_grant(grants: &mut Vec<Grant>, url: &str, now: DateTime<Utc>) {
    grants.push(Grant {
        id: grants.len() as i64 + 1,
        download_url: url.to_string(),
        granted_at: now,
    });
}
