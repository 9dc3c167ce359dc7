use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::PrizeKind;

/// 作弊码（覆盖写，带过期时间）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheatKey {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// 配置 / 脚本解锁记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    /// 用户内顺序编号，从 1 开始
    pub id: i64,
    pub download_url: String,
    pub granted_at: DateTime<Utc>,
}

/// 历史记录，追加后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub prize_name: String,
    pub prize_kind: PrizeKind,
    pub description: String,
}

/// 用户的权威状态，只能通过 `UserStore` 在单用户原子边界内读写
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub balance: f64,
    /// 缓存字段，读取时由冷却检查刷新
    pub eligible: bool,
    pub last_spin_at: Option<DateTime<Utc>>,
    pub unlocked_cheat_key: Option<CheatKey>,
    pub unlocked_configs: Vec<Grant>,
    pub unlocked_scripts: Vec<Grant>,
    /// 存储顺序：最旧在前
    pub history: Vec<HistoryEntry>,
}

impl UserRecord {
    pub fn new(user_id: &str, starting_balance: f64) -> Self {
        Self {
            user_id: user_id.to_string(),
            balance: starting_balance,
            eligible: true,
            last_spin_at: None,
            unlocked_cheat_key: None,
            unlocked_configs: Vec::new(),
            unlocked_scripts: Vec::new(),
            history: Vec::new(),
        }
    }

    /// 按时间倒序返回最近 `limit` 条历史；同一时间戳时后写入的在前
    pub fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self.history.iter().rev().cloned().collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }

    /// 未过期的作弊码
    pub fn active_cheat_key(&self, now: DateTime<Utc>) -> Option<&CheatKey> {
        self.unlocked_cheat_key
            .as_ref()
            .filter(|k| k.expires_at > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(ts: DateTime<Utc>, name: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp: ts,
            prize_name: name.to_string(),
            prize_kind: PrizeKind::Retry,
            description: "Try again tomorrow!".to_string(),
        }
    }

    #[test]
    fn test_recent_history_sorted_and_capped() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut user = UserRecord::new("1", 10.0);
        // 乱序写入
        for day in [5, 1, 12, 3, 9, 0, 7, 11, 2, 8, 4, 10, 6] {
            user.history
                .push(entry(base + Duration::days(day), &format!("d{day}")));
        }

        let recent = user.recent_history(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].prize_name, "d12");
        assert_eq!(recent[9].prize_name, "d3");
        assert!(recent.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[test]
    fn test_recent_history_ties_newest_insert_first() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut user = UserRecord::new("1", 10.0);
        user.history.push(entry(ts, "first"));
        user.history.push(entry(ts, "second"));

        let recent = user.recent_history(10);
        assert_eq!(recent[0].prize_name, "second");
        assert_eq!(recent[1].prize_name, "first");
    }

    #[test]
    fn test_active_cheat_key_respects_expiry() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut user = UserRecord::new("1", 10.0);
        user.unlocked_cheat_key = Some(CheatKey {
            key: "NL-0123456789ABCDEF".to_string(),
            expires_at: now + Duration::days(1),
        });
        assert!(user.active_cheat_key(now).is_some());
        assert!(user.active_cheat_key(now + Duration::days(2)).is_none());
    }
}
