use chrono::{DateTime, Duration, Utc};

use crate::models::UserRecord;

/// 冷却窗口（小时）
pub const COOLDOWN_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    /// 仅冷却中时有值
    pub next_eligible_at: Option<DateTime<Utc>>,
}

pub fn next_eligible_at(last_spin_at: DateTime<Utc>) -> DateTime<Utc> {
    last_spin_at + Duration::hours(COOLDOWN_HOURS)
}

/// 计算当前是否可抽，并刷新 `user.eligible`。
///
/// 读取即修复：冷却结束后无需再抽一次，状态查询就会把锁定状态改回可用，
/// 因此不需要后台定时任务。
pub fn check_and_refresh(user: &mut UserRecord, now: DateTime<Utc>) -> Eligibility {
    let result = match user.last_spin_at {
        None => Eligibility {
            eligible: true,
            next_eligible_at: None,
        },
        Some(last) => {
            let next = next_eligible_at(last);
            if now >= next {
                Eligibility {
                    eligible: true,
                    next_eligible_at: None,
                }
            } else {
                Eligibility {
                    eligible: false,
                    next_eligible_at: Some(next),
                }
            }
        }
    };
    user.eligible = result.eligible;
    result
}

/// 距下次可抽的剩余小时数（向上取整）
pub fn hours_remaining(next: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (next - now).num_seconds().max(0);
    (secs + 3599) / 3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_never_spun_is_eligible() {
        let mut user = UserRecord::new("1", 10.0);
        let gate = check_and_refresh(&mut user, now());
        assert!(gate.eligible);
        assert_eq!(gate.next_eligible_at, None);
        assert!(user.eligible);
    }

    #[test]
    fn test_within_cooldown_is_locked() {
        let mut user = UserRecord::new("1", 10.0);
        user.last_spin_at = Some(now() - Duration::hours(3));
        let gate = check_and_refresh(&mut user, now());
        assert!(!gate.eligible);
        assert_eq!(gate.next_eligible_at, Some(now() + Duration::hours(21)));
        assert!(!user.eligible);
    }

    #[test]
    fn test_exact_boundary_is_eligible() {
        let mut user = UserRecord::new("1", 10.0);
        user.last_spin_at = Some(now() - Duration::hours(COOLDOWN_HOURS));
        assert!(check_and_refresh(&mut user, now()).eligible);
    }

    #[test]
    fn test_stale_lock_is_healed_on_read() {
        let mut user = UserRecord::new("1", 10.0);
        user.last_spin_at = Some(now() - Duration::hours(30));
        user.eligible = false;
        let gate = check_and_refresh(&mut user, now());
        assert!(gate.eligible);
        assert!(user.eligible);
    }

    #[test]
    fn test_hours_remaining_rounds_up() {
        assert_eq!(hours_remaining(now() + Duration::minutes(61), now()), 2);
        assert_eq!(hours_remaining(now() + Duration::hours(24), now()), 24);
        assert_eq!(hours_remaining(now() - Duration::hours(1), now()), 0);
    }
}
