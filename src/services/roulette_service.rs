use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::database::{OnMissing, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ClearHistoryResponse, HistoryEntry, PrizeResponse, SpinResponse, UnlocksResponse, UserRecord,
    UserStatusResponse,
};
use crate::services::{PrizeTable, RandomSource, eligibility, fulfillment, selector};

/// 历史接口最多返回的条数
pub const HISTORY_LIMIT: usize = 10;

#[derive(Clone)]
pub struct RouletteService {
    store: Arc<dyn UserStore>,
    prizes: PrizeTable,
    starting_balance: f64,
}

impl RouletteService {
    pub fn new(store: Arc<dyn UserStore>, prizes: PrizeTable, starting_balance: f64) -> Self {
        Self {
            store,
            prizes,
            starting_balance,
        }
    }

    fn create_missing(&self) -> OnMissing {
        OnMissing::Create {
            starting_balance: self.starting_balance,
        }
    }

    /// 当前奖品表（含概率）
    pub fn list_prizes(&self) -> Vec<PrizeResponse> {
        self.prizes.to_responses()
    }

    /// 获取用户状态（不存在则初始化）
    /// 冷却已结束时顺带把锁定状态修复为可用
    pub async fn get_status(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UserStatusResponse> {
        let mut status = None;
        self.store
            .transact(
                user_id,
                self.create_missing(),
                Box::new(|user: &mut UserRecord| {
                    let gate = eligibility::check_and_refresh(user, now);
                    status = Some(UserStatusResponse {
                        balance: user.balance,
                        eligible: gate.eligible,
                        next_eligible_at: gate.next_eligible_at,
                    });
                    Ok(())
                }),
            )
            .await?;

        status.ok_or_else(|| AppError::InternalError("Status read produced no result".into()))
    }

    /// 抽奖 (Spin)
    ///
    /// 逻辑（整体在单用户事务内完成）:
    /// 1. 加载或初始化用户
    /// 2. 冷却检查，未结束则拒绝且不做任何修改
    /// 3. 先记录本次抽奖时间并锁定，发放失败同样消耗当日次数
    /// 4. 按权重抽取奖品
    /// 5. 发放奖品并追加历史
    /// 6. 一次性提交
    pub async fn spin(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> AppResult<SpinResponse> {
        let prizes = &self.prizes;
        let mut result = None;

        self.store
            .transact(
                user_id,
                self.create_missing(),
                Box::new(|user: &mut UserRecord| {
                    let gate = eligibility::check_and_refresh(user, now);
                    if !gate.eligible {
                        let next_eligible_at = gate.next_eligible_at.unwrap_or(now);
                        return Err(AppError::CooldownActive {
                            next_eligible_at,
                            hours_remaining: eligibility::hours_remaining(next_eligible_at, now),
                        });
                    }

                    user.last_spin_at = Some(now);
                    user.eligible = false;

                    let prize = selector::select(prizes, rng);
                    let fulfilled = fulfillment::apply(user, prize, now);
                    user.history.push(fulfilled.entry);

                    result = Some(SpinResponse::new(
                        &prize.name,
                        prize.kind,
                        eligibility::next_eligible_at(now),
                        fulfilled.payload,
                    ));
                    Ok(())
                }),
            )
            .await
            .inspect_err(|e| {
                if let AppError::CooldownActive {
                    next_eligible_at, ..
                } = e
                {
                    log::debug!("User {user_id} is on cooldown until {next_eligible_at}");
                }
            })?;

        let result = result
            .ok_or_else(|| AppError::InternalError("Spin produced no result".into()))?;
        log::info!(
            "User {user_id} spun the roulette: {} ({})",
            result.prize_name,
            result.prize_kind
        );
        Ok(result)
    }

    /// 最近历史，按时间倒序，最多 10 条；用户不存在时为空
    pub async fn get_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
        let user = self.store.load(user_id).await?;
        Ok(user
            .map(|u| u.recent_history(HISTORY_LIMIT))
            .unwrap_or_default())
    }

    /// 清空历史；不影响余额、冷却与解锁记录
    pub async fn clear_history(&self, user_id: &str) -> AppResult<ClearHistoryResponse> {
        self.store
            .transact(
                user_id,
                OnMissing::Reject,
                Box::new(|user: &mut UserRecord| {
                    user.history.clear();
                    Ok(())
                }),
            )
            .await?;
        log::info!("User {user_id} cleared roulette history");
        Ok(ClearHistoryResponse { success: true })
    }

    /// 用户已解锁内容（过期的作弊码不返回）
    pub async fn get_unlocks(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UnlocksResponse> {
        let user = self
            .store
            .load(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        Ok(UnlocksResponse {
            cheat_key: user.active_cheat_key(now).cloned(),
            configs: user.unlocked_configs,
            scripts: user.unlocked_scripts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::entities::PrizeKind;
    use crate::models::PrizeDefinition;
    use crate::services::selector::tests::FixedDraw;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    /// {Cheat:2, Currency(100):20, Config:5, Retry:30}
    fn table() -> PrizeTable {
        PrizeTable::new(vec![
            PrizeDefinition::new("NEVERLOSE Cheat", PrizeKind::Cheat, 2),
            PrizeDefinition::currency("100 NLE", 20, 100.0),
            PrizeDefinition::new("Premium Config", PrizeKind::Config, 5),
            PrizeDefinition::new("Try again", PrizeKind::Retry, 30),
        ])
        .unwrap()
    }

    fn service() -> (RouletteService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let svc = RouletteService::new(store.clone(), table(), 10.0);
        (svc, store)
    }

    #[tokio::test]
    async fn test_fresh_user_status_and_spin() {
        let (svc, _) = service();
        let status = svc.get_status("1", now()).await.unwrap();
        assert_eq!(status.balance, 10.0);
        assert!(status.eligible);
        assert!(status.next_eligible_at.is_none());

        let result = svc.spin("1", now(), &mut FixedDraw(22)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.prize_kind, PrizeKind::Currency);
        assert_eq!(result.amount, Some(100.0));
        assert_eq!(result.new_balance, Some(110.0));
        assert_eq!(result.next_eligible_at, now() + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_retry_is_unsuccessful_but_consumes_attempt() {
        let (svc, _) = service();
        let result = svc.spin("1", now(), &mut FixedDraw(57)).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.prize_kind, PrizeKind::Retry);
        assert!(result.message.is_some());

        let status = svc.get_status("1", now()).await.unwrap();
        assert!(!status.eligible);
        assert_eq!(status.balance, 10.0);
    }

    #[tokio::test]
    async fn test_second_spin_within_cooldown_rejected_without_changes() {
        let (svc, store) = service();
        svc.spin("1", now(), &mut FixedDraw(22)).await.unwrap();
        let before = store.load("1").await.unwrap().unwrap();

        let later = now() + Duration::hours(23);
        let err = svc.spin("1", later, &mut FixedDraw(22)).await.unwrap_err();
        match err {
            AppError::CooldownActive {
                next_eligible_at,
                hours_remaining,
            } => {
                assert_eq!(next_eligible_at, now() + Duration::hours(24));
                assert_eq!(hours_remaining, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let after = store.load("1").await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(after.balance, 110.0);
        assert_eq!(after.history.len(), 1);
    }

    #[tokio::test]
    async fn test_status_heals_after_cooldown() {
        let (svc, store) = service();
        svc.spin("1", now(), &mut FixedDraw(0)).await.unwrap();
        let locked = svc.get_status("1", now() + Duration::hours(1)).await.unwrap();
        assert!(!locked.eligible);
        assert_eq!(locked.next_eligible_at, Some(now() + Duration::hours(24)));

        let later = now() + Duration::hours(25);
        let status = svc.get_status("1", later).await.unwrap();
        assert!(status.eligible);
        assert!(status.next_eligible_at.is_none());
        // 读取即写回
        assert!(store.load("1").await.unwrap().unwrap().eligible);

        let again = svc.spin("1", later, &mut FixedDraw(0)).await.unwrap();
        assert_eq!(again.prize_kind, PrizeKind::Cheat);
        assert!(again.key.unwrap().starts_with("NL-"));
    }

    #[tokio::test]
    async fn test_history_capped_and_descending() {
        let (svc, _) = service();
        for day in 0..13 {
            let at = now() + Duration::days(day);
            svc.spin("1", at, &mut FixedDraw(57)).await.unwrap();
        }

        let history = svc.get_history("1").await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].timestamp, now() + Duration::days(12));
        assert!(history.windows(2).all(|w| w[0].timestamp > w[1].timestamp));

        assert!(svc.get_history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history_keeps_everything_else() {
        let (svc, store) = service();
        svc.spin("1", now(), &mut FixedDraw(23)).await.unwrap();
        let before = store.load("1").await.unwrap().unwrap();
        assert_eq!(before.unlocked_configs.len(), 1);

        let resp = svc.clear_history("1").await.unwrap();
        assert!(resp.success);

        let after = store.load("1").await.unwrap().unwrap();
        assert!(after.history.is_empty());
        assert_eq!(after.balance, before.balance);
        assert_eq!(after.eligible, before.eligible);
        assert_eq!(after.last_spin_at, before.last_spin_at);
        assert_eq!(after.unlocked_configs, before.unlocked_configs);

        assert!(matches!(
            svc.clear_history("ghost").await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unlocks() {
        let (svc, _) = service();
        assert!(matches!(
            svc.get_unlocks("1", now()).await,
            Err(AppError::UserNotFound(_))
        ));

        svc.spin("1", now(), &mut FixedDraw(1)).await.unwrap();
        let unlocks = svc.get_unlocks("1", now()).await.unwrap();
        assert!(unlocks.cheat_key.is_some());
        assert!(unlocks.configs.is_empty());

        let expired = svc
            .get_unlocks("1", now() + Duration::days(31))
            .await
            .unwrap();
        assert!(expired.cheat_key.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_spins_single_winner() {
        let (svc, store) = service();
        let attempts = 32;

        let handles: Vec<_> = (0..attempts)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(i);
                    svc.spin("same-user", now(), &mut rng).await
                })
            })
            .collect();

        let mut wins = 0;
        let mut cooldowns = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(AppError::CooldownActive { .. }) => cooldowns += 1,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(cooldowns, attempts - 1);

        let user = store.load("same-user").await.unwrap().unwrap();
        assert_eq!(user.history.len(), 1);
        let credited = if user.history[0].prize_kind == PrizeKind::Currency {
            100.0
        } else {
            0.0
        };
        assert_eq!(user.balance, 10.0 + credited);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_users_spin_independently() {
        let (svc, _) = service();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.spin(&format!("user-{i}"), now(), &mut FixedDraw(57)).await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }
}
