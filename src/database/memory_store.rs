use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Mutation, OnMissing, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::UserRecord;

type Slot = Arc<Mutex<Option<UserRecord>>>;

/// 进程内存储（未配置数据库时使用，测试也用它）。
///
/// 每个用户一把 tokio Mutex；外层 map 锁只在取槽位时短暂持有，
/// 因此不同用户的事务不会互相阻塞。
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取用户槽位；仅在允许创建时才插入新槽位
    async fn slot(&self, user_id: &str, on_missing: OnMissing) -> Option<Slot> {
        let mut slots = self.slots.lock().await;
        match on_missing {
            OnMissing::Create { .. } => {
                Some(slots.entry(user_id.to_string()).or_default().clone())
            }
            OnMissing::Reject => slots.get(user_id).cloned(),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        let slot = {
            let slots = self.slots.lock().await;
            slots.get(user_id).cloned()
        };
        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(None),
        }
    }

    async fn transact<'a>(
        &self,
        user_id: &str,
        on_missing: OnMissing,
        mutation: Mutation<'a>,
    ) -> AppResult<()> {
        let Some(slot) = self.slot(user_id, on_missing).await else {
            return Err(AppError::UserNotFound(user_id.to_string()));
        };
        let mut guard = slot.lock().await;

        // 在副本上修改，提交时整体替换
        let mut working = match (guard.as_ref(), on_missing) {
            (Some(existing), _) => existing.clone(),
            (None, OnMissing::Create { starting_balance }) => {
                UserRecord::new(user_id, starting_balance)
            }
            (None, OnMissing::Reject) => {
                return Err(AppError::UserNotFound(user_id.to_string()));
            }
        };

        mutation(&mut working)?;
        *guard = Some(working);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATE: OnMissing = OnMissing::Create {
        starting_balance: 10.0,
    };

    #[tokio::test]
    async fn test_write_commits_whole_record() {
        let store = MemoryUserStore::new();
        store
            .transact(
                "1",
                CREATE,
                Box::new(|user: &mut UserRecord| {
                    user.balance += 5.0;
                    user.eligible = false;
                    Ok(())
                }),
            )
            .await
            .unwrap();

        let user = store.load("1").await.unwrap().unwrap();
        assert_eq!(user.balance, 15.0);
        assert!(!user.eligible);
    }

    #[tokio::test]
    async fn test_error_leaves_no_state() {
        let store = MemoryUserStore::new();
        let err = store
            .transact(
                "1",
                CREATE,
                Box::new(|user: &mut UserRecord| {
                    user.balance = 99.0;
                    Err(AppError::InternalError("fulfillment failed".into()))
                }),
            )
            .await;
        assert!(err.is_err());
        assert!(store.load("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reject_missing_user() {
        let store = MemoryUserStore::new();
        let err = store
            .transact(
                "ghost",
                OnMissing::Reject,
                Box::new(|_: &mut UserRecord| Ok(())),
            )
            .await;
        assert!(matches!(err, Err(AppError::UserNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_rejected_users_leave_no_slots() {
        let store = MemoryUserStore::new();
        for i in 0..100 {
            let err = store
                .transact(
                    &format!("ghost-{i}"),
                    OnMissing::Reject,
                    Box::new(|user: &mut UserRecord| {
                        user.history.clear();
                        Ok(())
                    }),
                )
                .await;
            assert!(matches!(err, Err(AppError::UserNotFound(_))));
        }
        assert_eq!(store.slots.lock().await.len(), 0);

        store
            .transact("real", CREATE, Box::new(|_: &mut UserRecord| Ok(())))
            .await
            .unwrap();
        assert_eq!(store.slots.lock().await.len(), 1);
    }
}
