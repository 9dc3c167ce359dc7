use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{Mutation, OnMissing, UserStore};
use crate::entities::{
    PrizeKind, grant_entity as grants, history_entity as history, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{CheatKey, Grant, HistoryEntry, UserRecord};

/// PostgreSQL 存储（sea-orm）。
///
/// 每次 `transact` 开一个数据库事务，对用户行加 `SELECT ... FOR UPDATE`，
/// 同一用户的并发事务在行锁上排队；提交前的任何失败都会回滚。
pub struct DbUserStore {
    pool: DatabaseConnection,
}

impl DbUserStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn lock_user(
        &self,
        txn: &DatabaseTransaction,
        user_id: &str,
    ) -> AppResult<Option<users::Model>> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .lock_exclusive()
            .one(txn)
            .await?;
        Ok(model)
    }

    /// 不存在则插入默认行（并发插入冲突时忽略），随后加锁读取
    async fn lock_or_create_user(
        &self,
        txn: &DatabaseTransaction,
        user_id: &str,
        starting_balance: f64,
    ) -> AppResult<users::Model> {
        if let Some(model) = self.lock_user(txn, user_id).await? {
            return Ok(model);
        }

        let now = Utc::now();
        users::Entity::insert(users::ActiveModel {
            user_id: Set(user_id.to_string()),
            balance: Set(starting_balance),
            eligible: Set(true),
            last_spin_at: Set(None),
            cheat_key: Set(None),
            cheat_key_expires_at: Set(None),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        })
        .on_conflict(
            OnConflict::column(users::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;

        self.lock_user(txn, user_id).await?.ok_or_else(|| {
            AppError::InternalError(format!("User row {user_id} missing after insert"))
        })
    }

    async fn load_record(
        &self,
        txn: &DatabaseTransaction,
        user: users::Model,
    ) -> AppResult<UserRecord> {
        let grant_rows = grants::Entity::find()
            .filter(grants::Column::UserId.eq(user.user_id.clone()))
            .order_by_asc(grants::Column::Id)
            .all(txn)
            .await?;
        let history_rows = history::Entity::find()
            .filter(history::Column::UserId.eq(user.user_id.clone()))
            .order_by_asc(history::Column::Id)
            .all(txn)
            .await?;
        Ok(assemble(user, grant_rows, history_rows))
    }

    async fn persist(
        &self,
        txn: &DatabaseTransaction,
        before: &UserRecord,
        after: &UserRecord,
    ) -> AppResult<()> {
        if user_row_changed(before, after) {
            users::ActiveModel {
                user_id: Set(after.user_id.clone()),
                balance: Set(after.balance),
                eligible: Set(after.eligible),
                last_spin_at: Set(after.last_spin_at),
                cheat_key: Set(after.unlocked_cheat_key.as_ref().map(|k| k.key.clone())),
                cheat_key_expires_at: Set(after.unlocked_cheat_key.as_ref().map(|k| k.expires_at)),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(txn)
            .await?;
        }

        // 解锁记录只增不减
        let new_grants = after
            .unlocked_configs
            .iter()
            .skip(before.unlocked_configs.len())
            .map(|g| (PrizeKind::Config, g))
            .chain(
                after
                    .unlocked_scripts
                    .iter()
                    .skip(before.unlocked_scripts.len())
                    .map(|g| (PrizeKind::LuaScript, g)),
            );
        for (kind, grant) in new_grants {
            grants::ActiveModel {
                user_id: Set(after.user_id.clone()),
                kind: Set(kind),
                seq: Set(grant.id),
                download_url: Set(grant.download_url.clone()),
                granted_at: Set(grant.granted_at),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        let to_insert = match history_delta(&before.history, &after.history) {
            HistoryDelta::Append(tail) => tail,
            HistoryDelta::Replace(all) => {
                history::Entity::delete_many()
                    .filter(history::Column::UserId.eq(after.user_id.clone()))
                    .exec(txn)
                    .await?;
                all
            }
        };
        for entry in to_insert {
            history::ActiveModel {
                user_id: Set(after.user_id.clone()),
                prize_name: Set(entry.prize_name.clone()),
                prize_kind: Set(entry.prize_kind),
                description: Set(entry.description.clone()),
                created_at: Set(entry.timestamp),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl UserStore for DbUserStore {
    async fn load(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        let txn = self.pool.begin().await?;
        let Some(user) = users::Entity::find_by_id(user_id.to_string())
            .one(&txn)
            .await?
        else {
            txn.commit().await?;
            return Ok(None);
        };
        let record = self.load_record(&txn, user).await?;
        txn.commit().await?;
        Ok(Some(record))
    }

    async fn transact<'a>(
        &self,
        user_id: &str,
        on_missing: OnMissing,
        mutation: Mutation<'a>,
    ) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        let user = match on_missing {
            OnMissing::Create { starting_balance } => {
                self.lock_or_create_user(&txn, user_id, starting_balance)
                    .await?
            }
            OnMissing::Reject => match self.lock_user(&txn, user_id).await? {
                Some(user) => user,
                None => {
                    txn.rollback().await?;
                    return Err(AppError::UserNotFound(user_id.to_string()));
                }
            },
        };

        let before = self.load_record(&txn, user).await?;
        let mut working = before.clone();

        // 失败时回滚，懒创建的用户行一并撤销
        if let Err(e) = mutation(&mut working) {
            txn.rollback().await?;
            return Err(e);
        }

        self.persist(&txn, &before, &working).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// 历史的变更方式
#[derive(Debug, PartialEq)]
enum HistoryDelta<'a> {
    /// 只在末尾追加
    Append(&'a [HistoryEntry]),
    /// 被清空或改写，需删除后整体写入
    Replace(&'a [HistoryEntry]),
}

fn history_delta<'a>(before: &[HistoryEntry], after: &'a [HistoryEntry]) -> HistoryDelta<'a> {
    if after.len() >= before.len() && after[..before.len()] == *before {
        HistoryDelta::Append(&after[before.len()..])
    } else {
        HistoryDelta::Replace(after)
    }
}

fn user_row_changed(before: &UserRecord, after: &UserRecord) -> bool {
    before.balance != after.balance
        || before.eligible != after.eligible
        || before.last_spin_at != after.last_spin_at
        || before.unlocked_cheat_key != after.unlocked_cheat_key
}

fn assemble(
    user: users::Model,
    grant_rows: Vec<grants::Model>,
    history_rows: Vec<history::Model>,
) -> UserRecord {
    let unlocked_cheat_key = match (user.cheat_key, user.cheat_key_expires_at) {
        (Some(key), Some(expires_at)) => Some(CheatKey { key, expires_at }),
        _ => None,
    };

    let mut unlocked_configs = Vec::new();
    let mut unlocked_scripts = Vec::new();
    for row in grant_rows {
        let grant = Grant {
            id: row.seq,
            download_url: row.download_url,
            granted_at: row.granted_at,
        };
        match row.kind {
            PrizeKind::Config => unlocked_configs.push(grant),
            PrizeKind::LuaScript => unlocked_scripts.push(grant),
            other => log::warn!("Ignoring grant row {} with kind {other}", row.id),
        }
    }

    let history = history_rows
        .into_iter()
        .map(|row| HistoryEntry {
            timestamp: row.created_at,
            prize_name: row.prize_name,
            prize_kind: row.prize_kind,
            description: row.description,
        })
        .collect();

    UserRecord {
        user_id: user.user_id,
        balance: user.balance,
        eligible: user.eligible,
        last_spin_at: user.last_spin_at,
        unlocked_cheat_key,
        unlocked_configs,
        unlocked_scripts,
        history,
    }
}
