pub mod connection;
pub mod memory_store;
pub mod pg_store;

pub use connection::*;
pub use memory_store::MemoryUserStore;
pub use pg_store::DbUserStore;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::UserRecord;

/// 用户不存在时的处理方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnMissing {
    /// 以默认余额创建（首次交互懒创建）
    Create { starting_balance: f64 },
    /// 返回 `UserNotFound`
    Reject,
}

/// 在单用户原子边界内执行的修改；返回 Ok 时提交，返回 Err 时整个事务放弃
pub type Mutation<'a> = Box<dyn FnOnce(&mut UserRecord) -> AppResult<()> + Send + 'a>;

/// 以用户 ID 为键的事务性记录存储。
///
/// `transact` 对同一用户串行执行：闭包看到的是最新已提交状态，
/// 闭包返回 `Ok` 时整条记录（余额、冷却、解锁、历史）一次性提交，
/// 否则不留下任何修改。不同用户之间互不阻塞。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 只读快照
    async fn load(&self, user_id: &str) -> AppResult<Option<UserRecord>>;

    /// 读-改-写
    async fn transact<'a>(
        &self,
        user_id: &str,
        on_missing: OnMissing,
        mutation: Mutation<'a>,
    ) -> AppResult<()>;
}
