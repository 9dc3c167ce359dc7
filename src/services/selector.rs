use rand::Rng;
use rand::rngs::StdRng;

use crate::models::PrizeDefinition;
use crate::services::PrizeTable;

/// 抽奖随机源
pub trait RandomSource: Send {
    /// 在闭区间 [0, upper] 内均匀取整数
    fn draw_inclusive(&mut self, upper: u64) -> u64;
}

impl RandomSource for StdRng {
    fn draw_inclusive(&mut self, upper: u64) -> u64 {
        self.gen_range(0..=upper)
    }
}

/// 按权重抽取一个奖品。
///
/// r 在 [0, total] 闭区间内取值，按表顺序累加权重，返回第一个 `r <= cumulative` 的奖品；
/// 边界值归属于靠前的奖品，r == total 落在最后一个奖品上。
pub fn select<'a>(table: &'a PrizeTable, rng: &mut dyn RandomSource) -> &'a PrizeDefinition {
    let roll = rng.draw_inclusive(table.total_weight());
    let mut cumulative = 0u64;
    for prize in table.definitions() {
        cumulative += u64::from(prize.weight);
        if roll <= cumulative {
            return prize;
        }
    }
    table.last()
}
