pub mod eligibility;
pub mod fulfillment;
pub mod prize_table;
pub mod roulette_service;
pub mod selector;

pub use eligibility::{COOLDOWN_HOURS, Eligibility};
pub use fulfillment::{CHEAT_KEY_DAYS, Fulfillment};
pub use prize_table::PrizeTable;
pub use roulette_service::*;
pub use selector::{RandomSource, select};
