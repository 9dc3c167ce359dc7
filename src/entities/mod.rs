pub mod prize_kind;
pub mod roulette_grants;
pub mod roulette_history;
pub mod roulette_users;

pub use prize_kind::PrizeKind;
pub use roulette_grants as grant_entity;
pub use roulette_history as history_entity;
pub use roulette_users as user_entity;
