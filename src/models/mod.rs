pub mod prize;
pub mod roulette;
pub mod user_record;

pub use prize::*;
pub use roulette::*;
pub use user_record::*;
