pub mod init_data;
pub mod key_generator;

pub use init_data::*;
pub use key_generator::generate_cheat_key;
