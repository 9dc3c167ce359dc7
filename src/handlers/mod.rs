pub mod roulette;

pub use roulette::roulette_config;

use crate::error::AppError;
use actix_web::web;

/// JSON 解析失败统一映射为 malformed_request
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| AppError::MalformedRequest(err.to_string()).into())
}
