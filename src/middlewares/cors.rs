use actix_cors::Cors;

/// Mini App 由 Telegram 客户端内嵌页面发起请求，来源不固定
pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        // 允许 X-Telegram-Init-Data 等自定义 Header 通过预检
        .allow_any_header()
        .max_age(3600)
}
