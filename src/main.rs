use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use roulette_backend::{
    config::Config,
    database::{DbUserStore, MemoryUserStore, UserStore, create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::RouletteService,
    swagger::swagger_config,
    utils::InitDataVerifier,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");
    let prizes = config.prize_table().expect("Invalid prize table");

    // 有数据库 URL 时使用 PostgreSQL，否则使用进程内存储
    let store: Arc<dyn UserStore> = match config.database.url.as_deref() {
        Some(url) => {
            let pool = create_pool(&config.database, url)
                .await
                .expect("Failed to create database connection pool");
            run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            Arc::new(DbUserStore::new(pool))
        }
        None => {
            log::warn!("No database configured, user state is kept in memory only");
            Arc::new(MemoryUserStore::new())
        }
    };

    if !config.auth.require_signature {
        log::warn!("Telegram init data signature check is disabled");
    }
    let verifier = InitDataVerifier::new(
        &config.auth.bot_token,
        config.auth.require_signature,
        config.auth.init_data_max_age_secs,
    );

    let roulette_service =
        RouletteService::new(store, prizes, config.roulette.starting_balance);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(AuthMiddleware::new(verifier.clone()))
            .wrap(create_cors())
            .app_data(web::Data::new(roulette_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api")
                    .app_data(handlers::json_config())
                    .configure(handlers::roulette_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
