use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};
use crate::models::PrizeDefinition;
use crate::services::PrizeTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub roulette: RouletteConfig,
    /// 为空时使用内置奖品表
    #[serde(default)]
    pub prizes: Vec<PrizeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 未配置时使用进程内存储
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub bot_token: String,
    /// 关闭后不校验 Telegram 签名（仅本地调试）
    #[serde(default = "default_true")]
    pub require_signature: bool,
    /// init data 中 auth_date 的最长有效期（秒）
    #[serde(default = "default_init_data_max_age")]
    pub init_data_max_age_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            require_signature: true,
            init_data_max_age_secs: default_init_data_max_age(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouletteConfig {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_init_data_max_age() -> i64 {
    86_400
}

fn default_starting_balance() -> f64 {
    10.0
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("Config file {config_path} not found, using environment variables");
                Self::from_defaults()
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_overrides(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("解析配置文件失败: {e}")))
    }

    fn from_defaults() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            roulette: RouletteConfig::default(),
            prizes: Vec::new(),
        }
    }

    fn apply_overrides(&mut self, get_env: impl Fn(&str) -> Option<String>) {
        fn parse_into<T: std::str::FromStr>(value: Option<String>, target: &mut T) {
            if let Some(v) = value
                && let Ok(parsed) = v.parse()
            {
                *target = parsed;
            }
        }

        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        parse_into(get_env("SERVER_PORT"), &mut self.server.port);
        if let Some(v) = get_env("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(v);
        }
        parse_into(
            get_env("DB_MAX_CONNECTIONS"),
            &mut self.database.max_connections,
        );
        if let Some(v) = get_env("BOT_TOKEN") {
            self.auth.bot_token = v;
        }
        parse_into(
            get_env("REQUIRE_SIGNATURE"),
            &mut self.auth.require_signature,
        );
        parse_into(
            get_env("INIT_DATA_MAX_AGE"),
            &mut self.auth.init_data_max_age_secs,
        );
        parse_into(
            get_env("STARTING_BALANCE"),
            &mut self.roulette.starting_balance,
        );
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.auth.require_signature && self.auth.bot_token.trim().is_empty() {
            return Err(AppError::ConfigError(
                "auth.bot_token is required when auth.require_signature is enabled".into(),
            ));
        }
        if self.auth.init_data_max_age_secs <= 0 {
            return Err(AppError::ConfigError(
                "auth.init_data_max_age_secs must be positive".into(),
            ));
        }
        if !self.roulette.starting_balance.is_finite() || self.roulette.starting_balance < 0.0 {
            return Err(AppError::ConfigError(
                "roulette.starting_balance must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// 构建奖品表；未配置 `[[prizes]]` 时使用内置表
    pub fn prize_table(&self) -> AppResult<PrizeTable> {
        if self.prizes.is_empty() {
            Ok(PrizeTable::default())
        } else {
            PrizeTable::new(self.prizes.clone())
        }
    }
}
