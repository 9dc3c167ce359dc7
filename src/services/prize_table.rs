use std::sync::Arc;

use crate::entities::PrizeKind;
use crate::error::{AppError, AppResult};
use crate::models::{PrizeDefinition, PrizeResponse};

pub const DEFAULT_CONFIG_URL: &str = "https://neverlose.cc/roulette/config.zip";
pub const DEFAULT_SCRIPT_URL: &str = "https://neverlose.cc/roulette/script.lua";

/// 奖品表：启动时加载并校验，之后只读
#[derive(Debug, Clone)]
pub struct PrizeTable {
    definitions: Arc<[PrizeDefinition]>,
}

impl PrizeTable {
    /// 校验并构建奖品表:
    /// - 至少一个奖品
    /// - 权重必须为正
    /// - 仅 currency 类型带金额且金额非负
    /// - config / lua_script 缺省下载地址补全
    pub fn new(definitions: Vec<PrizeDefinition>) -> AppResult<Self> {
        if definitions.is_empty() {
            return Err(AppError::ConfigError("Prize table is empty".into()));
        }

        let mut checked = Vec::with_capacity(definitions.len());
        for mut def in definitions {
            if def.weight == 0 {
                return Err(AppError::ConfigError(format!(
                    "Prize '{}' must have a positive weight",
                    def.name
                )));
            }
            match (def.kind, def.amount) {
                (PrizeKind::Currency, Some(amount)) if amount.is_finite() && amount >= 0.0 => {}
                (PrizeKind::Currency, _) => {
                    return Err(AppError::ConfigError(format!(
                        "Currency prize '{}' needs a non-negative amount",
                        def.name
                    )));
                }
                (_, Some(_)) => {
                    return Err(AppError::ConfigError(format!(
                        "Prize '{}' of kind {} must not carry an amount",
                        def.name, def.kind
                    )));
                }
                _ => {}
            }
            match def.kind {
                PrizeKind::Config if def.download_url.is_none() => {
                    def.download_url = Some(DEFAULT_CONFIG_URL.to_string());
                }
                PrizeKind::LuaScript if def.download_url.is_none() => {
                    def.download_url = Some(DEFAULT_SCRIPT_URL.to_string());
                }
                PrizeKind::Config | PrizeKind::LuaScript => {}
                _ => def.download_url = None,
            }
            checked.push(def);
        }

        Ok(Self {
            definitions: checked.into(),
        })
    }

    /// 按声明顺序的奖品列表
    pub fn definitions(&self) -> &[PrizeDefinition] {
        &self.definitions
    }

    pub fn total_weight(&self) -> u64 {
        self.definitions.iter().map(|d| u64::from(d.weight)).sum()
    }

    /// 表中最后一个奖品（构造时已保证非空）
    pub fn last(&self) -> &PrizeDefinition {
        &self.definitions[self.definitions.len() - 1]
    }

    /// 带概率(百分比)的展示列表
    pub fn to_responses(&self) -> Vec<PrizeResponse> {
        let total = self.total_weight() as f64;
        self.definitions
            .iter()
            .map(|d| PrizeResponse {
                name: d.name.clone(),
                kind: d.kind,
                weight: d.weight,
                probability: f64::from(d.weight) * 100.0 / total,
                amount: d.amount,
            })
            .collect()
    }
}

impl Default for PrizeTable {
    fn default() -> Self {
        let definitions: Vec<PrizeDefinition> = vec![
            PrizeDefinition::new("NEVERLOSE Cheat", PrizeKind::Cheat, 2),
            PrizeDefinition::currency("10 NLE", 5, 10.0),
            PrizeDefinition::new("Premium Config", PrizeKind::Config, 8),
            PrizeDefinition::new("Lua Script", PrizeKind::LuaScript, 10),
            PrizeDefinition::currency("5 NLE", 15, 5.0),
            PrizeDefinition::currency("1 NLE", 20, 1.0),
            PrizeDefinition::new("Try again", PrizeKind::Retry, 40),
        ];
        // 内置表总是合法的
        match Self::new(definitions) {
            Ok(table) => table,
            Err(e) => unreachable!("built-in prize table is invalid: {e}"),
        }
    }
}
