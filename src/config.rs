// src/config.rs

use crate::error::ExchangeError;
use config::{Config, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Directional,
    Grid,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    Long,
    Short,
    Neutral,
}

/// Leveraged single-position parameters. The percentages are fractions
/// (0.02 = 2%), matching how the thresholds are applied to the entry
/// price. Defaults are starting points, not recommendations.
#[derive(Debug, Deserialize, Clone)]
pub struct DirectionalConfig {
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_leverage() -> u32 {
    1
}
fn default_take_profit_pct() -> f64 {
    0.02
}
fn default_stop_loss_pct() -> f64 {
    0.10
}
fn default_cooldown_secs() -> u64 {
    1800
}

impl Default for DirectionalConfig {
    fn default() -> Self {
        Self {
            leverage: default_leverage(),
            take_profit_pct: default_take_profit_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GridConfig {
    pub grid_count: u32,
    pub upper_price: f64,
    pub lower_price: f64,
    pub grid_type: GridType,
    /// Base-asset quantity per resting order.
    pub order_quantity: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Exchange-native symbol, e.g. "ETH_USDC".
    pub symbol: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,
    pub strategy: StrategyKind,
    #[serde(default)]
    pub directional: DirectionalConfig,
    pub grid: Option<GridConfig>,
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn new() -> Result<Self, ExchangeError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder
            .build()
            .map_err(|e| ExchangeError::Config(e.to_string()))?;
        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| ExchangeError::Config(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    /// Fail-fast validation. Anything wrong here would otherwise only
    /// surface mid-run against the live exchange.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err(ExchangeError::Config(
                "api_key and api_secret must be set".to_string(),
            ));
        }
        if self.symbol.trim().is_empty() {
            return Err(ExchangeError::Config("symbol must be set".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ExchangeError::Config(
                "poll_interval_secs must be positive".to_string(),
            ));
        }

        let d = &self.directional;
        if self.strategy == StrategyKind::Directional {
            if d.leverage == 0 {
                return Err(ExchangeError::Config("leverage must be >= 1".to_string()));
            }
            if d.take_profit_pct <= 0.0 || d.stop_loss_pct <= 0.0 || d.stop_loss_pct >= 1.0 {
                return Err(ExchangeError::Config(
                    "take_profit_pct must be > 0 and stop_loss_pct in (0, 1)".to_string(),
                ));
            }
        }

        if self.strategy == StrategyKind::Grid {
            let grid = self.grid.as_ref().ok_or_else(|| {
                ExchangeError::Config("grid strategy selected but [grid] is missing".to_string())
            })?;
            if grid.upper_price <= grid.lower_price {
                return Err(ExchangeError::Config(format!(
                    "grid upper_price {} must exceed lower_price {}",
                    grid.upper_price, grid.lower_price
                )));
            }
            if grid.grid_count < 1 {
                return Err(ExchangeError::Config(
                    "grid_count must be >= 1".to_string(),
                ));
            }
            if grid.order_quantity <= 0.0 {
                return Err(ExchangeError::Config(
                    "grid order_quantity must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}
