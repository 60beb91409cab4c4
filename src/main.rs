// src/main.rs
use crate::config::{AppConfig, StrategyKind};
use crate::connectors::backpack::BackpackClient;
use crate::core::clock::SystemClock;
use crate::core::engine::TradingEngine;
use crate::notify::telegram::TelegramSink;
use crate::notify::{LogSink, NotificationSink};
use crate::strategies::directional::{DirectionalParams, DirectionalStrategy};
use crate::strategies::grid::{GridParams, GridStrategy};
use crate::strategies::traits::Strategy;
use crate::types::Credentials;
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod config;
mod connectors;
mod core;
mod error;
mod notify;
mod strategies;
mod types;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let file_appender = tracing_appender::rolling::daily("logs", "backpack-trader.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    let config = AppConfig::new().context("loading configuration")?;
    info!(
        symbol = %config.symbol,
        strategy = ?config.strategy,
        interval_secs = config.poll_interval_secs,
        "configuration loaded"
    );

    let credentials = Credentials::new(config.api_key.clone(), config.api_secret.clone());
    let exchange = Arc::new(BackpackClient::new(credentials));

    let sink: Arc<dyn NotificationSink> =
        if config.telegram_bot_token.is_empty() || config.telegram_chat_id.is_empty() {
            info!("no telegram channel configured, events go to the log only");
            Arc::new(LogSink)
        } else {
            Arc::new(TelegramSink::new(
                config.telegram_bot_token.clone(),
                config.telegram_chat_id.clone(),
            ))
        };

    // Strategy dispatch happens exactly once, at construction.
    let strategy: Box<dyn Strategy> = match config.strategy {
        StrategyKind::Directional => Box::new(DirectionalStrategy::new(
            config.symbol.clone(),
            DirectionalParams::from_config(&config.directional)?,
        )),
        StrategyKind::Grid => {
            let grid_cfg = config
                .grid
                .as_ref()
                .context("grid strategy selected but [grid] is missing")?;
            Box::new(GridStrategy::new(
                config.symbol.clone(),
                GridParams::from_config(grid_cfg)?,
            )?)
        }
    };

    let mut engine = TradingEngine::new(
        config.symbol.clone(),
        exchange,
        strategy,
        sink,
        Arc::new(SystemClock),
        Duration::from_secs(config.poll_interval_secs),
    );

    engine.run().await?;
    Ok(())
}
