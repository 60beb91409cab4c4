// src/core/engine.rs
use crate::connectors::traits::ExchangeApi;
use crate::core::backoff::ExponentialBackoff;
use crate::core::clock::Clock;
use crate::error::ExchangeError;
use crate::notify::NotificationSink;
use crate::strategies::traits::{Strategy, TickContext};
use crate::types::StrategyEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Every time a failure streak reaches a multiple of this, the
/// operator is paged through the notification sink (the loop itself
/// keeps going).
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Startup makes the same network calls a tick does; transient
/// failures there are retried this many times before giving up.
const MAX_INIT_ATTEMPTS: u32 = 5;

/// Pages at every multiple of the threshold so a long outage stays
/// visible instead of alerting once and going quiet.
fn should_escalate(consecutive_failures: u32) -> bool {
    consecutive_failures > 0 && consecutive_failures % MAX_CONSECUTIVE_FAILURES == 0
}

/// Drives one strategy at a fixed cadence. Each tick is isolated: a
/// failing tick is logged, backed off and retried, and can never take
/// the process down. Only config/auth errors end the run.
pub struct TradingEngine {
    symbol: String,
    exchange: Arc<dyn ExchangeApi>,
    strategy: Box<dyn Strategy>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl TradingEngine {
    pub fn new(
        symbol: String,
        exchange: Arc<dyn ExchangeApi>,
        strategy: Box<dyn Strategy>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            symbol,
            exchange,
            strategy,
            sink,
            clock,
            poll_interval,
        }
    }

    /// The single blocking entry point. Returns only on shutdown
    /// signal or a fatal error; supervision beyond that belongs to an
    /// external process manager.
    pub async fn run(&mut self) -> Result<(), ExchangeError> {
        info!(
            symbol = %self.symbol,
            strategy = self.strategy.name(),
            interval_secs = self.poll_interval.as_secs(),
            "engine starting"
        );
        self.sink
            .notify(
                "engine_started",
                &format!(
                    "🤖 Trading engine started: {} on {}",
                    self.strategy.name(),
                    self.symbol
                ),
            )
            .await;

        if let Err(e) = self.init_with_retry().await {
            error!(symbol = %self.symbol, error = %e, "startup failed");
            self.sink
                .notify("engine_stopped", &format!("🛑 Engine failed to start: {e}"))
                .await;
            return Err(e);
        }

        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
        let mut consecutive_failures: u32 = 0;

        loop {
            match self.tick().await {
                Ok(events) => {
                    consecutive_failures = 0;
                    backoff.reset();
                    for event in &events {
                        self.sink.notify(event.kind(), &event.message()).await;
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!(symbol = %self.symbol, error = %e, "fatal error, stopping engine");
                    self.sink
                        .notify("engine_stopped", &format!("🛑 Engine stopped: {e}"))
                        .await;
                    return Err(e);
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        symbol = %self.symbol,
                        strategy = self.strategy.name(),
                        error = %e,
                        consecutive_failures,
                        "tick failed, backing off"
                    );
                    if should_escalate(consecutive_failures) {
                        self.sink
                            .notify(
                                "tick_failed",
                                &format!(
                                    "⚠️ {consecutive_failures} consecutive tick failures on {}: {e}",
                                    self.symbol
                                ),
                            )
                            .await;
                    }
                }
            }

            let wait = if consecutive_failures > 0 {
                backoff.next_delay()
            } else {
                self.poll_interval
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.sink
            .notify("engine_stopped", "👋 Trading engine stopped")
            .await;
        Ok(())
    }

    /// Strategy setup hits the network like a tick does, so transient
    /// failures get the same backoff treatment instead of killing the
    /// process. Config/auth failures still stop the run immediately.
    async fn init_with_retry(&mut self) -> Result<(), ExchangeError> {
        let mut backoff = ExponentialBackoff::default();
        let mut attempts = 0;
        loop {
            match self.strategy.init(self.exchange.as_ref()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    attempts += 1;
                    if attempts >= MAX_INIT_ATTEMPTS {
                        return Err(e);
                    }
                    let wait = backoff.next_delay();
                    warn!(
                        symbol = %self.symbol,
                        error = %e,
                        attempts,
                        wait_secs = wait.as_secs(),
                        "startup failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// One decision cycle: snapshot the market, hand it to the
    /// strategy, collect its events.
    async fn tick(&mut self) -> Result<Vec<StrategyEvent>, ExchangeError> {
        let ticker = self.exchange.fetch_ticker(&self.symbol).await?;
        debug!(symbol = %self.symbol, last = %ticker.last, "tick");
        let ctx = TickContext {
            ticker: &ticker,
            exchange: self.exchange.as_ref(),
            now_ms: self.clock.now_ms(),
        };
        self.strategy.on_tick(&ctx).await
    }
}
