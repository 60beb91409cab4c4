// src/strategies/traits.rs
use crate::connectors::traits::ExchangeApi;
use crate::error::ExchangeError;
use crate::types::{StrategyEvent, Ticker};
use async_trait::async_trait;

/// Everything a strategy may touch during one decision cycle.
pub struct TickContext<'a> {
    pub ticker: &'a Ticker,
    pub exchange: &'a dyn ExchangeApi,
    /// Epoch milliseconds from the runner's clock.
    pub now_ms: i64,
}

#[async_trait]
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// One-time setup: resolve the market, reconcile live exchange
    /// state (open orders, positions) with a fresh in-memory state.
    async fn init(&mut self, exchange: &dyn ExchangeApi) -> Result<(), ExchangeError>;

    /// One decision cycle. Transient exchange failures and rejected
    /// orders are absorbed here (state reverted, retried on a later
    /// tick); config/auth failures propagate and stop the run.
    async fn on_tick(&mut self, ctx: &TickContext<'_>)
        -> Result<Vec<StrategyEvent>, ExchangeError>;
}
