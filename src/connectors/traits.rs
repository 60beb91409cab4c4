// src/connectors/traits.rs
use crate::error::ExchangeError;
use crate::types::{Balance, Market, Order, OrderRequest, Ticker};
use async_trait::async_trait;

/// The narrow capability contract a strategy needs from an exchange.
/// One concrete adapter per venue; no shared base state.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch the tradable markets. Called once at startup.
    async fn load_markets(&self) -> Result<Vec<Market>, ExchangeError>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    async fn fetch_balance(&self) -> Result<Balance, ExchangeError>;

    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError>;

    /// Cancel a resting order. `OrderNotFound` means the order already
    /// reached a terminal state and is not fatal to the caller.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), ExchangeError>;

    async fn fetch_order(&self, symbol: &str, order_id: &str) -> Result<Order, ExchangeError>;

    /// All currently resting orders for a symbol. Used to reconcile
    /// local state after a restart.
    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError>;
}
