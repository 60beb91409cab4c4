// src/connectors/scripted.rs
//! In-memory `ExchangeApi` used by strategy and engine tests. Orders
//! fill according to a scripted policy and every submission is
//! recorded for assertions.

use crate::connectors::traits::ExchangeApi;
use crate::error::ExchangeError;
use crate::types::{
    AssetBalance, Balance, Market, Order, OrderRequest, OrderStatus, OrderType, Ticker,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

/// How the scripted exchange resolves a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FillPolicy {
    /// Fill immediately: market orders at the scripted market price,
    /// limit orders at their limit price.
    Immediate,
    /// Leave every order resting as `New`.
    Resting,
}

#[derive(Default)]
struct ScriptState {
    balance: Balance,
    market_price: Decimal,
    orders: HashMap<String, Order>,
    placed: Vec<OrderRequest>,
    cancelled: Vec<String>,
    next_id: u64,
    fail_next: Option<ExchangeError>,
    fail_next_place: Option<ExchangeError>,
    partial_fill_next_place: Option<Decimal>,
}

pub(crate) struct ScriptedExchange {
    fill_policy: FillPolicy,
    state: Mutex<ScriptState>,
}

impl ScriptedExchange {
    pub(crate) fn new(fill_policy: FillPolicy) -> Self {
        Self {
            fill_policy,
            state: Mutex::new(ScriptState::default()),
        }
    }

    pub(crate) fn eth_usdc_market() -> Market {
        Market {
            symbol_id: "ETH_USDC".to_string(),
            display_symbol: "ETH/USDC".to_string(),
            base_asset: "ETH".to_string(),
            quote_asset: "USDC".to_string(),
            tick_size: Decimal::from_str("0.01").unwrap(),
            step_size: Decimal::from_str("0.0001").unwrap(),
        }
    }

    pub(crate) fn set_free_balance(&self, asset: &str, free: Decimal) {
        let mut state = self.state.lock().unwrap();
        state.balance.assets.insert(
            asset.to_string(),
            AssetBalance { free, total: free },
        );
    }

    /// Price market orders fill at.
    pub(crate) fn set_market_price(&self, price: Decimal) {
        self.state.lock().unwrap().market_price = price;
    }

    /// Queue one error; the next call to any operation returns it.
    pub(crate) fn fail_next(&self, err: ExchangeError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Queue one error that fires only on the next order placement.
    pub(crate) fn fail_next_place(&self, err: ExchangeError) {
        self.state.lock().unwrap().fail_next_place = Some(err);
    }

    /// The next placed order sticks at `PartiallyFilled` with this
    /// executed quantity, regardless of the fill policy.
    pub(crate) fn partial_fill_next_place(&self, filled_qty: Decimal) {
        self.state.lock().unwrap().partial_fill_next_place = Some(filled_qty);
    }

    pub(crate) fn placed_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().placed.clone()
    }

    pub(crate) fn cancelled_orders(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Transition a resting order, e.g. to simulate a fill between
    /// ticks.
    pub(crate) fn resolve_order(&self, order_id: &str, status: OrderStatus, avg_price: Decimal) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.get_mut(order_id) {
            order.status = status;
            if status == OrderStatus::Filled {
                order.filled_qty = order.requested_qty;
                order.avg_price = avg_price;
            }
        }
    }

    /// Pre-load a resting order, e.g. to simulate state surviving a
    /// restart.
    pub(crate) fn seed_open_order(&self, order: Order) {
        self.state.lock().unwrap().orders.insert(order.id.clone(), order);
    }

    fn take_failure(state: &mut ScriptState) -> Result<(), ExchangeError> {
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExchangeApi for ScriptedExchange {
    async fn load_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        Ok(vec![Self::eth_usdc_market()])
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        let last = state.market_price;
        Ok(Ticker {
            symbol: symbol.to_string(),
            last,
            bid: last,
            ask: last,
            high: last,
            low: last,
            volume: Decimal::ZERO,
            fetched_at: 0,
        })
    }

    async fn fetch_balance(&self) -> Result<Balance, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        Ok(state.balance.clone())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        if let Some(err) = state.fail_next_place.take() {
            return Err(err);
        }
        state.placed.push(request.clone());

        state.next_id += 1;
        let id = state.next_id.to_string();

        let fills_now = self.fill_policy == FillPolicy::Immediate;
        let fill_price = match request.order_type {
            OrderType::Limit => request.price.unwrap_or(state.market_price),
            OrderType::Market => state.market_price,
        };

        let (filled_qty, avg_price, status) = match state.partial_fill_next_place.take() {
            Some(partial) => (partial, fill_price, OrderStatus::PartiallyFilled),
            None if fills_now => (request.quantity, fill_price, OrderStatus::Filled),
            None => (Decimal::ZERO, Decimal::ZERO, OrderStatus::New),
        };

        let order = Order {
            id: id.clone(),
            client_id: Some(request.client_id.clone()),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            requested_qty: request.quantity,
            filled_qty,
            price: request.price,
            avg_price,
            status,
        };
        state.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &str) -> Result<(), ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state.cancelled.push(order_id.to_string());
        match state.orders.get_mut(order_id) {
            Some(order) if !order.status.is_terminal() => {
                order.status = OrderStatus::Cancelled;
                Ok(())
            }
            Some(_) => Err(ExchangeError::OrderNotFound(order_id.to_string())),
            None => Err(ExchangeError::OrderNotFound(order_id.to_string())),
        }
    }

    async fn fetch_order(&self, _symbol: &str, order_id: &str) -> Result<Order, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.symbol == symbol && !o.status.is_terminal())
            .cloned()
            .collect())
    }
}
