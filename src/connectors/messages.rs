// src/connectors/messages.rs
//! Wire DTOs for the Backpack REST API. Numeric fields arrive as JSON
//! strings and are parsed straight into `Decimal`.

use crate::types::{OrderStatus, OrderType, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GET /api/v1/ticker?symbol=...
#[derive(Debug, Deserialize)]
pub struct TickerResponse {
    #[serde(rename = "lastPrice")]
    pub last_price: Decimal,
    #[serde(rename = "bestBid")]
    pub best_bid: Decimal,
    #[serde(rename = "bestAsk")]
    pub best_ask: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
}

/// One entry of GET /api/v1/capital.
#[derive(Debug, Deserialize)]
pub struct CapitalEntry {
    pub asset: String,
    pub free: Decimal,
    pub total: Decimal,
}

/// One entry of GET /api/v1/markets.
#[derive(Debug, Deserialize)]
pub struct MarketEntry {
    pub symbol: String,
    #[serde(rename = "baseSymbol")]
    pub base_symbol: String,
    #[serde(rename = "quoteSymbol")]
    pub quote_symbol: String,
    pub filters: MarketFilters,
}

#[derive(Debug, Deserialize)]
pub struct MarketFilters {
    pub price: PriceFilter,
    pub quantity: QuantityFilter,
}

#[derive(Debug, Deserialize)]
pub struct PriceFilter {
    #[serde(rename = "tickSize")]
    pub tick_size: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct QuantityFilter {
    #[serde(rename = "stepSize")]
    pub step_size: Decimal,
}

/// Body of POST /api/v1/order.
#[derive(Debug, Serialize)]
pub struct OrderPayload {
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "orderType")]
    pub order_type: OrderType,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Order as returned by order placement and order queries.
#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "clientId", default)]
    pub client_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "orderType")]
    pub order_type: OrderType,
    pub quantity: Decimal,
    #[serde(default)]
    pub filled: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(rename = "averagePrice", default)]
    pub average_price: Decimal,
    pub status: OrderStatus,
}

/// Structured error body on 4xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
