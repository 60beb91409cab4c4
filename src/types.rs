// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// API credentials. Debug is implemented by hand so the secret can
/// never leak into logs.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

/// One tradable market, loaded once at startup and immutable after.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Market {
    /// Exchange-native id, e.g. "ETH_USDC".
    pub symbol_id: String,
    /// Human-readable form, e.g. "ETH/USDC".
    pub display_symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Smallest price increment the exchange accepts.
    pub tick_size: Decimal,
    /// Smallest quantity increment the exchange accepts.
    pub step_size: Decimal,
}

/// Price snapshot. No identity beyond symbol + fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    /// Epoch milliseconds at fetch.
    pub fetched_at: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetBalance {
    pub free: Decimal,
    pub total: Decimal,
}

/// Asset code -> balance. Invariant: total >= free >= 0.
#[derive(Debug, Clone, Default)]
pub struct Balance {
    pub assets: HashMap<String, AssetBalance>,
}

impl Balance {
    /// Free balance for an asset, zero if the exchange did not report it.
    pub fn free(&self, asset: &str) -> Decimal {
        self.assets
            .get(asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal orders never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match raw.to_ascii_lowercase().as_str() {
            "new" => Ok(OrderStatus::New),
            "partiallyfilled" | "partially_filled" => Ok(OrderStatus::PartiallyFilled),
            "filled" => Ok(OrderStatus::Filled),
            "cancelled" | "canceled" | "expired" => Ok(OrderStatus::Cancelled),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Order submission parameters. `price` is required iff `order_type`
/// is `Limit`; the client enforces this.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub client_id: String,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// An order as the exchange sees it. Created on submission, mutated
/// only by status polls, frozen once terminal.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub client_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub requested_qty: Decimal,
    pub filled_qty: Decimal,
    /// Limit price, absent for market orders.
    pub price: Option<Decimal>,
    pub avg_price: Decimal,
    pub status: OrderStatus,
}

/// Lifecycle events the strategies emit. The runner forwards them to
/// the notification sink; delivery is best-effort.
#[derive(Debug, Clone)]
pub enum StrategyEvent {
    PositionOpened {
        symbol: String,
        quantity: Decimal,
        entry_price: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
    },
    TakeProfitHit {
        symbol: String,
        exit_price: Decimal,
        quantity: Decimal,
    },
    StopLossHit {
        symbol: String,
        exit_price: Decimal,
        quantity: Decimal,
        cooldown_secs: u64,
    },
    GridOrderPlaced {
        symbol: String,
        side: Side,
        price: Decimal,
        level_index: usize,
    },
    GridLevelFilled {
        symbol: String,
        side: Side,
        price: Decimal,
        level_index: usize,
    },
}

impl StrategyEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyEvent::PositionOpened { .. } => "position_opened",
            StrategyEvent::TakeProfitHit { .. } => "take_profit_hit",
            StrategyEvent::StopLossHit { .. } => "stop_loss_hit",
            StrategyEvent::GridOrderPlaced { .. } => "grid_order_placed",
            StrategyEvent::GridLevelFilled { .. } => "grid_level_filled",
        }
    }

    pub fn message(&self) -> String {
        match self {
            StrategyEvent::PositionOpened {
                symbol,
                quantity,
                entry_price,
                take_profit,
                stop_loss,
            } => format!(
                "📈 Position opened: {quantity} {symbol} @ {entry_price} (TP {take_profit} / SL {stop_loss})"
            ),
            StrategyEvent::TakeProfitHit {
                symbol,
                exit_price,
                quantity,
            } => format!("✅ Take-profit hit: sold {quantity} {symbol} @ {exit_price}"),
            StrategyEvent::StopLossHit {
                symbol,
                exit_price,
                quantity,
                cooldown_secs,
            } => format!(
                "🛑 Stop-loss hit: sold {quantity} {symbol} @ {exit_price}, cooling down {cooldown_secs}s"
            ),
            StrategyEvent::GridOrderPlaced {
                symbol,
                side,
                price,
                level_index,
            } => format!("🪜 Grid order placed: {side} {symbol} @ {price} (level {level_index})"),
            StrategyEvent::GridLevelFilled {
                symbol,
                side,
                price,
                level_index,
            } => format!("💰 Grid level filled: {side} {symbol} @ {price} (level {level_index})"),
        }
    }
}
