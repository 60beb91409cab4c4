// src/strategies/grid.rs
//! Grid trading: partition a price band into evenly spaced levels,
//! rest buys below the market and sells above it, and after every fill
//! place the opposing order one level away so the ladder feeds itself.

use crate::config::{GridConfig, GridType};
use crate::connectors::traits::ExchangeApi;
use crate::error::ExchangeError;
use crate::strategies::traits::{Strategy, TickContext};
use crate::types::{Market, OrderRequest, OrderStatus, Side, StrategyEvent};
use crate::utils::precision::{normalize_price, normalize_quantity};
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct GridParams {
    pub grid_count: u32,
    pub upper: Decimal,
    pub lower: Decimal,
    pub grid_type: GridType,
    /// Base-asset quantity per resting order.
    pub order_quantity: Decimal,
}

impl GridParams {
    pub fn from_config(cfg: &GridConfig) -> Result<Self, ExchangeError> {
        let upper = Decimal::from_f64(cfg.upper_price)
            .ok_or_else(|| ExchangeError::Config("invalid upper_price".to_string()))?;
        let lower = Decimal::from_f64(cfg.lower_price)
            .ok_or_else(|| ExchangeError::Config("invalid lower_price".to_string()))?;
        let order_quantity = Decimal::from_f64(cfg.order_quantity)
            .ok_or_else(|| ExchangeError::Config("invalid order_quantity".to_string()))?;
        Ok(Self {
            grid_count: cfg.grid_count,
            upper,
            lower,
            grid_type: cfg.grid_type,
            order_quantity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LevelState {
    Empty,
    OrderPlaced { order_id: String, side: Side },
    Filled,
}

#[derive(Debug, Clone)]
pub struct GridLevel {
    pub index: usize,
    pub price: Decimal,
    pub(crate) state: LevelState,
}

/// `n + 1` evenly spaced prices over `[lower, upper]`, strictly
/// increasing, endpoints exact.
pub fn build_levels(
    lower: Decimal,
    upper: Decimal,
    n: u32,
) -> Result<Vec<GridLevel>, ExchangeError> {
    if upper <= lower {
        return Err(ExchangeError::Config(format!(
            "grid upper bound {upper} must exceed lower bound {lower}"
        )));
    }
    if n < 1 {
        return Err(ExchangeError::Config(
            "grid needs at least one interval".to_string(),
        ));
    }

    let step = (upper - lower) / Decimal::from(n);
    Ok((0..=n)
        .map(|i| GridLevel {
            index: i as usize,
            // The top endpoint is pinned so division rounding can
            // never push it off the configured bound.
            price: if i == n {
                upper
            } else {
                lower + Decimal::from(i) * step
            },
            state: LevelState::Empty,
        })
        .collect())
}

pub struct GridStrategy {
    symbol: String,
    params: GridParams,
    market: Option<Market>,
    levels: Vec<GridLevel>,
}

impl GridStrategy {
    pub fn new(symbol: String, params: GridParams) -> Result<Self, ExchangeError> {
        let levels = build_levels(params.lower, params.upper, params.grid_count)?;
        Ok(Self {
            symbol,
            params,
            market: None,
            levels,
        })
    }

    fn market(&self) -> Result<&Market, ExchangeError> {
        self.market
            .as_ref()
            .ok_or_else(|| ExchangeError::Config("strategy used before init".to_string()))
    }

    fn level_spacing(&self) -> Decimal {
        (self.params.upper - self.params.lower) / Decimal::from(self.params.grid_count)
    }

    /// Which side this grid rests at a level, given where the market
    /// trades. Long grids accumulate with buys below the price (sells
    /// appear through rebalancing), short grids mirror that with sells
    /// above, neutral grids arm both sides.
    fn seed_side(&self, level_price: Decimal, last: Decimal) -> Option<Side> {
        match self.params.grid_type {
            GridType::Long => (level_price < last).then_some(Side::Buy),
            GridType::Short => (level_price > last).then_some(Side::Sell),
            GridType::Neutral => {
                if level_price < last {
                    Some(Side::Buy)
                } else if level_price > last {
                    Some(Side::Sell)
                } else {
                    None
                }
            }
        }
    }

    /// Place a resting limit order for one level. Placement failures
    /// that only concern this level are absorbed; the level stays
    /// `Empty` and the next tick retries.
    async fn place_level_order(
        &mut self,
        exchange: &dyn ExchangeApi,
        index: usize,
        side: Side,
    ) -> Result<bool, ExchangeError> {
        let market = self.market()?.clone();
        let price = normalize_price(self.levels[index].price, market.tick_size);
        let quantity = normalize_quantity(self.params.order_quantity, market.step_size);
        if quantity <= Decimal::ZERO {
            return Err(ExchangeError::Config(
                "grid order_quantity below the market's step size".to_string(),
            ));
        }

        let request = OrderRequest::limit(&self.symbol, side, quantity, price);
        match exchange.place_order(&request).await {
            Ok(order) => {
                debug!(symbol = %self.symbol, index, %side, %price, "grid order resting");
                self.levels[index].state = LevelState::OrderPlaced {
                    order_id: order.id,
                    side,
                };
                Ok(true)
            }
            Err(e @ ExchangeError::Transient(_)) | Err(e @ ExchangeError::OrderRejected { .. }) => {
                warn!(
                    symbol = %self.symbol,
                    index,
                    %side,
                    %price,
                    error = %e,
                    "grid order placement failed, level retried next tick"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll every resting level and ladder onwards from fills: a buy
    /// filling at level i arms a sell at i+1, a sell at i arms a buy
    /// at i-1, and the filled level returns to play.
    async fn poll_fills(
        &mut self,
        exchange: &dyn ExchangeApi,
    ) -> Result<Vec<StrategyEvent>, ExchangeError> {
        let mut events = Vec::new();

        for index in 0..self.levels.len() {
            let (order_id, side) = match &self.levels[index].state {
                LevelState::OrderPlaced { order_id, side } => (order_id.clone(), *side),
                _ => continue,
            };

            let order = match exchange.fetch_order(&self.symbol, &order_id).await {
                Ok(order) => order,
                Err(ExchangeError::OrderNotFound(_)) => {
                    warn!(symbol = %self.symbol, index, order_id, "grid order vanished, re-arming level");
                    self.levels[index].state = LevelState::Empty;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match order.status {
                OrderStatus::Filled => {
                    self.levels[index].state = LevelState::Filled;
                    let price = self.levels[index].price;
                    info!(symbol = %self.symbol, index, %side, %price, "grid level filled");
                    events.push(StrategyEvent::GridLevelFilled {
                        symbol: self.symbol.clone(),
                        side,
                        price,
                        level_index: index,
                    });

                    let target = match side {
                        Side::Buy => index.checked_add(1).filter(|t| *t < self.levels.len()),
                        Side::Sell => index.checked_sub(1),
                    };
                    if let Some(target) = target {
                        if self.levels[target].state == LevelState::Empty
                            && self
                                .place_level_order(exchange, target, side.opposite())
                                .await?
                        {
                            events.push(StrategyEvent::GridOrderPlaced {
                                symbol: self.symbol.clone(),
                                side: side.opposite(),
                                price: self.levels[target].price,
                                level_index: target,
                            });
                        }
                    }
                    // Back in play for the seeding pass.
                    self.levels[index].state = LevelState::Empty;
                }
                OrderStatus::Cancelled | OrderStatus::Rejected => {
                    self.levels[index].state = LevelState::Empty;
                }
                OrderStatus::New | OrderStatus::PartiallyFilled => {}
            }
        }

        Ok(events)
    }

    async fn seed_levels(
        &mut self,
        exchange: &dyn ExchangeApi,
        last: Decimal,
    ) -> Result<(), ExchangeError> {
        for index in 0..self.levels.len() {
            if self.levels[index].state != LevelState::Empty {
                continue;
            }
            if let Some(side) = self.seed_side(self.levels[index].price, last) {
                self.place_level_order(exchange, index, side).await?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn levels(&self) -> &[GridLevel] {
        &self.levels
    }
}

#[async_trait]
impl Strategy for GridStrategy {
    fn name(&self) -> &'static str {
        "grid"
    }

    /// Grid state is not persisted. After a restart the live exchange
    /// is authoritative: resting orders near a level are re-attached
    /// to it, anything else is cancelled.
    async fn init(&mut self, exchange: &dyn ExchangeApi) -> Result<(), ExchangeError> {
        let markets = exchange.load_markets().await?;
        let market = markets
            .into_iter()
            .find(|m| m.symbol_id == self.symbol)
            .ok_or_else(|| {
                ExchangeError::Config(format!("unknown symbol {}", self.symbol))
            })?;
        self.market = Some(market);

        let half_step = self.level_spacing() / Decimal::TWO;
        let open = exchange.open_orders(&self.symbol).await?;
        for order in open {
            let Some(price) = order.price else {
                continue;
            };
            let slot = self
                .levels
                .iter()
                .position(|l| l.state == LevelState::Empty && (l.price - price).abs() < half_step);
            match slot {
                Some(index) => {
                    info!(
                        symbol = %self.symbol,
                        index,
                        order_id = %order.id,
                        %price,
                        "re-attached resting order to grid level"
                    );
                    self.levels[index].state = LevelState::OrderPlaced {
                        order_id: order.id,
                        side: order.side,
                    };
                }
                None => {
                    warn!(
                        symbol = %self.symbol,
                        order_id = %order.id,
                        %price,
                        "resting order matches no grid level, cancelling"
                    );
                    match exchange.cancel_order(&self.symbol, &order.id).await {
                        Ok(()) | Err(ExchangeError::OrderNotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        info!(
            symbol = %self.symbol,
            lower = %self.params.lower,
            upper = %self.params.upper,
            levels = self.levels.len(),
            grid_type = ?self.params.grid_type,
            "grid strategy ready"
        );
        Ok(())
    }

    async fn on_tick(
        &mut self,
        ctx: &TickContext<'_>,
    ) -> Result<Vec<StrategyEvent>, ExchangeError> {
        let events = self.poll_fills(ctx.exchange).await?;
        self.seed_levels(ctx.exchange, ctx.ticker.last).await?;
        Ok(events)
    }
}
