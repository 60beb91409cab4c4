// src/strategies/directional.rs
//! Leveraged single-position strategy: enter long with the whole free
//! quote balance, then watch the mark against take-profit/stop-loss
//! levels. A stop-loss exit arms a cooldown during which re-entry is
//! suppressed.

use crate::config::DirectionalConfig;
use crate::connectors::traits::ExchangeApi;
use crate::error::ExchangeError;
use crate::strategies::traits::{Strategy, TickContext};
use crate::types::{Market, Order, OrderRequest, OrderStatus, Side, StrategyEvent};
use crate::utils::precision::{normalize_price, normalize_quantity};
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long and how often to poll an order that did not come back
/// terminal from submission before giving up and cancelling it.
const MAX_FILL_POLLS: u32 = 5;
const FILL_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct DirectionalParams {
    pub leverage: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub cooldown: Duration,
}

impl DirectionalParams {
    pub fn from_config(cfg: &DirectionalConfig) -> Result<Self, ExchangeError> {
        let take_profit_pct = Decimal::from_f64(cfg.take_profit_pct)
            .ok_or_else(|| ExchangeError::Config("invalid take_profit_pct".to_string()))?;
        let stop_loss_pct = Decimal::from_f64(cfg.stop_loss_pct)
            .ok_or_else(|| ExchangeError::Config("invalid stop_loss_pct".to_string()))?;
        Ok(Self {
            leverage: Decimal::from(cfg.leverage),
            take_profit_pct,
            stop_loss_pct,
            cooldown: Duration::from_secs(cfg.cooldown_secs),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OpenPosition {
    pub(crate) entry_price: Decimal,
    pub(crate) quantity: Decimal,
    pub(crate) take_profit: Decimal,
    pub(crate) stop_loss: Decimal,
    pub(crate) opened_at_ms: i64,
}

/// Position lifecycle: Flat -> Entering -> Open -> Exiting -> Flat.
/// The transient states exist only for the duration of one submission
/// call and double as a mutual-exclusion marker: no new entry or exit
/// is initiated while one is in flight.
#[derive(Debug, Clone)]
enum PositionState {
    Flat,
    Entering,
    Open(OpenPosition),
    Exiting(OpenPosition),
}

pub struct DirectionalStrategy {
    symbol: String,
    params: DirectionalParams,
    market: Option<Market>,
    state: PositionState,
    cooldown_until_ms: Option<i64>,
}

impl DirectionalStrategy {
    pub fn new(symbol: String, params: DirectionalParams) -> Self {
        Self {
            symbol,
            params,
            market: None,
            state: PositionState::Flat,
            cooldown_until_ms: None,
        }
    }

    fn market(&self) -> Result<&Market, ExchangeError> {
        self.market
            .as_ref()
            .ok_or_else(|| ExchangeError::Config("strategy used before init".to_string()))
    }

    fn in_cooldown(&mut self, now_ms: i64) -> bool {
        match self.cooldown_until_ms {
            Some(until) if now_ms < until => true,
            Some(_) => {
                // Expired windows clear implicitly.
                self.cooldown_until_ms = None;
                false
            }
            None => false,
        }
    }

    /// Submit, then poll to a terminal status. Orders still resting
    /// after the last poll are cancelled rather than trusted.
    /// `Ok(Some)` carries a fill (possibly partial before the cancel),
    /// `Ok(None)` means nothing executed.
    async fn submit_and_confirm(
        &self,
        exchange: &dyn ExchangeApi,
        request: OrderRequest,
    ) -> Result<Option<Order>, ExchangeError> {
        let mut order = exchange.place_order(&request).await?;
        debug!(
            order_id = %order.id,
            client_id = ?order.client_id,
            status = ?order.status,
            "order submitted"
        );
        let mut polls = 0;
        while !order.status.is_terminal() && polls < MAX_FILL_POLLS {
            tokio::time::sleep(FILL_POLL_INTERVAL).await;
            order = exchange.fetch_order(&self.symbol, &order.id).await?;
            polls += 1;
        }

        if !order.status.is_terminal() {
            match exchange.cancel_order(&self.symbol, &order.id).await {
                Ok(()) | Err(ExchangeError::OrderNotFound(_)) => {}
                Err(e) => return Err(e),
            }
            order = exchange.fetch_order(&self.symbol, &order.id).await?;
        }

        if order.status == OrderStatus::Filled || order.filled_qty > Decimal::ZERO {
            Ok(Some(order))
        } else {
            Ok(None)
        }
    }

    async fn try_enter(
        &mut self,
        ctx: &TickContext<'_>,
    ) -> Result<Vec<StrategyEvent>, ExchangeError> {
        let market = self.market()?.clone();
        // Balance fetch failures propagate with the state untouched:
        // the runner logs, sleeps and the next tick re-evaluates.
        let balance = ctx.exchange.fetch_balance().await?;
        let free = balance.free(&market.quote_asset);
        let last = ctx.ticker.last;
        if last <= Decimal::ZERO {
            return Err(ExchangeError::MarketData(format!(
                "non-positive last price {last} for {}",
                self.symbol
            )));
        }

        let raw_qty = free * self.params.leverage / last;
        let quantity = normalize_quantity(raw_qty, market.step_size);
        if quantity <= Decimal::ZERO {
            debug!(symbol = %self.symbol, %free, "free balance too small to enter");
            return Ok(Vec::new());
        }

        self.state = PositionState::Entering;
        let request = OrderRequest::market(&self.symbol, Side::Buy, quantity);
        let fill = match self.submit_and_confirm(ctx.exchange, request).await {
            Ok(Some(fill)) => fill,
            Ok(None) => {
                self.state = PositionState::Flat;
                return Ok(Vec::new());
            }
            Err(e @ ExchangeError::Transient(_))
            | Err(e @ ExchangeError::OrderRejected { .. }) => {
                warn!(
                    symbol = %self.symbol,
                    state = "entering",
                    action = "market buy",
                    error = %e,
                    "entry failed, deferring to next tick"
                );
                self.state = PositionState::Flat;
                return Ok(Vec::new());
            }
            Err(e) => {
                self.state = PositionState::Flat;
                return Err(e);
            }
        };

        if fill.filled_qty < fill.requested_qty {
            warn!(
                symbol = %self.symbol,
                requested = %fill.requested_qty,
                filled = %fill.filled_qty,
                "entry only partially filled, tracking the filled amount"
            );
        }

        let entry_price = if fill.avg_price > Decimal::ZERO {
            fill.avg_price
        } else {
            last
        };
        let take_profit = normalize_price(
            entry_price * (Decimal::ONE + self.params.take_profit_pct),
            market.tick_size,
        );
        let stop_loss = normalize_price(
            entry_price * (Decimal::ONE - self.params.stop_loss_pct),
            market.tick_size,
        );
        let position = OpenPosition {
            entry_price,
            quantity: fill.filled_qty,
            take_profit,
            stop_loss,
            opened_at_ms: ctx.now_ms,
        };
        info!(
            symbol = %self.symbol,
            %entry_price,
            quantity = %position.quantity,
            %take_profit,
            %stop_loss,
            "position opened"
        );
        let event = StrategyEvent::PositionOpened {
            symbol: self.symbol.clone(),
            quantity: position.quantity,
            entry_price,
            take_profit,
            stop_loss,
        };
        self.state = PositionState::Open(position);
        Ok(vec![event])
    }

    async fn watch_exits(
        &mut self,
        ctx: &TickContext<'_>,
    ) -> Result<Vec<StrategyEvent>, ExchangeError> {
        let position = match &self.state {
            PositionState::Open(p) => p.clone(),
            _ => return Ok(Vec::new()),
        };
        let last = ctx.ticker.last;
        debug!(
            symbol = %self.symbol,
            %last,
            entry = %position.entry_price,
            held_ms = ctx.now_ms - position.opened_at_ms,
            tp = %position.take_profit,
            sl = %position.stop_loss,
            "watching open position"
        );

        // Take-profit is checked first: under sane bounds both can
        // never trigger in one tick, but if they are misconfigured the
        // profitable exit wins.
        if last >= position.take_profit {
            let request = OrderRequest::limit(
                &self.symbol,
                Side::Sell,
                position.quantity,
                position.take_profit,
            );
            return self
                .execute_exit(ctx, position, request, ExitKind::TakeProfit)
                .await;
        }

        if last <= position.stop_loss {
            let request = OrderRequest::market(&self.symbol, Side::Sell, position.quantity);
            return self
                .execute_exit(ctx, position, request, ExitKind::StopLoss)
                .await;
        }

        Ok(Vec::new())
    }

    async fn execute_exit(
        &mut self,
        ctx: &TickContext<'_>,
        position: OpenPosition,
        request: OrderRequest,
        kind: ExitKind,
    ) -> Result<Vec<StrategyEvent>, ExchangeError> {
        self.state = PositionState::Exiting(position.clone());
        match self.submit_and_confirm(ctx.exchange, request).await {
            Ok(Some(fill)) => {
                let remainder = position.quantity - fill.filled_qty;
                if remainder > Decimal::ZERO {
                    // The unsold remainder is still exposure. Stay
                    // open with the reduced quantity; the exit
                    // thresholds are re-evaluated next tick.
                    warn!(
                        symbol = %self.symbol,
                        action = ?kind,
                        filled = %fill.filled_qty,
                        %remainder,
                        "exit partially filled, remainder stays open"
                    );
                    let mut rest = position;
                    rest.quantity = remainder;
                    self.state = PositionState::Open(rest);
                    return Ok(Vec::new());
                }

                let exit_price = if fill.avg_price > Decimal::ZERO {
                    fill.avg_price
                } else {
                    ctx.ticker.last
                };
                self.state = PositionState::Flat;
                let event = match kind {
                    ExitKind::TakeProfit => {
                        info!(symbol = %self.symbol, %exit_price, "take-profit exit filled");
                        StrategyEvent::TakeProfitHit {
                            symbol: self.symbol.clone(),
                            exit_price,
                            quantity: fill.filled_qty,
                        }
                    }
                    ExitKind::StopLoss => {
                        let cooldown_secs = self.params.cooldown.as_secs();
                        self.cooldown_until_ms =
                            Some(ctx.now_ms + self.params.cooldown.as_millis() as i64);
                        info!(
                            symbol = %self.symbol,
                            %exit_price,
                            cooldown_secs,
                            "stop-loss exit filled, cooldown armed"
                        );
                        StrategyEvent::StopLossHit {
                            symbol: self.symbol.clone(),
                            exit_price,
                            quantity: fill.filled_qty,
                            cooldown_secs,
                        }
                    }
                };
                Ok(vec![event])
            }
            Ok(None) => {
                // Exit did not execute; stay open and retry next tick.
                self.state = PositionState::Open(position);
                Ok(Vec::new())
            }
            Err(e @ ExchangeError::Transient(_)) | Err(e @ ExchangeError::OrderRejected { .. }) => {
                warn!(
                    symbol = %self.symbol,
                    state = "exiting",
                    action = ?kind,
                    error = %e,
                    "exit failed, position stays open"
                );
                self.state = PositionState::Open(position);
                Ok(Vec::new())
            }
            Err(e) => {
                self.state = PositionState::Open(position);
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn open_position(&self) -> Option<&OpenPosition> {
        match &self.state {
            PositionState::Open(p) => Some(p),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_flat(&self) -> bool {
        matches!(self.state, PositionState::Flat)
    }

    #[cfg(test)]
    pub(crate) fn cooldown_until(&self) -> Option<i64> {
        self.cooldown_until_ms
    }
}

#[derive(Debug, Clone, Copy)]
enum ExitKind {
    TakeProfit,
    StopLoss,
}

#[async_trait]
impl Strategy for DirectionalStrategy {
    fn name(&self) -> &'static str {
        "directional"
    }

    async fn init(&mut self, exchange: &dyn ExchangeApi) -> Result<(), ExchangeError> {
        let markets = exchange.load_markets().await?;
        let market = markets
            .into_iter()
            .find(|m| m.symbol_id == self.symbol)
            .ok_or_else(|| {
                ExchangeError::Config(format!("unknown symbol {}", self.symbol))
            })?;

        // A previous run may have died with orders in flight. Local
        // state starts Flat, so anything still resting on the exchange
        // must go.
        let stale = exchange.open_orders(&self.symbol).await?;
        for order in stale {
            warn!(symbol = %self.symbol, order_id = %order.id, "cancelling stale order from previous run");
            match exchange.cancel_order(&self.symbol, &order.id).await {
                Ok(()) | Err(ExchangeError::OrderNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        info!(
            symbol = %market.display_symbol,
            tick_size = %market.tick_size,
            step_size = %market.step_size,
            "directional strategy ready"
        );
        self.market = Some(market);
        Ok(())
    }

    async fn on_tick(
        &mut self,
        ctx: &TickContext<'_>,
    ) -> Result<Vec<StrategyEvent>, ExchangeError> {
        match self.state {
            PositionState::Flat => {
                if self.in_cooldown(ctx.now_ms) {
                    // Silent skip: indistinguishable from an idle tick
                    // to any observer except this state.
                    return Ok(Vec::new());
                }
                self.try_enter(ctx).await
            }
            PositionState::Open(_) => self.watch_exits(ctx).await,
            PositionState::Entering | PositionState::Exiting(_) => {
                // Transient states never outlive a submission call; if
                // one is observed here a previous tick was torn down
                // mid-flight and init() reconciliation was skipped.
                warn!(symbol = %self.symbol, "tick while a submission is in flight, skipping");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::scripted::{FillPolicy, ScriptedExchange};
    use crate::types::{OrderType, Ticker};
    use std::str::FromStr;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn params() -> DirectionalParams {
        DirectionalParams {
            leverage: Decimal::ONE,
            take_profit_pct: dec("0.02"),
            stop_loss_pct: dec("0.10"),
            cooldown: Duration::from_secs(1800),
        }
    }

    fn ticker(last: &str) -> Ticker {
        Ticker {
            symbol: "ETH_USDC".to_string(),
            last: dec(last),
            bid: dec(last),
            ask: dec(last),
            high: dec(last),
            low: dec(last),
            volume: Decimal::ZERO,
            fetched_at: NOW_MS,
        }
    }

    async fn ready_strategy(
        exchange: &ScriptedExchange,
        params: DirectionalParams,
    ) -> DirectionalStrategy {
        let mut strategy = DirectionalStrategy::new("ETH_USDC".to_string(), params);
        strategy.init(exchange).await.unwrap();
        strategy
    }

    async fn tick(
        strategy: &mut DirectionalStrategy,
        exchange: &ScriptedExchange,
        last: &str,
        now_ms: i64,
    ) -> Vec<StrategyEvent> {
        let t = ticker(last);
        let ctx = TickContext {
            ticker: &t,
            exchange,
            now_ms,
        };
        strategy.on_tick(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn entry_sizes_from_free_balance_and_sets_brackets() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;

        let events = tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StrategyEvent::PositionOpened { .. }));

        let placed = exchange.placed_orders();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, Side::Buy);
        assert_eq!(placed[0].order_type, OrderType::Market);
        assert_eq!(placed[0].quantity, dec("0.5")); // 1000 * 1 / 2000

        let position = strategy.open_position().unwrap();
        assert_eq!(position.entry_price, dec("2000"));
        assert_eq!(position.take_profit, dec("2040"));
        assert_eq!(position.stop_loss, dec("1800"));
    }

    #[tokio::test]
    async fn take_profit_submits_limit_sell_at_target() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;
        tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        let events = tick(&mut strategy, &exchange, "2050", NOW_MS + 1000).await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            StrategyEvent::TakeProfitHit {
                exit_price,
                quantity,
                ..
            } => {
                assert_eq!(*exit_price, dec("2040"));
                assert_eq!(*quantity, dec("0.5"));
            }
            other => panic!("expected TakeProfitHit, got {other:?}"),
        }

        let placed = exchange.placed_orders();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[1].side, Side::Sell);
        assert_eq!(placed[1].order_type, OrderType::Limit);
        assert_eq!(placed[1].price, Some(dec("2040")));

        assert!(strategy.is_flat());
        assert!(strategy.cooldown_until().is_none());
    }

    #[tokio::test]
    async fn stop_loss_market_sells_and_arms_cooldown() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;
        tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        exchange.set_market_price(dec("1750"));
        let events = tick(&mut strategy, &exchange, "1750", NOW_MS + 1000).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            StrategyEvent::StopLossHit {
                cooldown_secs: 1800,
                ..
            }
        ));

        let placed = exchange.placed_orders();
        assert_eq!(placed[1].side, Side::Sell);
        assert_eq!(placed[1].order_type, OrderType::Market);

        assert!(strategy.is_flat());
        assert_eq!(
            strategy.cooldown_until(),
            Some(NOW_MS + 1000 + 1800 * 1000)
        );
    }

    #[tokio::test]
    async fn cooldown_suppresses_reentry_until_expiry() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;
        tick(&mut strategy, &exchange, "2000", NOW_MS).await;
        exchange.set_market_price(dec("1750"));
        tick(&mut strategy, &exchange, "1750", NOW_MS + 1000).await;
        let cooldown_until = strategy.cooldown_until().unwrap();

        // Inside the window: no orders, no events, silent skip.
        exchange.set_market_price(dec("2000"));
        let events = tick(&mut strategy, &exchange, "2000", cooldown_until - 1).await;
        assert!(events.is_empty());
        assert_eq!(exchange.placed_orders().len(), 2);

        // One millisecond past expiry: re-entry is allowed again.
        let events = tick(&mut strategy, &exchange, "2000", cooldown_until + 1).await;
        assert_eq!(events.len(), 1);
        assert_eq!(exchange.placed_orders().len(), 3);
        assert!(strategy.cooldown_until().is_none());
    }

    #[tokio::test]
    async fn take_profit_wins_when_bounds_are_degenerate() {
        // stop_loss above take_profit: both thresholds satisfied at
        // once, the profitable branch must execute.
        let degenerate = DirectionalParams {
            leverage: Decimal::ONE,
            take_profit_pct: dec("-0.05"), // tp = 1900
            stop_loss_pct: dec("0.02"),    // sl = 1960
            cooldown: Duration::from_secs(1800),
        };
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, degenerate).await;
        tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        let events = tick(&mut strategy, &exchange, "1950", NOW_MS + 1000).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StrategyEvent::TakeProfitHit { .. }));
        assert!(strategy.cooldown_until().is_none());
    }

    #[tokio::test]
    async fn never_holds_two_positions() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;
        tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        // Ticks inside the bracket while open: no further entries.
        for i in 0..5 {
            let events = tick(&mut strategy, &exchange, "2010", NOW_MS + i * 1000).await;
            assert!(events.is_empty());
        }
        let buys = exchange
            .placed_orders()
            .iter()
            .filter(|o| o.side == Side::Buy)
            .count();
        assert_eq!(buys, 1);
    }

    #[tokio::test]
    async fn transient_balance_failure_propagates_with_state_unchanged() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;

        exchange.fail_next(ExchangeError::Transient("500 internal".to_string()));
        let t = ticker("2000");
        let ctx = TickContext {
            ticker: &t,
            exchange: &exchange,
            now_ms: NOW_MS,
        };
        let err = strategy.on_tick(&ctx).await.unwrap_err();

        assert!(matches!(err, ExchangeError::Transient(_)));
        assert!(strategy.is_flat());
        assert!(exchange.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn rejected_entry_order_reverts_to_flat_and_defers() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;

        // Balance fetch succeeds, the submission itself is refused.
        exchange.fail_next_place(ExchangeError::OrderRejected {
            reason: "INSUFFICIENT_MARGIN".to_string(),
        });
        let events = tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        assert!(events.is_empty());
        assert!(strategy.is_flat());
        assert!(exchange.placed_orders().is_empty());

        // The rejection is not retried verbatim: the next tick
        // re-evaluates from scratch and may enter again.
        let events = tick(&mut strategy, &exchange, "2000", NOW_MS + 1000).await;
        assert_eq!(events.len(), 1);
        assert!(strategy.open_position().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn partially_filled_exit_keeps_the_remainder_open() {
        let exchange = ScriptedExchange::new(FillPolicy::Immediate);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;
        tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        // Only 0.2 of the 0.5 take-profit sell executes before the
        // order is reconciled away.
        exchange.partial_fill_next_place(dec("0.2"));
        let events = tick(&mut strategy, &exchange, "2050", NOW_MS + 1000).await;

        assert!(events.is_empty());
        let remainder = strategy.open_position().expect("remainder must stay open");
        assert_eq!(remainder.quantity, dec("0.3"));
        assert!(strategy.cooldown_until().is_none());

        // The next tick re-evaluates the exit and sells the rest.
        let events = tick(&mut strategy, &exchange, "2050", NOW_MS + 2000).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StrategyEvent::TakeProfitHit { quantity, .. } => {
                assert_eq!(*quantity, dec("0.3"));
            }
            other => panic!("expected TakeProfitHit, got {other:?}"),
        }
        assert!(strategy.is_flat());
    }

    #[tokio::test(start_paused = true)]
    async fn unfilled_entry_is_cancelled_and_state_reverts() {
        let exchange = ScriptedExchange::new(FillPolicy::Resting);
        exchange.set_free_balance("USDC", dec("1000"));
        exchange.set_market_price(dec("2000"));
        let mut strategy = ready_strategy(&exchange, params()).await;

        let events = tick(&mut strategy, &exchange, "2000", NOW_MS).await;

        assert!(events.is_empty());
        assert!(strategy.is_flat());
        // The resting order was reconciled away, not left dangling.
        assert_eq!(exchange.cancelled_orders().len(), 1);
    }
}
