// src/connectors/backpack.rs
use crate::connectors::messages::{
    ApiErrorBody, CapitalEntry, MarketEntry, OrderPayload, OrderResponse, TickerResponse,
};
use crate::connectors::sign::build_signed_request;
use crate::connectors::traits::ExchangeApi;
use crate::error::ExchangeError;
use crate::types::{
    AssetBalance, Balance, Credentials, Market, Order, OrderRequest, OrderType, Ticker,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

const BASE_URL: &str = "https://api.backpack.exchange";
/// Backpack's documented rate limit: one request per second.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Enforces the exchange's minimum inter-request interval. The mutex
/// is held across the wait so concurrent callers queue instead of
/// bursting.
pub(crate) struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub(crate) async fn acquire(&self) {
        let mut next = self.next_slot.lock().await;
        let now = Instant::now();
        if *next > now {
            tokio::time::sleep_until(*next).await;
        }
        *next = Instant::now() + self.min_interval;
    }
}

/// A non-2xx response, decoded far enough to classify.
struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) if !body.message.is_empty() => body.message,
            Ok(body) if !body.code.is_empty() => body.code,
            _ => text,
        };
        Self { status, message }
    }

    /// Auth and transient classifications are shared by every call.
    fn common(&self) -> Option<ExchangeError> {
        if matches!(
            self.status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Some(ExchangeError::Auth(self.message.clone()));
        }
        if self.status.is_server_error() || self.status == StatusCode::TOO_MANY_REQUESTS {
            return Some(ExchangeError::Transient(format!(
                "{}: {}",
                self.status, self.message
            )));
        }
        None
    }

    fn into_market_data_error(self) -> ExchangeError {
        self.common().unwrap_or_else(|| {
            ExchangeError::MarketData(format!("{}: {}", self.status, self.message))
        })
    }

    /// Placement failures: the remaining 4xx carry the exchange's
    /// rejection reason.
    fn into_order_error(self) -> ExchangeError {
        self.common()
            .unwrap_or(ExchangeError::OrderRejected {
                reason: self.message,
            })
    }

    /// Lookup/cancel failures: an unknown order is benign.
    fn into_lookup_error(self, order_id: &str) -> ExchangeError {
        if let Some(err) = self.common() {
            return err;
        }
        let not_found = self.status == StatusCode::NOT_FOUND
            || self.message.to_ascii_lowercase().contains("not found")
            || self.message.contains("RESOURCE_NOT_FOUND");
        if not_found {
            ExchangeError::OrderNotFound(order_id.to_string())
        } else {
            ExchangeError::MarketData(format!("{}: {}", self.status, self.message))
        }
    }
}

/// Authenticated Backpack REST adapter. All calls flow through one
/// shared rate limiter.
pub struct BackpackClient {
    credentials: Credentials,
    http: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl BackpackClient {
    pub fn new(credentials: Credentials) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            credentials,
            http,
            base_url: BASE_URL.to_string(),
            limiter: RateLimiter::new(MIN_REQUEST_INTERVAL),
        }
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ExchangeError> {
        let mut url = format!("{}{}", self.base_url, path);
        if !query.is_empty() {
            let qs = serde_urlencoded::to_string(query)
                .map_err(|e| ExchangeError::MarketData(e.to_string()))?;
            url.push('?');
            url.push_str(&qs);
        }
        Ok(url)
    }

    async fn send_public(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ExchangeError> {
        self.limiter.acquire().await;
        let url = self.url(path, query)?;
        debug!(%url, "public request");
        Ok(self.http.get(&url).send().await?)
    }

    async fn send_signed(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, ExchangeError> {
        self.limiter.acquire().await;
        let body_json = body.map(|v| v.to_string());
        let signed = build_signed_request(
            &method,
            path,
            body_json.as_deref(),
            &self.credentials,
            Utc::now().timestamp_millis(),
        )?;
        let url = self.url(path, query)?;
        debug!(%url, method = %method, signed_path = %signed.path, "signed request");

        let mut req = self.http.request(method, &url);
        for (name, value) in &signed.headers {
            req = req.header(*name, value);
        }
        if let Some(b) = signed.body {
            req = req.body(b);
        }
        Ok(req.send().await?)
    }

    fn map_order(resp: OrderResponse) -> Order {
        Order {
            id: resp.order_id,
            client_id: resp.client_id,
            symbol: resp.symbol,
            side: resp.side,
            order_type: resp.order_type,
            requested_qty: resp.quantity,
            filled_qty: resp.filled,
            price: resp.price,
            avg_price: resp.average_price,
            status: resp.status,
        }
    }
}

#[async_trait]
impl ExchangeApi for BackpackClient {
    async fn load_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let resp = self.send_public("/api/v1/markets", &[]).await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp)
                .await
                .into_market_data_error());
        }
        let entries: Vec<MarketEntry> = resp.json().await?;
        Ok(entries
            .into_iter()
            .map(|m| Market {
                display_symbol: format!("{}/{}", m.base_symbol, m.quote_symbol),
                symbol_id: m.symbol,
                base_asset: m.base_symbol,
                quote_asset: m.quote_symbol,
                tick_size: m.filters.price.tick_size,
                step_size: m.filters.quantity.step_size,
            })
            .collect())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let resp = self
            .send_public("/api/v1/ticker", &[("symbol", symbol)])
            .await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp)
                .await
                .into_market_data_error());
        }
        let raw: TickerResponse = resp.json().await?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: raw.last_price,
            bid: raw.best_bid,
            ask: raw.best_ask,
            high: raw.high,
            low: raw.low,
            volume: raw.volume,
            fetched_at: Utc::now().timestamp_millis(),
        })
    }

    async fn fetch_balance(&self) -> Result<Balance, ExchangeError> {
        let resp = self
            .send_signed(Method::GET, "/api/v1/capital", &[], None)
            .await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp)
                .await
                .into_market_data_error());
        }
        let entries: Vec<CapitalEntry> = resp.json().await?;
        let mut balance = Balance::default();
        for entry in entries {
            balance.assets.insert(
                entry.asset.to_uppercase(),
                AssetBalance {
                    free: entry.free,
                    total: entry.total,
                },
            );
        }
        Ok(balance)
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Order, ExchangeError> {
        match request.order_type {
            OrderType::Limit if request.price.is_none() => {
                return Err(ExchangeError::Config(
                    "limit order requires a price".to_string(),
                ))
            }
            OrderType::Market if request.price.is_some() => {
                return Err(ExchangeError::Config(
                    "market order must not carry a price".to_string(),
                ))
            }
            _ => {}
        }

        let payload = OrderPayload {
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity.to_string(),
            price: request.price.map(|p| p.to_string()),
            client_id: request.client_id.clone(),
        };
        let body = serde_json::to_value(&payload)?;

        info!(
            symbol = %request.symbol,
            side = %request.side,
            order_type = ?request.order_type,
            quantity = %request.quantity,
            price = ?request.price,
            "submitting order"
        );

        let resp = self
            .send_signed(Method::POST, "/api/v1/order", &[], Some(&body))
            .await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp).await.into_order_error());
        }
        let raw: OrderResponse = resp.json().await?;
        Ok(Self::map_order(raw))
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), ExchangeError> {
        let body = serde_json::json!({ "symbol": symbol, "orderId": order_id });
        let resp = self
            .send_signed(Method::DELETE, "/api/v1/order", &[], Some(&body))
            .await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp)
                .await
                .into_lookup_error(order_id));
        }
        Ok(())
    }

    async fn fetch_order(&self, symbol: &str, order_id: &str) -> Result<Order, ExchangeError> {
        let resp = self
            .send_signed(
                Method::GET,
                "/api/v1/order",
                &[("symbol", symbol), ("orderId", order_id)],
                None,
            )
            .await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp)
                .await
                .into_lookup_error(order_id));
        }
        let raw: OrderResponse = resp.json().await?;
        Ok(Self::map_order(raw))
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError> {
        let resp = self
            .send_signed(Method::GET, "/api/v1/orders", &[("symbol", symbol)], None)
            .await?;
        if !resp.status().is_success() {
            return Err(ApiFailure::from_response(resp)
                .await
                .into_market_data_error());
        }
        let raw: Vec<OrderResponse> = resp.json().await?;
        Ok(raw.into_iter().map(Self::map_order).collect())
    }
}
