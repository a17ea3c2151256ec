//! OANDA v20 REST client with rate limiting.
//!
//! Covers the four calls the trigger needs: pricing, position lookup,
//! market order submission, and closing the long side of a position.
//!
//! # Example
//!
//! ```ignore
//! use fx_timebot_oanda::{OandaClient, OandaClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OandaClient::new(OandaClientConfig::from_env()?)?;
//!
//!     let quote = client.get_quote("EUR_USD").await?;
//!     println!("bid {} / ask {}", quote.bid, quote.ask);
//!
//!     Ok(())
//! }
//! ```

use crate::error::{OandaError, Result};
use crate::types::{
    ClosePositionRequest, ClosePositionResponse, ErrorBody, MarketOrderRequest, OrderCreateResponse,
    OrderEnvelope, Position, PositionResponse, PriceDetails, PricingResponse, TimeInForce,
};
use fx_timebot_core::{CloseConfirmation, MarketOrder, OrderConfirmation, Quote};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Constants
// =============================================================================

/// OANDA practice (demo) REST base URL.
pub const OANDA_PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";

/// OANDA live REST base URL.
pub const OANDA_LIVE_URL: &str = "https://api-fxtrade.oanda.com";

/// Environment variable holding `practice` or `live`.
pub const ENV_ENVIRONMENT: &str = "OANDA_ENV";

/// Environment variable holding the personal access token.
pub const ENV_TOKEN: &str = "OANDA_TOKEN";

/// Environment variable holding the v20 account id.
pub const ENV_ACCOUNT_ID: &str = "OANDA_ACCOUNT_ID";

/// Returned by a close when the requested side has no units.
const CLOSEOUT_POSITION_DOESNT_EXIST: &str = "CLOSEOUT_POSITION_DOESNT_EXIST";

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 300;

// =============================================================================
// Configuration
// =============================================================================

/// Which OANDA deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OandaEnvironment {
    #[default]
    Practice,
    Live,
}

impl OandaEnvironment {
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Practice => OANDA_PRACTICE_URL,
            Self::Live => OANDA_LIVE_URL,
        }
    }
}

impl FromStr for OandaEnvironment {
    type Err = OandaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "practice" | "demo" => Ok(Self::Practice),
            "live" | "trade" => Ok(Self::Live),
            other => Err(OandaError::Configuration(format!(
                "unknown OANDA environment {other:?}, expected practice or live"
            ))),
        }
    }
}

impl std::fmt::Display for OandaEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Practice => write!(f, "practice"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Configuration for the OANDA client.
#[derive(Debug)]
pub struct OandaClientConfig {
    pub environment: OandaEnvironment,

    /// Base URL; defaults to the environment's URL.
    pub base_url: String,

    /// v20 account id, e.g. `101-004-1234567-001`.
    pub account_id: String,

    /// Bearer token. Never logged.
    pub token: SecretString,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Client-side request budget.
    pub requests_per_second: NonZeroU32,

    pub time_in_force: TimeInForce,
}

impl OandaClientConfig {
    /// Creates a configuration with default timeout and rate limit.
    pub fn new(
        environment: OandaEnvironment,
        account_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            base_url: environment.base_url().to_string(),
            account_id: account_id.into(),
            token: SecretString::from(token.into()),
            timeout_secs: 10,
            requests_per_second: nonzero!(20u32),
            time_in_force: TimeInForce::default(),
        }
    }

    /// Reads `OANDA_ENV` (default `practice`), `OANDA_TOKEN`, and
    /// `OANDA_ACCOUNT_ID`.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or the environment is unknown.
    pub fn from_env() -> Result<Self> {
        let environment = match std::env::var(ENV_ENVIRONMENT) {
            Ok(value) => value.parse()?,
            Err(_) => OandaEnvironment::Practice,
        };
        let token = required_env(ENV_TOKEN)?;
        let account_id = required_env(ENV_ACCOUNT_ID)?;

        Ok(Self::new(environment, account_id, token))
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    #[must_use]
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| OandaError::Configuration(format!("missing environment variable: {name}")))
}

// =============================================================================
// OandaClient
// =============================================================================

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// OANDA v20 REST client.
pub struct OandaClient {
    config: OandaClientConfig,
    http: Client,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl std::fmt::Debug for OandaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OandaClient")
            .field("environment", &self.config.environment)
            .field("base_url", &self.config.base_url)
            .field("account_id", &self.config.account_id)
            .finish_non_exhaustive()
    }
}

impl OandaClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the account id is malformed or the HTTP client cannot be built.
    pub fn new(config: OandaClientConfig) -> Result<Self> {
        Self::validate_identifier(&config.account_id)?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OandaError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_second(config.requests_per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    /// Creates a client from `OANDA_*` environment variables.
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::new(OandaClientConfig::from_env()?)
    }

    #[must_use]
    pub fn environment(&self) -> OandaEnvironment {
        self.config.environment
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Instruments are `BASE_QUOTE`: uppercase letters, digits, one underscore.
    fn validate_instrument(instrument: &str) -> Result<&str> {
        let valid = !instrument.is_empty()
            && instrument.len() <= 32
            && instrument.matches('_').count() == 1
            && instrument
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(OandaError::InvalidInstrument(instrument.to_string()));
        }
        Ok(instrument)
    }

    /// Account ids are digits and hyphens.
    fn validate_identifier(id: &str) -> Result<&str> {
        if id.is_empty()
            || id.len() > 64
            || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(OandaError::Configuration(format!(
                "invalid account id: {id:?}"
            )));
        }
        Ok(id)
    }

    fn account_url(&self, suffix: &str) -> String {
        format!(
            "{}/v3/accounts/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id,
            suffix
        )
    }

    /// Waits for the rate limiter, authenticates, and sends.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let response = request
            .bearer_auth(self.config.token.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await?;

        Ok(response)
    }

    /// Decodes a success body or maps the status to an error.
    async fn read<T: DeserializeOwned>(resource: &str, response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::status_error(status, resource, &body))
    }

    fn status_error(status: StatusCode, resource: &str, body: &str) -> OandaError {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let code = parsed.as_ref().and_then(|b| b.error_code.as_deref());
        let message = parsed
            .as_ref()
            .and_then(|b| b.error_message.clone())
            .unwrap_or_else(|| truncate(body, MAX_ERROR_BODY));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OandaError::Unauthorized(message),
            StatusCode::NOT_FOUND => OandaError::not_found(resource),
            StatusCode::TOO_MANY_REQUESTS => OandaError::RateLimit,
            _ if code == Some(CLOSEOUT_POSITION_DOESNT_EXIST) => OandaError::not_found(resource),
            _ => OandaError::api(status.as_u16(), message),
        }
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Gets the current best bid and ask.
    ///
    /// # Errors
    /// Returns `NoPrice` if the response has no bid or ask.
    pub async fn get_quote(&self, instrument: &str) -> Result<Quote> {
        let instrument = Self::validate_instrument(instrument)?;
        let url = self.account_url("/pricing");
        tracing::debug!("GET {} instruments={}", url, instrument);

        let request = self.http.get(&url).query(&[("instruments", instrument)]);
        let response: PricingResponse =
            Self::read(instrument, self.send(request).await?).await?;

        let no_price = || OandaError::NoPrice {
            instrument: instrument.to_string(),
        };
        let price = response.prices.into_iter().next().ok_or_else(no_price)?;
        let bid = price.bids.first().ok_or_else(no_price)?.price;
        let ask = price.asks.first().ok_or_else(no_price)?.price;

        Ok(Quote { bid, ask })
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Gets the position for an instrument, `None` if the account never held it.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_position(&self, instrument: &str) -> Result<Option<Position>> {
        let instrument = Self::validate_instrument(instrument)?;
        let url = self.account_url(&format!("/positions/{instrument}"));
        tracing::debug!("GET {}", url);

        let response = self.send(self.http.get(&url)).await?;
        match Self::read::<PositionResponse>(instrument, response).await {
            Ok(body) => Ok(Some(body.position)),
            Err(OandaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether long units > 0 are open. A missing position is `false`.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn has_open_long(&self, instrument: &str) -> Result<bool> {
        Ok(self
            .get_position(instrument)
            .await?
            .is_some_and(|p| p.has_open_long()))
    }

    /// Closes all long units of a position. Missing or empty = `AlreadyFlat`.
    ///
    /// # Errors
    /// Returns error if the API call fails or the close is cancelled.
    pub async fn close_long_position(&self, instrument: &str) -> Result<CloseConfirmation> {
        let instrument = Self::validate_instrument(instrument)?;
        let url = self.account_url(&format!("/positions/{instrument}/close"));
        tracing::debug!("PUT {}", url);

        let request = self
            .http
            .put(&url)
            .json(&ClosePositionRequest { long_units: "ALL" });
        let response = self.send(request).await?;

        let body = match Self::read::<ClosePositionResponse>(instrument, response).await {
            Ok(body) => body,
            Err(OandaError::NotFound { .. }) => return Ok(CloseConfirmation::AlreadyFlat),
            Err(e) => return Err(e),
        };

        match (body.long_order_fill_transaction, body.long_order_cancel_transaction) {
            (Some(fill), _) => Ok(CloseConfirmation::Closed {
                transaction_id: Some(fill.id),
                units: fill.units,
            }),
            (None, Some(cancel)) => Err(OandaError::OrderRejected(
                cancel.reason.unwrap_or_else(|| "close cancelled".to_string()),
            )),
            (None, None) => Ok(CloseConfirmation::Closed {
                transaction_id: None,
                units: None,
            }),
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Submits a market order with take-profit and optional stop-loss on fill.
    ///
    /// # Errors
    /// Returns `OrderRejected` if OANDA cancels the order instead of filling it.
    pub async fn submit_market_order(&self, order: &MarketOrder) -> Result<OrderConfirmation> {
        let instrument = Self::validate_instrument(&order.instrument)?;
        let url = self.account_url("/orders");

        let envelope = OrderEnvelope {
            order: MarketOrderRequest {
                order_type: "MARKET",
                instrument,
                units: order.units.to_string(),
                time_in_force: self.config.time_in_force,
                position_fill: "DEFAULT",
                take_profit_on_fill: PriceDetails {
                    price: &order.take_profit,
                },
                stop_loss_on_fill: order
                    .stop_loss
                    .as_deref()
                    .map(|price| PriceDetails { price }),
            },
        };
        tracing::debug!(
            "POST {} units={} tp={} sl={:?}",
            url,
            order.units,
            order.take_profit,
            order.stop_loss
        );

        let response = self.send(self.http.post(&url).json(&envelope)).await?;
        let body: OrderCreateResponse = Self::read(instrument, response).await?;

        if body.order_fill_transaction.is_none() {
            if let Some(cancel) = body.order_cancel_transaction {
                return Err(OandaError::OrderRejected(
                    cancel.reason.unwrap_or_else(|| "order cancelled".to_string()),
                ));
            }
        }

        Ok(OrderConfirmation {
            order_id: body.order_create_transaction.map(|t| t.id),
            fill_price: body.order_fill_transaction.as_ref().and_then(|f| f.price),
            fill_id: body.order_fill_transaction.map(|f| f.id),
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: &str = "101-004-1234567-001";

    fn client_for(server: &MockServer) -> OandaClient {
        let config = OandaClientConfig::new(OandaEnvironment::Practice, ACCOUNT, "test-token")
            .with_base_url(server.uri())
            .with_timeout_secs(1);
        OandaClient::new(config).unwrap()
    }

    fn account_path(suffix: &str) -> String {
        format!("/v3/accounts/{ACCOUNT}{suffix}")
    }

    fn eur_usd_order(stop_loss: Option<&str>) -> MarketOrder {
        MarketOrder {
            instrument: "EUR_USD".to_string(),
            units: 10_000,
            take_profit: "1.08600".to_string(),
            stop_loss: stop_loss.map(str::to_string),
        }
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_environment_urls() {
        assert_eq!(OandaEnvironment::Practice.base_url(), OANDA_PRACTICE_URL);
        assert_eq!(OandaEnvironment::Live.base_url(), OANDA_LIVE_URL);
        assert!(OANDA_LIVE_URL.starts_with("https://"));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("practice".parse::<OandaEnvironment>().unwrap(), OandaEnvironment::Practice);
        assert_eq!("LIVE".parse::<OandaEnvironment>().unwrap(), OandaEnvironment::Live);
        assert!("paper".parse::<OandaEnvironment>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = OandaClientConfig::new(OandaEnvironment::Live, ACCOUNT, "t")
            .with_timeout_secs(3)
            .with_rate_limit(nonzero!(5u32))
            .with_time_in_force(TimeInForce::ImmediateOrCancel);
        assert_eq!(config.base_url, OANDA_LIVE_URL);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.requests_per_second.get(), 5);
        assert_eq!(config.time_in_force, TimeInForce::ImmediateOrCancel);
    }

    #[test]
    fn test_token_not_in_debug_output() {
        let config = OandaClientConfig::new(OandaEnvironment::Practice, ACCOUNT, "super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
        let client = OandaClient::new(config).unwrap();
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    #[test]
    fn test_rejects_malformed_account_id() {
        let config = OandaClientConfig::new(OandaEnvironment::Practice, "../admin", "t");
        assert!(matches!(
            OandaClient::new(config),
            Err(OandaError::Configuration(_))
        ));
    }

    // ==================== Input Validation Tests ====================

    #[test]
    fn test_validate_instrument() {
        assert!(OandaClient::validate_instrument("EUR_USD").is_ok());
        assert!(OandaClient::validate_instrument("DE30_EUR").is_ok());
        assert!(OandaClient::validate_instrument("").is_err());
        assert!(OandaClient::validate_instrument("EURUSD").is_err());
        assert!(OandaClient::validate_instrument("../EUR_USD").is_err());
        assert!(OandaClient::validate_instrument("EUR_USD/close").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    // ==================== Pricing Tests ====================

    #[tokio::test]
    async fn test_get_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/pricing")))
            .and(query_param("instruments", "EUR_USD"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "prices": [{
                    "instrument": "EUR_USD",
                    "tradeable": true,
                    "bids": [{"price": "1.08490", "liquidity": 1000000}],
                    "asks": [{"price": "1.08500", "liquidity": 1000000}]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quote = client_for(&server).get_quote("EUR_USD").await.unwrap();
        assert_eq!(quote.bid, dec!(1.08490));
        assert_eq!(quote.ask, dec!(1.08500));
    }

    #[tokio::test]
    async fn test_get_quote_without_prices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/pricing")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "prices": []
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_quote("EUR_USD").await.unwrap_err();
        assert!(matches!(err, OandaError::NoPrice { .. }));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/pricing")))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "errorMessage": "Insufficient authorization to perform request."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_quote("EUR_USD").await.unwrap_err();
        assert!(matches!(err, OandaError::Unauthorized(ref m) if m.contains("Insufficient")));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/pricing")))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_quote("EUR_USD").await.unwrap_err();
        assert!(matches!(err, OandaError::Api { status_code: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/pricing")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(3))
                    .set_body_json(serde_json::json!({"prices": []})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).get_quote("EUR_USD").await.unwrap_err();
        assert!(matches!(err, OandaError::Timeout(_)), "got {err:?}");
    }

    // ==================== Position Tests ====================

    #[tokio::test]
    async fn test_missing_position_is_flat() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/positions/EUR_USD")))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errorMessage": "The Position specified does not exist"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.get_position("EUR_USD").await.unwrap().is_none());
        assert!(!client.has_open_long("EUR_USD").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_long_position() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/positions/EUR_USD")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "position": {
                    "instrument": "EUR_USD",
                    "long": {"units": "10000", "averagePrice": "1.08500"},
                    "short": {"units": "0"}
                },
                "lastTransactionID": "6360"
            })))
            .mount(&server)
            .await;

        assert!(client_for(&server).has_open_long("EUR_USD").await.unwrap());
    }

    #[tokio::test]
    async fn test_short_only_position_is_not_long() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path("/positions/EUR_USD")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "position": {
                    "instrument": "EUR_USD",
                    "long": {"units": "0"},
                    "short": {"units": "-2000"}
                }
            })))
            .mount(&server)
            .await;

        assert!(!client_for(&server).has_open_long("EUR_USD").await.unwrap());
    }

    // ==================== Order Tests ====================

    #[tokio::test]
    async fn test_submit_market_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(account_path("/orders")))
            .and(body_partial_json(serde_json::json!({
                "order": {
                    "type": "MARKET",
                    "instrument": "EUR_USD",
                    "units": "10000",
                    "timeInForce": "FOK",
                    "positionFill": "DEFAULT",
                    "takeProfitOnFill": {"price": "1.08600"}
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "orderCreateTransaction": {"id": "6361", "type": "MARKET_ORDER"},
                "orderFillTransaction": {"id": "6362", "price": "1.08502", "units": "10000"},
                "lastTransactionID": "6363"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let confirmation = client_for(&server)
            .submit_market_order(&eur_usd_order(None))
            .await
            .unwrap();
        assert_eq!(confirmation.order_id.as_deref(), Some("6361"));
        assert_eq!(confirmation.fill_id.as_deref(), Some("6362"));
        assert_eq!(confirmation.fill_price, Some(dec!(1.08502)));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["order"].get("stopLossOnFill").is_none());
    }

    #[tokio::test]
    async fn test_submit_order_with_stop_loss() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(account_path("/orders")))
            .and(body_partial_json(serde_json::json!({
                "order": {"stopLossOnFill": {"price": "1.08300"}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "orderCreateTransaction": {"id": "1"},
                "orderFillTransaction": {"id": "2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .submit_market_order(&eur_usd_order(Some("1.08300")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_order_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(account_path("/orders")))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "orderCreateTransaction": {"id": "6361"},
                "orderCancelTransaction": {"id": "6362", "reason": "MARKET_HALTED"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit_market_order(&eur_usd_order(None))
            .await
            .unwrap_err();
        assert!(matches!(err, OandaError::OrderRejected(ref r) if r == "MARKET_HALTED"));
    }

    #[tokio::test]
    async fn test_invalid_order_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(account_path("/orders")))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorCode": "TAKE_PROFIT_ON_FILL_PRICE_PRECISION_EXCEEDED",
                "errorMessage": "The take profit on fill price specified contains more precision than is allowed"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit_market_order(&eur_usd_order(None))
            .await
            .unwrap_err();
        assert!(matches!(err, OandaError::Api { status_code: 400, ref message } if message.contains("precision")));
    }

    // ==================== Close Tests ====================

    #[tokio::test]
    async fn test_close_long_position() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(account_path("/positions/EUR_USD/close")))
            .and(body_partial_json(serde_json::json!({"longUnits": "ALL"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "longOrderCreateTransaction": {"id": "7000"},
                "longOrderFillTransaction": {"id": "7001", "units": "-10000", "price": "1.08550"},
                "lastTransactionID": "7001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let closed = client_for(&server)
            .close_long_position("EUR_USD")
            .await
            .unwrap();
        assert_eq!(
            closed,
            CloseConfirmation::Closed {
                transaction_id: Some("7001".to_string()),
                units: Some(dec!(-10000)),
            }
        );
    }

    #[tokio::test]
    async fn test_close_missing_position_is_already_flat() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(account_path("/positions/EUR_USD/close")))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let closed = client_for(&server)
            .close_long_position("EUR_USD")
            .await
            .unwrap();
        assert_eq!(closed, CloseConfirmation::AlreadyFlat);
    }

    #[tokio::test]
    async fn test_close_empty_long_side_is_already_flat() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(account_path("/positions/EUR_USD/close")))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "longOrderRejectTransaction": {"rejectReason": "CLOSEOUT_POSITION_DOESNT_EXIST"},
                "errorCode": "CLOSEOUT_POSITION_DOESNT_EXIST",
                "errorMessage": "The Position requested to be closed out does not exist"
            })))
            .mount(&server)
            .await;

        let closed = client_for(&server)
            .close_long_position("EUR_USD")
            .await
            .unwrap();
        assert_eq!(closed, CloseConfirmation::AlreadyFlat);
    }
}
