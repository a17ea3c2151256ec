//! Broker capability contract consumed by the trigger engine.
//!
//! Implementations live in exchange crates. The engine only sees these
//! types, so tests can substitute an in-memory broker.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Best bid/ask for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Quote {
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// A long market order with a take-profit and optional stop-loss attached on fill.
///
/// Prices are already rounded and formatted for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub instrument: String,
    /// Positive = long.
    pub units: i64,
    pub take_profit: String,
    pub stop_loss: Option<String>,
}

/// Broker acknowledgement of a filled market order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: Option<String>,
    pub fill_id: Option<String>,
    pub fill_price: Option<Decimal>,
}

/// Result of closing the long side of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseConfirmation {
    Closed {
        transaction_id: Option<String>,
        units: Option<Decimal>,
    },
    /// Nothing was open; closing was a no-op.
    AlreadyFlat,
}

/// Errors surfaced by a broker.
///
/// `NotFound` is a domain value for position lookups and closes, not a
/// failure: the engine maps it to "flat" and "already closed".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Network failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// Request exceeded its deadline.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Non-2xx response not covered by a more specific variant.
    #[error("broker API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Credentials rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource (position, instrument) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Order accepted by the API but cancelled or rejected.
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("no quote available for {instrument}")]
    QuoteUnavailable { instrument: String },

    /// Response body could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Request refused locally before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BrokerError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Network-level and server-side failures that the next tick may clear.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Capabilities the trigger engine needs from a broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Current bid/ask; fails when no price is available.
    async fn get_quote(&self, instrument: &str) -> Result<Quote, BrokerError>;

    /// Whether long units > 0 are open. A missing position is `false`.
    async fn has_open_long(&self, instrument: &str) -> Result<bool, BrokerError>;

    /// Submits an immediate market order with its protective prices.
    async fn open_long_market(&self, order: &MarketOrder)
        -> Result<OrderConfirmation, BrokerError>;

    /// Closes all long units. A missing position is `AlreadyFlat`.
    async fn close_all_long(&self, instrument: &str) -> Result<CloseConfirmation, BrokerError>;
}
