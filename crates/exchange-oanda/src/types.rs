//! OANDA v20 wire types.
//!
//! Only the fields the trigger needs are modelled; everything else in the
//! responses is ignored. Prices and units arrive as decimal strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Pricing
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PricingResponse {
    #[serde(default)]
    pub prices: Vec<ClientPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClientPrice {
    #[serde(default)]
    pub bids: Vec<PriceBucket>,
    #[serde(default)]
    pub asks: Vec<PriceBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PriceBucket {
    pub price: Decimal,
}

// =============================================================================
// Positions
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PositionResponse {
    pub position: Position,
}

/// Net position for one instrument, split by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub long: PositionSide,
    #[serde(default)]
    pub short: PositionSide,
}

impl Position {
    #[must_use]
    pub fn has_open_long(&self) -> bool {
        self.long.units > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSide {
    #[serde(default)]
    pub units: Decimal,
    pub average_price: Option<Decimal>,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: Option<Decimal>,
}

// =============================================================================
// Orders
// =============================================================================

/// How long a market order may wait for a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Fill completely or cancel.
    #[default]
    #[serde(rename = "FOK")]
    FillOrKill,
    /// Fill what is available now, cancel the rest.
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct OrderEnvelope<'a> {
    pub order: MarketOrderRequest<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarketOrderRequest<'a> {
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub instrument: &'a str,
    pub units: String,
    pub time_in_force: TimeInForce,
    pub position_fill: &'static str,
    pub take_profit_on_fill: PriceDetails<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_on_fill: Option<PriceDetails<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PriceDetails<'a> {
    pub price: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderCreateResponse {
    pub order_create_transaction: Option<Transaction>,
    pub order_fill_transaction: Option<FillTransaction>,
    pub order_cancel_transaction: Option<CancelTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Transaction {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FillTransaction {
    pub id: String,
    pub price: Option<Decimal>,
    pub units: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CancelTransaction {
    pub reason: Option<String>,
}

// =============================================================================
// Position close
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClosePositionRequest {
    pub long_units: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClosePositionResponse {
    pub long_order_fill_transaction: Option<FillTransaction>,
    pub long_order_cancel_transaction: Option<CancelTransaction>,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}
