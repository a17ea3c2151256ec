//! OANDA v20 integration for the FX time trigger.
//!
//! This crate provides:
//! - REST client with rate limiting for the OANDA v20 API
//! - Bearer-token configuration from the environment
//! - A [`fx_timebot_core::Broker`] implementation for the trigger engine
//!
//! # Authentication
//!
//! Set the following environment variables:
//!
//! - `OANDA_TOKEN`: personal access token
//! - `OANDA_ACCOUNT_ID`: v20 account id
//! - `OANDA_ENV`: `practice` (default) or `live`
//!
//! # API Endpoints
//!
//! - `GET /v3/accounts/{id}/pricing?instruments={instrument}` - Best bid/ask
//! - `GET /v3/accounts/{id}/positions/{instrument}` - Position by side
//! - `POST /v3/accounts/{id}/orders` - Market order with TP/SL on fill
//! - `PUT /v3/accounts/{id}/positions/{instrument}/close` - Close long units

pub mod broker;
pub mod client;
pub mod error;
pub mod types;

pub use client::{
    OandaClient, OandaClientConfig, OandaEnvironment, ENV_ACCOUNT_ID, ENV_ENVIRONMENT, ENV_TOKEN,
    OANDA_LIVE_URL, OANDA_PRACTICE_URL,
};
pub use error::{OandaError, Result};
pub use types::{Position, PositionSide, TimeInForce};
