//! Error types for the OANDA v20 integration.

use fx_timebot_core::BrokerError;
use thiserror::Error;

/// Errors that can occur when talking to OANDA.
#[derive(Debug, Error)]
pub enum OandaError {
    /// Token missing or rejected (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// API request failed with a status not covered below.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// `errorMessage` from the body, or the raw body.
        message: String,
    },

    /// 404 for an account, instrument, or position.
    #[error("not found: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// Rate limit exceeded (429).
    #[error("rate limit exceeded")]
    RateLimit,

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Pricing response carried no usable bid/ask.
    #[error("no price available for {instrument}")]
    NoPrice {
        /// Requested instrument.
        instrument: String,
    },

    /// Order was accepted but cancelled (e.g. FOK not filled).
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Instrument id would be unsafe in a URL path.
    #[error("invalid instrument: {0}")]
    InvalidInstrument(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl OandaError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Returns true if the error indicates the request may succeed later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for OandaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OandaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<OandaError> for BrokerError {
    fn from(err: OandaError) -> Self {
        match err {
            OandaError::Unauthorized(msg) => Self::Unauthorized(msg),
            OandaError::Api {
                status_code,
                message,
            } => Self::Api {
                status: status_code,
                message,
            },
            OandaError::NotFound { resource } => Self::NotFound(resource),
            OandaError::RateLimit => Self::Api {
                status: 429,
                message: "rate limit exceeded".to_string(),
            },
            OandaError::Network(msg) => Self::Transport(msg),
            OandaError::Timeout(msg) => Self::Timeout(msg),
            OandaError::NoPrice { instrument } => Self::QuoteUnavailable { instrument },
            OandaError::OrderRejected(reason) => Self::Rejected(reason),
            OandaError::InvalidInstrument(msg) | OandaError::Configuration(msg) => {
                Self::InvalidRequest(msg)
            }
            OandaError::Serialization(msg) => Self::Malformed(msg),
        }
    }
}

/// Result type alias for OANDA operations.
pub type Result<T> = std::result::Result<T, OandaError>;
