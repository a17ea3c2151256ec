use crate::pricing::{pip_size, PipMode};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub broker: BrokerSettings,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

/// How the entry time is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// First tick at or after the entry minute.
    #[default]
    Robust,
    /// Only during the entry minute itself.
    Exact,
}

/// Trigger engine parameters. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: String,
    /// Position size; positive = long.
    pub units: i64,
    /// IANA zone name for all wall-clock rules.
    pub timezone: String,
    pub entry_hour: u32,
    pub entry_minute: u32,
    pub entry_mode: EntryMode,
    pub take_profit_pips: u32,
    /// 0 disables the stop-loss.
    pub stop_loss_pips: u32,
    pub one_trade_per_day: bool,
    pub weekdays_only: bool,
    pub close_hour: u32,
    pub close_minute: u32,
    pub pip_mode: PipMode,
    /// Used only when `pip_mode` is `custom`.
    pub custom_pip: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: "EUR_USD".to_string(),
            units: 10_000,
            timezone: "America/New_York".to_string(),
            entry_hour: 16,
            entry_minute: 55,
            entry_mode: EntryMode::Robust,
            take_profit_pips: 10,
            stop_loss_pips: 0,
            one_trade_per_day: true,
            weekdays_only: true,
            close_hour: 17,
            close_minute: 10,
            pip_mode: PipMode::Auto,
            custom_pip: dec!(0.0001),
        }
    }
}

/// Rejected engine parameter. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid instrument {0:?}: expected BASE_QUOTE, e.g. EUR_USD")]
    InvalidInstrument(String),
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

impl EngineConfig {
    /// Checks every numeric parameter. The time zone is not checked here: an
    /// unknown zone falls back to UTC when the calendar gate is built.
    ///
    /// # Errors
    ///
    /// Returns the first parameter found out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_instrument(&self.instrument) {
            return Err(ConfigError::InvalidInstrument(self.instrument.clone()));
        }
        if self.units <= 0 {
            return Err(ConfigError::out_of_range("units", self.units, "> 0"));
        }
        if self.entry_hour > 23 {
            return Err(ConfigError::out_of_range("entry_hour", self.entry_hour, "0-23"));
        }
        if self.entry_minute > 59 {
            return Err(ConfigError::out_of_range("entry_minute", self.entry_minute, "0-59"));
        }
        if self.close_hour > 23 {
            return Err(ConfigError::out_of_range("close_hour", self.close_hour, "0-23"));
        }
        if self.close_minute > 59 {
            return Err(ConfigError::out_of_range("close_minute", self.close_minute, "0-59"));
        }
        if self.take_profit_pips < 1 {
            return Err(ConfigError::out_of_range(
                "take_profit_pips",
                self.take_profit_pips,
                ">= 1",
            ));
        }
        if self.pip_mode == PipMode::Custom && self.custom_pip <= Decimal::ZERO {
            return Err(ConfigError::out_of_range("custom_pip", self.custom_pip, "> 0"));
        }
        Ok(())
    }

    #[must_use]
    pub fn pip_size(&self) -> Decimal {
        pip_size(&self.instrument, self.pip_mode, self.custom_pip)
    }

    /// Entry time of day, `None` if hour/minute are out of range.
    #[must_use]
    pub fn entry_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.entry_hour, self.entry_minute, 0)
    }
}

/// Instrument ids go into URL paths: `EUR_USD`, `XAU_USD`, `DE30_EUR`.
fn is_valid_instrument(instrument: &str) -> bool {
    let mut parts = instrument.split('_');
    let (Some(base), Some(quote), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    [base, quote].iter().all(|part| {
        !part.is_empty()
            && part.len() <= 8
            && part
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    })
}

/// Broker transport settings. Credentials come from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub request_timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            requests_per_second: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve the liveness endpoint alongside the engine.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pip_size(), dec!(0.0001));
        assert_eq!(
            config.entry_time(),
            NaiveTime::from_hms_opt(16, 55, 0)
        );
    }

    #[test]
    fn test_rejects_out_of_range_times() {
        let config = EngineConfig {
            entry_hour: 24,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "entry_hour",
                ..
            })
        ));

        let config = EngineConfig {
            close_minute: 60,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "close_minute",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_take_profit() {
        let config = EngineConfig {
            take_profit_pips: 0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("take_profit_pips"));
    }

    #[test]
    fn test_rejects_non_long_units() {
        for units in [0, -10_000] {
            let config = EngineConfig {
                units,
                ..EngineConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_custom_pip_must_be_positive() {
        let config = EngineConfig {
            pip_mode: PipMode::Custom,
            custom_pip: Decimal::ZERO,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        // Ignored in auto mode
        let config = EngineConfig {
            custom_pip: Decimal::ZERO,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_instrument_format() {
        assert!(is_valid_instrument("EUR_USD"));
        assert!(is_valid_instrument("DE30_EUR"));
        assert!(!is_valid_instrument("EURUSD"));
        assert!(!is_valid_instrument("eur_usd"));
        assert!(!is_valid_instrument("EUR_USD/../x"));
        assert!(!is_valid_instrument("EUR_USD_X"));
        assert!(!is_valid_instrument(""));
    }

    #[test]
    fn test_jpy_pip_from_config() {
        let config = EngineConfig {
            instrument: "USD_JPY".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(config.pip_size(), dec!(0.01));
    }

    #[test]
    fn test_entry_mode_serde_names() {
        let mode: EntryMode = serde_json::from_str("\"exact\"").unwrap();
        assert_eq!(mode, EntryMode::Exact);
        assert_eq!(serde_json::to_string(&EntryMode::Robust).unwrap(), "\"robust\"");
    }
}
