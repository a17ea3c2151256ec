//! Pip sizing and protective-price construction for entry orders.

use crate::broker::{MarketOrder, Quote};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Pip size for most FX pairs.
pub const STANDARD_PIP: Decimal = dec!(0.0001);

/// Pip size for pairs quoted in yen.
pub const JPY_PIP: Decimal = dec!(0.01);

/// How the pip size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipMode {
    /// Derived from the instrument's quote currency.
    #[default]
    Auto,
    /// Fixed value from configuration.
    Custom,
}

/// Pip size for `instrument` under `mode`.
#[must_use]
pub fn pip_size(instrument: &str, mode: PipMode, custom: Decimal) -> Decimal {
    match mode {
        PipMode::Auto if instrument.ends_with("JPY") => JPY_PIP,
        PipMode::Auto => STANDARD_PIP,
        PipMode::Custom => custom,
    }
}

/// Decimal places used on the wire: fractional pips (5dp) for standard
/// pairs, 3dp for anything coarser.
#[must_use]
pub fn price_decimals(pip: Decimal) -> u32 {
    if pip <= STANDARD_PIP {
        5
    } else {
        3
    }
}

/// Rounds half away from zero and pads to exactly `decimals` places.
#[must_use]
pub fn format_price(price: Decimal, decimals: u32) -> String {
    let rounded = price.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", decimals as usize, rounded)
}

/// Distances, in pips, of the protective orders from the entry ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub take_profit_pips: u32,
    /// 0 disables the stop-loss.
    pub stop_loss_pips: u32,
    pub pip: Decimal,
}

impl Bracket {
    #[must_use]
    pub fn take_profit_price(&self, ask: Decimal) -> Decimal {
        ask + Decimal::from(self.take_profit_pips) * self.pip
    }

    #[must_use]
    pub fn stop_loss_price(&self, ask: Decimal) -> Option<Decimal> {
        (self.stop_loss_pips > 0).then(|| ask - Decimal::from(self.stop_loss_pips) * self.pip)
    }

    /// Builds the long market order priced off `quote.ask`.
    #[must_use]
    pub fn market_order(&self, instrument: &str, units: i64, quote: &Quote) -> MarketOrder {
        let decimals = price_decimals(self.pip);
        MarketOrder {
            instrument: instrument.to_string(),
            units,
            take_profit: format_price(self.take_profit_price(quote.ask), decimals),
            stop_loss: self
                .stop_loss_price(quote.ask)
                .map(|p| format_price(p, decimals)),
        }
    }
}
