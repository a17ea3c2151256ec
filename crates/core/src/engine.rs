//! Trigger engine: decides, once per tick, whether to open, force-close, or
//! do nothing.
//!
//! Evaluation is a function of `(state, local time, broker)`. The caller owns
//! [`TriggerState`] and commits [`TickOutcome::next_state`] only when a tick
//! succeeds, so a failed broker call never advances the dedup state.
//!
//! Step order within a tick:
//! 1. roll the trading day when the date key changes
//! 2. on non-trading days, only the force-close rule runs
//! 3. force-close at the close minute if a long is open
//! 4. no entry while a long is open
//! 5. no entry once today's trade fired (when one-per-day is set)
//! 6. entry rule (robust or exact)

use crate::broker::{Broker, BrokerError, CloseConfirmation, MarketOrder, OrderConfirmation};
use crate::calendar::{date_key, is_weekday, minute_key, LocalTime};
use crate::config::{ConfigError, EngineConfig, EntryMode};
use crate::pricing::Bracket;
use chrono::{Duration, NaiveTime, Timelike};
use tracing::debug;

/// Per-day trigger flags plus the per-minute dedup mark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerState {
    /// Date key of the trading day these flags belong to.
    pub date_key: Option<String>,
    pub entry_triggered_today: bool,
    /// Minute key of the last entry evaluation.
    pub last_checked_minute_key: Option<String>,
}

impl TriggerState {
    /// Starts a fresh trading day if `today` differs from the stored key.
    /// Returns true when a reset happened.
    fn roll_to(&mut self, today: String) -> bool {
        if self.date_key.as_deref() == Some(today.as_str()) {
            return false;
        }
        self.date_key = Some(today);
        self.entry_triggered_today = false;
        self.last_checked_minute_key = None;
        true
    }
}

/// Why a tick produced no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// Weekend with weekday-only trading, and nothing to close.
    NonTradingDay,
    /// A long is open; never pyramid.
    PositionOpen,
    /// Today's single trade already fired.
    DailyLimitReached,
    /// The entry rule did not fire on this tick.
    OutsideEntryWindow,
}

/// The single action (or non-action) of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    Opened {
        order: MarketOrder,
        confirmation: OrderConfirmation,
    },
    Closed(CloseConfirmation),
    Idle(IdleReason),
}

/// Result of a successful tick evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub action: TickAction,
    pub next_state: TriggerState,
}

impl TickOutcome {
    fn new(action: TickAction, next_state: TriggerState) -> Self {
        Self { action, next_state }
    }
}

/// Position query fetched at most once per tick, and only when a rule needs it.
struct PositionProbe<'a, B: ?Sized> {
    broker: &'a B,
    instrument: &'a str,
    open: Option<bool>,
}

impl<'a, B: Broker + ?Sized> PositionProbe<'a, B> {
    fn new(broker: &'a B, instrument: &'a str) -> Self {
        Self {
            broker,
            instrument,
            open: None,
        }
    }

    async fn is_open(&mut self) -> Result<bool, BrokerError> {
        if let Some(open) = self.open {
            return Ok(open);
        }
        let open = match self.broker.has_open_long(self.instrument).await {
            Ok(open) => open,
            Err(BrokerError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        self.open = Some(open);
        Ok(open)
    }
}

/// Stateless rule evaluator built from a validated [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct TriggerEngine {
    config: EngineConfig,
    entry_time: NaiveTime,
    bracket: Bracket,
}

impl TriggerEngine {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any parameter is out of range.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let entry_time = config
            .entry_time()
            .ok_or_else(|| ConfigError::OutOfRange {
                field: "entry_time",
                value: format!("{}:{}", config.entry_hour, config.entry_minute),
                expected: "HH:MM",
            })?;
        let bracket = Bracket {
            take_profit_pips: config.take_profit_pips,
            stop_loss_pips: config.stop_loss_pips,
            pip: config.pip_size(),
        };

        Ok(Self {
            config,
            entry_time,
            bracket,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates one tick at local time `now`.
    ///
    /// At most one broker action (open or close) is issued. The returned
    /// `next_state` must replace `state`; on error `state` stays current.
    ///
    /// # Errors
    ///
    /// Returns the first [`BrokerError`] hit during the tick, other than
    /// `NotFound` on position lookup or close.
    pub async fn tick<B: Broker + ?Sized>(
        &self,
        state: &TriggerState,
        now: &LocalTime,
        broker: &B,
    ) -> Result<TickOutcome, BrokerError> {
        let mut next = state.clone();
        if next.roll_to(date_key(now)) {
            debug!(date = ?next.date_key, "New trading day, trigger state reset");
        }

        let mut position = PositionProbe::new(broker, &self.config.instrument);

        if self.config.weekdays_only && !is_weekday(now) {
            let action = match self.force_close(now, &mut position).await? {
                Some(closed) => TickAction::Closed(closed),
                None => TickAction::Idle(IdleReason::NonTradingDay),
            };
            return Ok(TickOutcome::new(action, next));
        }

        if let Some(closed) = self.force_close(now, &mut position).await? {
            return Ok(TickOutcome::new(TickAction::Closed(closed), next));
        }

        if position.is_open().await? {
            return Ok(TickOutcome::new(
                TickAction::Idle(IdleReason::PositionOpen),
                next,
            ));
        }

        if self.config.one_trade_per_day && next.entry_triggered_today {
            return Ok(TickOutcome::new(
                TickAction::Idle(IdleReason::DailyLimitReached),
                next,
            ));
        }

        let minute = minute_key(now);
        if !self.entry_due(now, &next, &minute) {
            next.last_checked_minute_key = Some(minute);
            return Ok(TickOutcome::new(
                TickAction::Idle(IdleReason::OutsideEntryWindow),
                next,
            ));
        }

        let quote = broker.get_quote(&self.config.instrument).await?;
        let order = self
            .bracket
            .market_order(&self.config.instrument, self.config.units, &quote);
        debug!(
            instrument = %order.instrument,
            ask = %quote.ask,
            take_profit = %order.take_profit,
            stop_loss = ?order.stop_loss,
            "Entry condition met"
        );
        let confirmation = broker.open_long_market(&order).await?;

        next.entry_triggered_today = true;
        next.last_checked_minute_key = Some(minute);

        Ok(TickOutcome::new(
            TickAction::Opened {
                order,
                confirmation,
            },
            next,
        ))
    }

    /// Whether the entry rule fires at `now`.
    ///
    /// Robust: on or after the entry minute, once per trading day. Never
    /// before: `minute_key(now)` may not be the minute preceding the target.
    /// Exact: inside the entry minute, once per distinct minute key.
    fn entry_due(&self, now: &LocalTime, state: &TriggerState, minute: &str) -> bool {
        match self.config.entry_mode {
            EntryMode::Robust => {
                let target = now.date_naive().and_time(self.entry_time);
                let before_target = (target - Duration::minutes(1))
                    .format("%Y%m%d%H%M")
                    .to_string();
                now.naive_local() >= target
                    && minute != before_target
                    && !state.entry_triggered_today
            }
            EntryMode::Exact => {
                now.hour() == self.config.entry_hour
                    && now.minute() == self.config.entry_minute
                    && state.last_checked_minute_key.as_deref() != Some(minute)
            }
        }
    }

    fn is_close_minute(&self, now: &LocalTime) -> bool {
        now.hour() == self.config.close_hour && now.minute() == self.config.close_minute
    }

    async fn force_close<B: Broker + ?Sized>(
        &self,
        now: &LocalTime,
        position: &mut PositionProbe<'_, B>,
    ) -> Result<Option<CloseConfirmation>, BrokerError> {
        if !self.is_close_minute(now) || !position.is_open().await? {
            return Ok(None);
        }

        match position.broker.close_all_long(&self.config.instrument).await {
            Ok(closed) => Ok(Some(closed)),
            Err(BrokerError::NotFound(_)) => Ok(Some(CloseConfirmation::AlreadyFlat)),
            Err(e) => Err(e),
        }
    }
}
