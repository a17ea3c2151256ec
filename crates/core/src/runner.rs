//! The evaluation loop: one engine tick per scheduler tick, strictly in sequence.

use crate::broker::{Broker, CloseConfirmation};
use crate::calendar::{CalendarGate, LocalTime};
use crate::engine::{TickAction, TriggerEngine, TriggerState};
use crate::scheduler::TickSource;
use chrono::{DateTime, Utc};
use tracing::{error, info, trace, warn};

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Counters for the lifetime of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub opens: u64,
    pub closes: u64,
    pub errors: u64,
}

/// Owns the engine, its state, and the broker. The only writer of
/// [`TriggerState`].
pub struct TimeBot<B> {
    engine: TriggerEngine,
    gate: CalendarGate,
    broker: B,
    state: TriggerState,
    stats: TickStats,
}

impl<B: Broker> TimeBot<B> {
    pub fn new(engine: TriggerEngine, broker: B) -> Self {
        let gate = CalendarGate::new(&engine.config().timezone);
        Self {
            engine,
            gate,
            broker,
            state: TriggerState::default(),
            stats: TickStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    #[must_use]
    pub fn stats(&self) -> TickStats {
        self.stats
    }

    #[must_use]
    pub fn gate(&self) -> &CalendarGate {
        &self.gate
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Evaluates a single tick at `instant`.
    ///
    /// Returns the action taken, or `None` if the tick failed. Errors are
    /// logged here and never propagate: the next tick retries from the same
    /// state.
    pub async fn step(&mut self, instant: DateTime<Utc>) -> Option<TickAction> {
        let now = self.gate.localize(instant);
        self.stats.ticks += 1;

        match self.engine.tick(&self.state, &now, &self.broker).await {
            Ok(outcome) => {
                self.state = outcome.next_state;
                self.record(&outcome.action, &now);
                Some(outcome.action)
            }
            Err(e) => {
                self.stats.errors += 1;
                let local_time = now.format(LOG_TIME_FORMAT).to_string();
                if e.is_transient() {
                    warn!(
                        error = %e,
                        local_time = %local_time,
                        "Tick failed, retrying next tick"
                    );
                } else {
                    error!(error = %e, local_time = %local_time, "Tick failed");
                }
                None
            }
        }
    }

    fn record(&mut self, action: &TickAction, now: &LocalTime) {
        let instrument = self.engine.config().instrument.as_str();
        let local_time = now.format(LOG_TIME_FORMAT).to_string();

        match action {
            TickAction::Opened {
                order,
                confirmation,
            } => {
                self.stats.opens += 1;
                info!(
                    instrument,
                    units = order.units,
                    take_profit = %order.take_profit,
                    stop_loss = order.stop_loss.as_deref().unwrap_or("none"),
                    order_id = ?confirmation.order_id,
                    fill_price = ?confirmation.fill_price,
                    local_time = %local_time,
                    "Opened long position"
                );
            }
            TickAction::Closed(CloseConfirmation::Closed {
                transaction_id,
                units,
            }) => {
                self.stats.closes += 1;
                info!(
                    instrument,
                    transaction_id = ?transaction_id,
                    units = ?units,
                    local_time = %local_time,
                    "Force-closed long position"
                );
            }
            TickAction::Closed(CloseConfirmation::AlreadyFlat) => {
                self.stats.closes += 1;
                info!(
                    instrument,
                    local_time = %local_time,
                    "Force-close found no position"
                );
            }
            TickAction::Idle(reason) => {
                trace!(?reason, local_time = %local_time, "Idle tick");
            }
        }
    }

    /// Runs until `source` is exhausted and returns the lifetime counters.
    pub async fn run<S: TickSource + ?Sized>(&mut self, source: &mut S) -> TickStats {
        let config = self.engine.config();
        info!(
            instrument = %config.instrument,
            units = config.units,
            timezone = %self.gate.timezone(),
            entry = %format!("{:02}:{:02}", config.entry_hour, config.entry_minute),
            entry_mode = ?config.entry_mode,
            take_profit_pips = config.take_profit_pips,
            stop_loss_pips = config.stop_loss_pips,
            one_trade_per_day = config.one_trade_per_day,
            weekdays_only = config.weekdays_only,
            close = %format!("{:02}:{:02}", config.close_hour, config.close_minute),
            "Trigger loop started"
        );

        while let Some(instant) = source.next_tick().await {
            self.step(instant).await;
        }

        info!(stats = ?self.stats, "Trigger loop finished");
        self.stats
    }
}
