//! Time-gated order trigger: opens one long position per trading day at a
//! configured local time and force-closes it at another.

pub mod broker;
pub mod calendar;
pub mod config;
pub mod config_loader;
pub mod engine;
pub mod pricing;
pub mod runner;
pub mod scheduler;

pub use broker::{Broker, BrokerError, CloseConfirmation, MarketOrder, OrderConfirmation, Quote};
pub use calendar::{date_key, is_weekday, minute_key, CalendarGate, LocalTime};
pub use config::{
    AppConfig, BrokerSettings, ConfigError, EngineConfig, EntryMode, SchedulerConfig, ServerConfig,
};
pub use config_loader::ConfigLoader;
pub use engine::{IdleReason, TickAction, TickOutcome, TriggerEngine, TriggerState};
pub use pricing::{Bracket, PipMode};
pub use runner::{TickStats, TimeBot};
pub use scheduler::{IntervalTicker, SimulatedTicks, TickSource};
