//! Calendar gate: local wall-clock time in the configured time zone.
//!
//! Date and minute keys are plain strings. The engine compares keys for
//! equality to dedupe triggers; it never does arithmetic on them.

use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;

/// A wall-clock instant in the engine's configured time zone.
pub type LocalTime = DateTime<Tz>;

/// Converts real time into the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarGate {
    tz: Tz,
}

impl CalendarGate {
    /// Creates a gate for an IANA zone name (e.g. `America/New_York`).
    ///
    /// An unknown zone is logged and replaced by UTC; construction never fails.
    pub fn new(tz_name: &str) -> Self {
        let tz = match tz_name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!(
                    timezone = tz_name,
                    error = %e,
                    "Invalid time zone, falling back to UTC"
                );
                Tz::UTC
            }
        };
        Self { tz }
    }

    /// Creates a gate for an already-parsed zone.
    #[must_use]
    pub const fn with_tz(tz: Tz) -> Self {
        Self { tz }
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current local time.
    #[must_use]
    pub fn local_now(&self) -> LocalTime {
        self.localize(Utc::now())
    }

    /// Converts a UTC instant into local time.
    #[must_use]
    pub fn localize(&self, instant: DateTime<Utc>) -> LocalTime {
        instant.with_timezone(&self.tz)
    }
}

impl Default for CalendarGate {
    fn default() -> Self {
        Self::with_tz(Tz::UTC)
    }
}

/// `YYYYMMDD` for the local date.
#[must_use]
pub fn date_key(t: &LocalTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// `YYYYMMDDHHMM` for the local minute.
#[must_use]
pub fn minute_key(t: &LocalTime) -> String {
    t.format("%Y%m%d%H%M").to_string()
}

/// Monday through Friday in local time.
#[must_use]
pub fn is_weekday(t: &LocalTime) -> bool {
    !matches!(t.weekday(), Weekday::Sat | Weekday::Sun)
}
