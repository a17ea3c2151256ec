//! Tick sources for the evaluation loop.
//!
//! The loop only asks "when is the next tick?", so production uses a tokio
//! interval while tests replay a synthetic sequence of instants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Yields the instant of each tick, or `None` when the source is exhausted.
#[async_trait]
pub trait TickSource: Send {
    async fn next_tick(&mut self) -> Option<DateTime<Utc>>;
}

/// Fixed-period ticks on the wall clock. Never ends.
///
/// Missed ticks are delayed rather than bursted, so a slow tick pushes the
/// schedule back instead of causing a catch-up volley.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    #[must_use]
    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TickSource for IntervalTicker {
    async fn next_tick(&mut self) -> Option<DateTime<Utc>> {
        self.interval.tick().await;
        Some(Utc::now())
    }
}

/// Replays a fixed list of instants without sleeping.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTicks {
    ticks: VecDeque<DateTime<Utc>>,
}

impl SimulatedTicks {
    pub fn new(ticks: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }

    /// Every `step` from `start` up to and including `end`.
    #[must_use]
    pub fn spanning(start: DateTime<Utc>, end: DateTime<Utc>, step: chrono::Duration) -> Self {
        let mut ticks = VecDeque::new();
        if step > chrono::Duration::zero() {
            let mut t = start;
            while t <= end {
                ticks.push_back(t);
                t += step;
            }
        }
        Self { ticks }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

#[async_trait]
impl TickSource for SimulatedTicks {
    async fn next_tick(&mut self) -> Option<DateTime<Utc>> {
        self.ticks.pop_front()
    }
}
