// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Periodic timers polled with an explicit `now`.

use crate::config::NodeConfig;
use sidelink_core::{ConfigError, SimTime};
use std::time::Duration;

/// A periodic timer.
///
/// A ticker fires at most once per [`poll`](Ticker::poll). If the caller
/// falls behind by several periods the missed ticks are skipped, not
/// replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    period: Duration,
    next_due: SimTime,
}

impl Ticker {
    /// Creates a ticker whose first tick is due one period after `start`.
    pub fn new(period: Duration, start: SimTime) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::InvalidParameter {
                name: "tick_period",
                reason: "must be positive".to_string(),
            });
        }
        Ok(Self {
            period,
            next_due: start + period,
        })
    }

    /// Returns `true` when a tick is due at `now` and schedules the next one.
    pub fn poll(&mut self, now: SimTime) -> bool {
        if now < self.next_due {
            return false;
        }
        let late = now.saturating_since(self.next_due);
        let skipped = late.as_nanos() / self.period.as_nanos();
        let steps = u32::try_from(skipped + 1).unwrap_or(u32::MAX);
        self.next_due = self.next_due + self.period.saturating_mul(steps);
        true
    }

    /// The tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the next tick is due.
    pub fn next_due(&self) -> SimTime {
        self.next_due
    }
}

/// Which ticks fired on one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueTicks {
    /// The allocation tick (pool maintenance).
    pub allocation: bool,
    /// The mode tick (controller evaluation).
    pub mode: bool,
}

/// The node's two periodic timers.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    allocation: Ticker,
    mode: Ticker,
}

impl Schedule {
    /// Allocation tick every slot, mode tick every evaluation interval.
    pub fn from_config(config: &NodeConfig, start: SimTime) -> Result<Self, ConfigError> {
        Ok(Self {
            allocation: Ticker::new(config.slot_duration(), start)?,
            mode: Ticker::new(config.mode_evaluation_interval(), start)?,
        })
    }

    /// Polls both tickers.
    pub fn poll(&mut self, now: SimTime) -> DueTicks {
        DueTicks {
            allocation: self.allocation.poll(now),
            mode: self.mode.poll(now),
        }
    }

    /// The allocation ticker.
    pub fn allocation(&self) -> &Ticker {
        &self.allocation
    }

    /// The mode ticker.
    pub fn mode(&self) -> &Ticker {
        &self.mode
    }

    /// The earlier of the two next deadlines.
    pub fn next_due(&self) -> SimTime {
        self.allocation.next_due().min(self.mode.next_due())
    }
}
