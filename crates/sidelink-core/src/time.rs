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

//! Simulation timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A point on the simulation clock, measured from the start of the run.
///
/// The core never reads a wall clock: every time-dependent operation takes a
/// `SimTime` from its caller, which keeps the pool and the controller fully
/// deterministic under test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Creates a timestamp from an offset since the start of the simulation.
    pub const fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Creates a timestamp from whole milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Creates a timestamp from whole microseconds.
    pub const fn from_micros(micros: u64) -> Self {
        Self(Duration::from_micros(micros))
    }

    /// Creates a timestamp from fractional seconds.
    ///
    /// Negative and NaN inputs clamp to [`SimTime::ZERO`]; values too large to
    /// represent saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        match Duration::try_from_secs_f64(secs) {
            Ok(offset) => Self(offset),
            Err(_) if secs > 0.0 => Self(Duration::MAX),
            Err(_) => Self::ZERO,
        }
    }

    /// Returns the offset since the start of the simulation.
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Returns the timestamp in fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Returns the time elapsed since `earlier`, or zero if `earlier` lies in
    /// the future.
    pub fn saturating_since(&self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_since_never_underflows() {
        let early = SimTime::from_millis(100);
        let late = SimTime::from_millis(350);
        assert_eq!(late.saturating_since(early), Duration::from_millis(250));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn test_from_secs_f64_clamps_invalid_input() {
        assert_eq!(SimTime::from_secs_f64(-1.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(1.5), SimTime::from_millis(1500));
    }

    #[test]
    fn test_add_and_display() {
        let t = SimTime::from_millis(1) + Duration::from_micros(500);
        assert_eq!(t, SimTime::from_micros(1500));
        assert_eq!(t.to_string(), "0.001500s");
    }
}
