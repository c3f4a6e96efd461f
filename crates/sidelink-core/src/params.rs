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

//! Mode switching parameters.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Accepted range for the RSRP threshold, in dBm.
pub const RSRP_THRESHOLD_RANGE_DBM: RangeInclusive<f64> = -140.0..=-70.0;
/// Accepted range for the hysteresis margin, in dB.
pub const HYSTERESIS_RANGE_DB: RangeInclusive<f64> = 0.0..=10.0;

/// Thresholds that drive the mode decision table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeSwitchParams {
    /// RSRP level separating good and poor coverage (dBm).
    pub rsrp_threshold_dbm: f64,
    /// Half-width of the no-decision band around the threshold (dB).
    pub hysteresis_db: f64,
    /// Minimum time between two evaluations that may act.
    pub time_to_trigger: Duration,
}

impl Default for ModeSwitchParams {
    fn default() -> Self {
        Self {
            rsrp_threshold_dbm: -110.0,
            hysteresis_db: 3.0,
            time_to_trigger: Duration::from_secs(1),
        }
    }
}

impl ModeSwitchParams {
    /// Checks every field against its accepted range.
    ///
    /// Non-finite values are always rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !RSRP_THRESHOLD_RANGE_DBM.contains(&self.rsrp_threshold_dbm) {
            return Err(ConfigError::RsrpThresholdOutOfRange(
                self.rsrp_threshold_dbm,
            ));
        }
        if !HYSTERESIS_RANGE_DB.contains(&self.hysteresis_db) {
            return Err(ConfigError::HysteresisOutOfRange(self.hysteresis_db));
        }
        Ok(())
    }

    /// Upper edge of the hysteresis band.
    pub fn upper_edge_dbm(&self) -> f64 {
        self.rsrp_threshold_dbm + self.hysteresis_db
    }

    /// Lower edge of the hysteresis band.
    pub fn lower_edge_dbm(&self) -> f64 {
        self.rsrp_threshold_dbm - self.hysteresis_db
    }
}
