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

//! Pool configuration.

use serde::{Deserialize, Serialize};
use sidelink_core::ConfigError;
use std::time::Duration;

/// Dimensions and expiry window of a resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of subchannels (frequency axis).
    pub num_subchannels: usize,
    /// Number of symbols per slot (time axis).
    pub num_symbols: usize,
    /// Maximum lifetime of an allocation, in milliseconds.
    pub periodicity_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_subchannels: 10,
            num_symbols: 14,
            periodicity_ms: 100,
        }
    }
}

impl PoolConfig {
    /// Creates a config with the default periodicity.
    pub fn new(num_subchannels: usize, num_symbols: usize) -> Self {
        Self {
            num_subchannels,
            num_symbols,
            ..Default::default()
        }
    }

    /// Sets the periodicity.
    pub fn with_periodicity(mut self, periodicity: Duration) -> Self {
        self.periodicity_ms = u64::try_from(periodicity.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The periodicity as a `Duration`.
    pub fn periodicity(&self) -> Duration {
        Duration::from_millis(self.periodicity_ms)
    }

    /// Rejects zero dimensions and a zero periodicity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_subchannels == 0
            || self.num_symbols == 0
            || self.num_subchannels.checked_mul(self.num_symbols).is_none()
        {
            return Err(ConfigError::InvalidPoolDimensions {
                num_subchannels: self.num_subchannels,
                num_symbols: self.num_symbols,
            });
        }
        if self.periodicity_ms == 0 {
            return Err(ConfigError::InvalidPeriodicity(Duration::ZERO));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.periodicity(), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            PoolConfig::new(0, 14).validate(),
            Err(ConfigError::InvalidPoolDimensions { .. })
        ));
        assert!(PoolConfig::new(4, 0).validate().is_err());
    }

    #[test]
    fn test_zero_periodicity_rejected() {
        let config = PoolConfig::new(4, 2).with_periodicity(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPeriodicity(_))
        ));
    }
}
