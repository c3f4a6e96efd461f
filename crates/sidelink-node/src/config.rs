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

//! Node configuration, loaded from RON.

use crate::error::{NodeError, NodeResult};
use serde::{Deserialize, Serialize};
use sidelink_core::{ConfigError, ModeSwitchParams, ModeTable, SidelinkMode};
use sidelink_pool::PoolConfig;
use std::path::Path;
use std::time::Duration;

/// Highest supported numerology index.
pub const MAX_NUMEROLOGY: u8 = 4;

/// Mode controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// RSRP threshold in dBm, within `[-140, -70]`.
    pub rsrp_threshold_dbm: f64,
    /// Hysteresis in dB, within `[0, 10]`.
    pub hysteresis_db: f64,
    /// Minimum time between two acting evaluations, in milliseconds.
    pub time_to_trigger_ms: u64,
    /// Mode at start-up.
    pub initial_mode: SidelinkMode,
    /// Modes that may never be entered.
    pub disabled_modes: Vec<SidelinkMode>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let params = ModeSwitchParams::default();
        Self {
            rsrp_threshold_dbm: params.rsrp_threshold_dbm,
            hysteresis_db: params.hysteresis_db,
            time_to_trigger_ms: 1000,
            initial_mode: SidelinkMode::default(),
            disabled_modes: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// The switching parameters.
    pub fn params(&self) -> ModeSwitchParams {
        ModeSwitchParams {
            rsrp_threshold_dbm: self.rsrp_threshold_dbm,
            hysteresis_db: self.hysteresis_db,
            time_to_trigger: Duration::from_millis(self.time_to_trigger_ms),
        }
    }

    /// The enabled-mode table.
    pub fn enabled_modes(&self) -> ModeTable<bool> {
        let mut table = ModeTable::all_enabled();
        for mode in &self.disabled_modes {
            table.set(*mode, false);
        }
        table
    }
}

/// Everything needed to build a [`SidelinkNode`](crate::SidelinkNode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// NR numerology `μ`; the slot lasts `1 ms / 2^μ`.
    pub numerology_index: u8,
    /// Carrier frequency in Hz.
    pub carrier_frequency_hz: f64,
    /// Channel bandwidth in MHz.
    pub bandwidth_mhz: f64,
    /// Whether this node may request sidelink resources.
    pub sidelink_enabled: bool,
    /// Period of the mode tick, in milliseconds.
    pub mode_evaluation_interval_ms: u64,
    /// Resource pool layout.
    pub pool: PoolConfig,
    /// Mode controller settings.
    pub controller: ControllerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            numerology_index: 0,
            carrier_frequency_hz: 5.9e9,
            bandwidth_mhz: 20.0,
            sidelink_enabled: true,
            mode_evaluation_interval_ms: 100,
            pool: PoolConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Parses a RON document.
    pub fn from_ron_str(source: &str) -> NodeResult<Self> {
        ron::de::from_str(source).map_err(|e| NodeError::Parse {
            what: "node config".to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads and parses a RON file.
    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| NodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&source)?;
        log::info!("Node: loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Duration of one slot, the allocation tick period.
    pub fn slot_duration(&self) -> Duration {
        Duration::from_millis(1) / (1u32 << self.numerology_index.min(MAX_NUMEROLOGY))
    }

    /// Period of the mode tick.
    pub fn mode_evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.mode_evaluation_interval_ms)
    }

    /// Checks every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.numerology_index > MAX_NUMEROLOGY {
            return Err(invalid(
                "numerology_index",
                format!("{} (valid range: 0-{MAX_NUMEROLOGY})", self.numerology_index),
            ));
        }
        if !(self.carrier_frequency_hz.is_finite() && self.carrier_frequency_hz > 0.0) {
            return Err(invalid(
                "carrier_frequency_hz",
                format!("{} must be positive", self.carrier_frequency_hz),
            ));
        }
        if !(self.bandwidth_mhz.is_finite() && self.bandwidth_mhz > 0.0) {
            return Err(invalid(
                "bandwidth_mhz",
                format!("{} must be positive", self.bandwidth_mhz),
            ));
        }
        if self.mode_evaluation_interval_ms == 0 {
            return Err(invalid(
                "mode_evaluation_interval_ms",
                "must be positive".to_string(),
            ));
        }
        self.pool.validate()?;
        self.controller.params().validate()?;
        if self
            .controller
            .disabled_modes
            .contains(&self.controller.initial_mode)
        {
            return Err(ConfigError::InitialModeDisabled(
                self.controller.initial_mode,
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter { name, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slot_duration(), Duration::from_millis(1));
        assert_eq!(config.mode_evaluation_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_slot_duration_follows_numerology() {
        let config = NodeConfig {
            numerology_index: 4,
            ..Default::default()
        };
        assert_eq!(config.slot_duration(), Duration::from_micros(62) + Duration::from_nanos(500));
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let bad = [
            NodeConfig {
                numerology_index: 5,
                ..Default::default()
            },
            NodeConfig {
                carrier_frequency_hz: 0.0,
                ..Default::default()
            },
            NodeConfig {
                bandwidth_mhz: -1.0,
                ..Default::default()
            },
            NodeConfig {
                mode_evaluation_interval_ms: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_disabled_initial_mode_rejected() {
        let config = NodeConfig {
            controller: ControllerConfig {
                disabled_modes: vec![SidelinkMode::Autonomous],
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InitialModeDisabled(SidelinkMode::Autonomous))
        );
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = NodeConfig::from_ron_str(
            r#"(
                numerology_index: 1,
                pool: (num_subchannels: 4, num_symbols: 2),
                controller: (disabled_modes: [SensingSemiPersistent]),
            )"#,
        )
        .unwrap();
        assert_eq!(config.numerology_index, 1);
        assert_eq!(config.pool.num_subchannels, 4);
        assert_eq!(config.pool.periodicity_ms, 100);
        assert!(!config.controller.enabled_modes()[SidelinkMode::SensingSemiPersistent]);
        assert_eq!(config.controller.rsrp_threshold_dbm, -110.0);
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        assert!(matches!(
            NodeConfig::from_ron_str("(numerology_index: \"high\")"),
            Err(NodeError::Parse { .. })
        ));
    }
}
