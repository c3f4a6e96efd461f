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

//! Pure decision rules of the mode controller.
//!
//! Nothing in this module holds state; the controller feeds it the current
//! parameters, metrics and enabled table.

use sidelink_core::{LinkMetrics, ModeSwitchParams, ModeTable, SidelinkMode, TransitionError};
use std::time::Duration;

/// Minimum time between two committed mode switches.
pub const MIN_SWITCH_INTERVAL: Duration = Duration::from_secs(1);
/// Utilization at or above which no switch is considered.
pub const SWITCH_UTILIZATION_LIMIT: f64 = 0.9;
/// Utilization above which semi-persistent scheduling is preferred, and at or
/// above which it cannot be entered.
pub const HIGH_UTILIZATION: f64 = 0.8;
/// Delivery ratio that sensing-based semi-persistent scheduling needs.
pub const SENSING_MIN_PDR: f64 = 0.8;

/// Why an evaluation did or did not produce a proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    /// Less than `time_to_trigger` since the last recorded evaluation.
    Unstable {
        /// Time left before the next evaluation may act.
        remaining: Duration,
    },
    /// Less than [`MIN_SWITCH_INTERVAL`] since the last switch.
    CoolingDown {
        /// Time left in the cooldown.
        remaining: Duration,
    },
    /// RSRP inside the hysteresis band or the pool too busy to switch.
    ConditionsUnmet {
        /// `|rsrp - threshold| > hysteresis`.
        rsrp_decisive: bool,
        /// Utilization below [`SWITCH_UTILIZATION_LIMIT`].
        resources_available: bool,
    },
    /// The decision table picked a mode that is disabled.
    Blocked(SidelinkMode),
    /// The decision table picked the current mode.
    Hold(SidelinkMode),
    /// A switch to this mode is recommended.
    Propose(SidelinkMode),
}

impl Assessment {
    /// The proposed mode, if any.
    pub fn proposal(&self) -> Option<SidelinkMode> {
        match self {
            Assessment::Propose(mode) => Some(*mode),
            _ => None,
        }
    }

    /// Whether this outcome stamps the evaluation time.
    ///
    /// The gate outcomes leave no trace, and a proposal is left unstamped so
    /// the driver can act on it right away.
    pub fn records_evaluation(&self) -> bool {
        matches!(
            self,
            Assessment::ConditionsUnmet { .. } | Assessment::Blocked(_) | Assessment::Hold(_)
        )
    }
}

/// `true` when RSRP lies strictly outside the hysteresis band.
pub fn rsrp_decisive(params: &ModeSwitchParams, rsrp_dbm: f64) -> bool {
    (rsrp_dbm - params.rsrp_threshold_dbm).abs() > params.hysteresis_db
}

/// `true` when the pool has room for a switch.
pub fn resources_available(metrics: &LinkMetrics) -> bool {
    metrics.resource_utilization < SWITCH_UTILIZATION_LIMIT
}

/// The decision table. First matching row wins.
pub fn target_mode(
    params: &ModeSwitchParams,
    metrics: &LinkMetrics,
    current: SidelinkMode,
) -> SidelinkMode {
    if metrics.rsrp_dbm > params.upper_edge_dbm() {
        SidelinkMode::NetworkScheduled
    } else if metrics.resource_utilization > HIGH_UTILIZATION {
        SidelinkMode::SemiPersistent
    } else if metrics.rsrp_dbm < params.lower_edge_dbm() {
        SidelinkMode::Autonomous
    } else {
        current
    }
}

/// Entry requirement of `target`, as a failure reason.
pub fn requirement(
    target: SidelinkMode,
    params: &ModeSwitchParams,
    metrics: &LinkMetrics,
) -> Result<(), &'static str> {
    match target {
        SidelinkMode::NetworkScheduled if metrics.rsrp_dbm <= params.rsrp_threshold_dbm => {
            Err("RSRP not above threshold")
        }
        SidelinkMode::SemiPersistent if metrics.resource_utilization >= HIGH_UTILIZATION => {
            Err("resource utilization too high")
        }
        SidelinkMode::SensingSemiPersistent if metrics.packet_delivery_ratio <= SENSING_MIN_PDR => {
            Err("packet delivery ratio too low")
        }
        _ => Ok(()),
    }
}

/// Edge check on the transition graph.
///
/// Every enabled mode is reachable from every other mode, including from a
/// current mode that has since been disabled. Self-edges do not exist.
pub fn check_transition(
    from: SidelinkMode,
    to: SidelinkMode,
    enabled: &ModeTable<bool>,
) -> Result<(), TransitionError> {
    if !enabled[to] {
        return Err(TransitionError::ModeDisabled(to));
    }
    if from == to {
        return Err(TransitionError::AlreadyActive(to));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(rsrp_dbm: f64, utilization: f64, pdr: f64) -> LinkMetrics {
        LinkMetrics {
            rsrp_dbm,
            resource_utilization: utilization,
            packet_delivery_ratio: pdr,
            latency_ms: 10.0,
        }
    }

    // ── Hysteresis band ──

    #[test]
    fn test_band_edges_are_not_decisive() {
        let params = ModeSwitchParams::default();
        assert!(!rsrp_decisive(&params, -110.0));
        assert!(!rsrp_decisive(&params, -107.0));
        assert!(!rsrp_decisive(&params, -113.0));
        assert!(rsrp_decisive(&params, -106.9));
        assert!(rsrp_decisive(&params, -113.1));
    }

    #[test]
    fn test_resources_available_below_limit() {
        assert!(resources_available(&metrics(-100.0, 0.89, 1.0)));
        assert!(!resources_available(&metrics(-100.0, 0.9, 1.0)));
    }

    // ── Decision table ──

    #[test]
    fn test_target_table_order() {
        let params = ModeSwitchParams::default();
        let current = SidelinkMode::SensingSemiPersistent;

        // Strong signal wins even when the pool is busy.
        assert_eq!(
            target_mode(&params, &metrics(-100.0, 0.85, 1.0), current),
            SidelinkMode::NetworkScheduled
        );
        assert_eq!(
            target_mode(&params, &metrics(-120.0, 0.85, 1.0), current),
            SidelinkMode::SemiPersistent
        );
        assert_eq!(
            target_mode(&params, &metrics(-120.0, 0.5, 1.0), current),
            SidelinkMode::Autonomous
        );
        assert_eq!(target_mode(&params, &metrics(-110.0, 0.5, 1.0), current), current);
    }

    #[test]
    fn test_requirements() {
        let params = ModeSwitchParams::default();
        let good = metrics(-100.0, 0.5, 0.95);

        for mode in SidelinkMode::ALL {
            assert!(requirement(mode, &params, &good).is_ok(), "{mode}");
        }
        assert!(requirement(SidelinkMode::NetworkScheduled, &params, &metrics(-110.0, 0.5, 1.0)).is_err());
        assert!(requirement(SidelinkMode::SemiPersistent, &params, &metrics(-100.0, 0.8, 1.0)).is_err());
        assert!(requirement(SidelinkMode::SensingSemiPersistent, &params, &metrics(-100.0, 0.5, 0.8)).is_err());
        assert!(requirement(SidelinkMode::Autonomous, &params, &metrics(-140.0, 1.0, 0.0)).is_ok());
    }

    // ── Transition graph ──

    #[test]
    fn test_transition_graph() {
        let mut enabled = ModeTable::all_enabled();
        enabled.set(SidelinkMode::Autonomous, false);

        assert_eq!(
            check_transition(SidelinkMode::NetworkScheduled, SidelinkMode::Autonomous, &enabled),
            Err(TransitionError::ModeDisabled(SidelinkMode::Autonomous))
        );
        assert_eq!(
            check_transition(SidelinkMode::SemiPersistent, SidelinkMode::SemiPersistent, &enabled),
            Err(TransitionError::AlreadyActive(SidelinkMode::SemiPersistent))
        );
        // Leaving a disabled mode is allowed.
        assert!(check_transition(SidelinkMode::Autonomous, SidelinkMode::NetworkScheduled, &enabled).is_ok());
    }

    #[test]
    fn test_only_stamping_outcomes_record() {
        assert!(!Assessment::Unstable { remaining: Duration::ZERO }.records_evaluation());
        assert!(!Assessment::CoolingDown { remaining: Duration::ZERO }.records_evaluation());
        assert!(!Assessment::Propose(SidelinkMode::Autonomous).records_evaluation());
        assert!(Assessment::Hold(SidelinkMode::Autonomous).records_evaluation());
        assert_eq!(
            Assessment::Propose(SidelinkMode::SemiPersistent).proposal(),
            Some(SidelinkMode::SemiPersistent)
        );
    }
}
