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

//! Scenario files and their replay on a simulated clock.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sidelink_control::ModeTransition;
use sidelink_core::{AllocationId, Priority, SidelinkMode, SimTime};
use sidelink_node::{LinkSample, NodeConfig, NodeSummary, SidelinkNode};
use sidelink_telemetry::TelemetrySnapshot;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// One thing the host does to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Ask for `size` contiguous blocks.
    Request {
        /// Allocation priority.
        priority: Priority,
        /// Number of blocks.
        size: usize,
    },
    /// Release what an earlier `Request` obtained.
    Release {
        /// Index of the request among all `Request` actions, from zero.
        request: usize,
    },
    /// Publish new radio measurements.
    Metrics {
        /// RSRP in dBm.
        rsrp_dbm: f64,
        /// Packet delivery ratio.
        packet_delivery_ratio: f64,
        /// Latency in milliseconds.
        latency_ms: f64,
    },
    /// Force a mode transition.
    SwitchMode {
        /// Target mode.
        mode: SidelinkMode,
    },
    /// Enable or disable a mode.
    EnableMode {
        /// Affected mode.
        mode: SidelinkMode,
        /// New state.
        enabled: bool,
    },
}

/// An action and when to apply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Simulation time in milliseconds.
    pub at_ms: u64,
    /// What to do.
    pub action: Action,
}

/// A node configuration plus a timeline of host actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Node under test.
    pub node: NodeConfig,
    /// Length of the run, in milliseconds.
    pub duration_ms: u64,
    /// Clock step, in microseconds.
    pub step_us: u64,
    /// Host actions. Actions sharing a time run in file order.
    pub events: Vec<ScheduledAction>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            duration_ms: 5_000,
            step_us: 1_000,
            events: Vec::new(),
        }
    }
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Final node scalars.
    pub summary: NodeSummary,
    /// Actions the node accepted.
    pub applied: u64,
    /// Actions the node refused.
    pub rejected: u64,
    /// Actions scheduled after the end of the run.
    pub skipped: u64,
    /// Every committed mode switch, forced or automatic.
    pub switches: Vec<ModeTransition>,
    /// Telemetry at the end of the run.
    pub telemetry: TelemetrySnapshot,
}

impl Scenario {
    /// Parses a RON scenario.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let scenario: Self = ron::de::from_str(source).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reads and parses a RON scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario '{}'", path.display()))?;
        Self::from_ron_str(&source)
            .with_context(|| format!("Invalid scenario '{}'", path.display()))
    }

    /// Checks the run parameters and the node configuration.
    pub fn validate(&self) -> Result<()> {
        if self.step_us == 0 {
            bail!("step_us must be positive");
        }
        self.node
            .validate()
            .context("Invalid node configuration")?;
        Ok(())
    }

    /// Runs the scenario from time zero to `duration_ms`.
    pub fn replay(&self) -> Result<ReplayReport> {
        self.validate()?;
        let mut node = SidelinkNode::new(self.node.clone()).context("Failed to build node")?;

        let mut timeline: Vec<&ScheduledAction> = self.events.iter().collect();
        timeline.sort_by_key(|event| event.at_ms);

        let end = SimTime::from_millis(self.duration_ms);
        let step = Duration::from_micros(self.step_us);
        let mut replay = Replay::default();
        let mut pending = timeline.into_iter().peekable();
        let mut now = SimTime::ZERO;

        log::info!(
            "Scenario: replaying {} actions over {} ms in {} us steps",
            self.events.len(),
            self.duration_ms,
            self.step_us
        );

        loop {
            while let Some(event) = pending.next_if(|e| SimTime::from_millis(e.at_ms) <= now) {
                replay.apply(&mut node, &event.action, now);
            }
            if let Some(transition) = node.advance(now).transition {
                replay.switches.push(transition);
            }
            if now >= end {
                break;
            }
            now = (now + step).min(end);
        }

        let skipped = pending.count() as u64;
        if skipped > 0 {
            log::warn!("Scenario: {} actions scheduled after the end of the run", skipped);
        }

        let telemetry = node.registry().snapshot();
        let summary = node.finish(end);
        Ok(ReplayReport {
            summary,
            applied: replay.applied,
            rejected: replay.rejected,
            skipped,
            switches: replay.switches,
            telemetry,
        })
    }
}

#[derive(Default)]
struct Replay {
    requests: Vec<Option<AllocationId>>,
    switches: Vec<ModeTransition>,
    applied: u64,
    rejected: u64,
}

impl Replay {
    fn apply(&mut self, node: &mut SidelinkNode, action: &Action, now: SimTime) {
        let outcome = match *action {
            Action::Request { priority, size } => {
                let result = node.request_resource(priority, size, now);
                self.requests.push(result.as_ref().ok().copied());
                result.map(|id| format!("granted {id}"))
            }
            Action::Release { request } => match self.requests.get(request).copied().flatten() {
                Some(id) => node
                    .release_resource(id)
                    .map(|allocation| format!("released {} blocks", allocation.size())),
                None => {
                    log::warn!("Scenario: request #{} holds no allocation", request);
                    self.rejected += 1;
                    return;
                }
            },
            Action::Metrics {
                rsrp_dbm,
                packet_delivery_ratio,
                latency_ms,
            } => node
                .update_link_metrics(LinkSample {
                    rsrp_dbm,
                    packet_delivery_ratio,
                    latency_ms,
                })
                .map(|()| format!("rsrp {rsrp_dbm} dBm")),
            Action::SwitchMode { mode } => node.switch_mode(mode, now).map(|transition| {
                self.switches.push(transition);
                format!("{} -> {}", transition.from, transition.to)
            }),
            Action::EnableMode { mode, enabled } => {
                node.enable_mode(mode, enabled);
                Ok(format!("{mode} enabled={enabled}"))
            }
        };

        match outcome {
            Ok(detail) => {
                self.applied += 1;
                log::debug!("Scenario: {} {:?}: {}", now, action, detail);
            }
            Err(err) => {
                self.rejected += 1;
                log::info!("Scenario: {} {:?} refused: {}", now, action, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_step_rejected() {
        let scenario = Scenario {
            step_us: 0,
            ..Default::default()
        };
        assert!(scenario.replay().is_err());
    }

    #[test]
    fn test_release_of_failed_request_is_rejected() {
        let scenario = Scenario {
            duration_ms: 10,
            events: vec![
                ScheduledAction {
                    at_ms: 0,
                    action: Action::Request {
                        priority: 1,
                        size: 10_000,
                    },
                },
                ScheduledAction {
                    at_ms: 1,
                    action: Action::Release { request: 0 },
                },
                ScheduledAction {
                    at_ms: 2,
                    action: Action::Release { request: 7 },
                },
            ],
            ..Default::default()
        };
        let report = scenario.replay().unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.rejected, 3);
    }

    #[test]
    fn test_actions_after_end_are_skipped() {
        let scenario = Scenario {
            duration_ms: 5,
            events: vec![ScheduledAction {
                at_ms: 6,
                action: Action::Request {
                    priority: 1,
                    size: 1,
                },
            }],
            ..Default::default()
        };
        let report = scenario.replay().unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.summary.pool.total_allocations, 0);
    }
}
