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

//! The mode-switch state machine.

use crate::analysis::{LinkAnalyzer, LinkReport};
use crate::decision::{self, Assessment, MIN_SWITCH_INTERVAL};
use crate::history::{ModeHistory, ModeTransition};
use sidelink_core::{
    ConfigError, EventKind, EventSink, LinkMetrics, LogSink, MetricsProvider, ModeSwitchParams,
    ModeTable, SidelinkEvent, SidelinkMode, SimTime, TransitionError,
};
use std::sync::Arc;
use std::time::Duration;

/// Everything a controller needs from its host, injected at construction.
#[derive(Clone)]
pub struct ControllerContext {
    /// Initial switching parameters.
    pub params: ModeSwitchParams,
    /// Mode the controller starts in. Must be enabled.
    pub initial_mode: SidelinkMode,
    /// Which modes may be entered.
    pub enabled_modes: ModeTable<bool>,
    /// Where fresh link metrics come from.
    pub metrics: Arc<dyn MetricsProvider>,
    /// Where switch outcomes are reported.
    pub sink: Arc<dyn EventSink>,
}

impl ControllerContext {
    /// Default parameters, autonomous start, every mode enabled, events to
    /// the `log` facade.
    pub fn new(metrics: Arc<dyn MetricsProvider>) -> Self {
        Self {
            params: ModeSwitchParams::default(),
            initial_mode: SidelinkMode::default(),
            enabled_modes: ModeTable::all_enabled(),
            metrics,
            sink: Arc::new(LogSink),
        }
    }

    /// Replaces the switching parameters.
    pub fn with_params(mut self, params: ModeSwitchParams) -> Self {
        self.params = params;
        self
    }

    /// Replaces the initial mode.
    pub fn with_initial_mode(mut self, mode: SidelinkMode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Replaces the enabled-mode table.
    pub fn with_enabled_modes(mut self, enabled: ModeTable<bool>) -> Self {
        self.enabled_modes = enabled;
        self
    }

    /// Replaces the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Decides when to move between sidelink modes and applies the moves.
///
/// The controller never reads a clock: every call that depends on time takes
/// `now`. Both timestamps start at zero, so nothing is proposed or executed
/// during the first `max(time_to_trigger, 1 s)` of a run.
pub struct ModeSwitchController {
    mode: SidelinkMode,
    params: ModeSwitchParams,
    enabled: ModeTable<bool>,
    source: Arc<dyn MetricsProvider>,
    metrics: LinkMetrics,
    analyzer: LinkAnalyzer,
    last_switch: SimTime,
    last_evaluation: SimTime,
    total_switches: u64,
    failed_switches: u64,
    history: ModeHistory,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ModeSwitchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSwitchController")
            .field("mode", &self.mode)
            .field("params", &self.params)
            .field("enabled", &self.enabled)
            .field("metrics", &self.metrics)
            .field("last_switch", &self.last_switch)
            .field("last_evaluation", &self.last_evaluation)
            .field("total_switches", &self.total_switches)
            .finish()
    }
}

impl ModeSwitchController {
    /// Builds a controller from `context`.
    ///
    /// Fails if the parameters are out of range or the initial mode is
    /// disabled.
    pub fn new(context: ControllerContext) -> Result<Self, ConfigError> {
        context.params.validate()?;
        if !context.enabled_modes[context.initial_mode] {
            return Err(ConfigError::InitialModeDisabled(context.initial_mode));
        }

        let sample = context.metrics.sample();
        let metrics = if sample.validate().is_ok() {
            sample
        } else {
            LinkMetrics::default()
        };

        log::info!(
            "ModeSwitch: starting in {} (threshold {} dBm, hysteresis {} dB, ttt {:?})",
            context.initial_mode,
            context.params.rsrp_threshold_dbm,
            context.params.hysteresis_db,
            context.params.time_to_trigger
        );

        Ok(Self {
            mode: context.initial_mode,
            params: context.params,
            enabled: context.enabled_modes,
            source: context.metrics,
            metrics,
            analyzer: LinkAnalyzer::new(),
            last_switch: SimTime::ZERO,
            last_evaluation: SimTime::ZERO,
            total_switches: 0,
            failed_switches: 0,
            history: ModeHistory::new(),
            sink: context.sink,
        })
    }

    /// Runs the gates and the decision table and explains the outcome.
    pub fn assess(&mut self, now: SimTime) -> Assessment {
        let since_evaluation = now.saturating_since(self.last_evaluation);
        if since_evaluation < self.params.time_to_trigger {
            return Assessment::Unstable {
                remaining: self.params.time_to_trigger - since_evaluation,
            };
        }
        if let Some(remaining) = self.cooldown_remaining(now) {
            return Assessment::CoolingDown { remaining };
        }

        self.refresh_metrics(now);

        let rsrp_decisive = decision::rsrp_decisive(&self.params, self.metrics.rsrp_dbm);
        let resources_available = decision::resources_available(&self.metrics);
        let outcome = if !(rsrp_decisive && resources_available) {
            Assessment::ConditionsUnmet {
                rsrp_decisive,
                resources_available,
            }
        } else {
            let target = self.fallback(decision::target_mode(&self.params, &self.metrics, self.mode));
            if target == self.mode {
                Assessment::Hold(target)
            } else if decision::check_transition(self.mode, target, &self.enabled).is_err() {
                Assessment::Blocked(target)
            } else {
                Assessment::Propose(target)
            }
        };

        if outcome.records_evaluation() {
            self.last_evaluation = now;
        }
        log::debug!("ModeSwitch: assessment at {}: {:?}", now, outcome);
        outcome
    }

    /// Returns the recommended mode, if a switch is warranted.
    pub fn evaluate(&mut self, now: SimTime) -> Option<SidelinkMode> {
        let proposal = self.assess(now).proposal();
        if let Some(target) = proposal {
            log::info!("ModeSwitch: evaluation suggests switching to {}", target);
        }
        proposal
    }

    /// Applies a transition to `target`.
    ///
    /// On failure the current mode and timestamps are unchanged and a
    /// `ModeSwitchFailed` event carries the reason.
    pub fn execute(
        &mut self,
        target: SidelinkMode,
        now: SimTime,
    ) -> Result<ModeTransition, TransitionError> {
        self.refresh_metrics(now);

        let checked = match self.cooldown_remaining(now) {
            Some(remaining) => Err(TransitionError::CoolingDown { remaining }),
            None => decision::check_transition(self.mode, target, &self.enabled),
        }
        .and_then(|()| {
            decision::requirement(target, &self.params, &self.metrics)
                .map_err(|reason| TransitionError::RequirementsNotMet { mode: target, reason })
        });

        if let Err(err) = checked {
            self.failed_switches += 1;
            log::warn!("ModeSwitch: failed to switch {} -> {}: {}", self.mode, target, err);
            self.emit(
                EventKind::ModeSwitchFailed,
                now,
                format!("{} -> {}: {}", self.mode, target, err),
            );
            return Err(err);
        }

        let transition = ModeTransition {
            at: now,
            from: self.mode,
            to: target,
        };
        self.mode = target;
        self.last_switch = now;
        self.total_switches += 1;
        self.history.push(transition);

        log::info!(
            "ModeSwitch: switched {} -> {} (switch #{})",
            transition.from,
            transition.to,
            self.total_switches
        );
        self.emit(
            EventKind::ModeSwitchSucceeded,
            now,
            format!("{} -> {}", transition.from, transition.to),
        );
        Ok(transition)
    }

    /// Replaces the switching parameters at `now`. Invalid values leave the
    /// old ones in place.
    pub fn set_parameters(&mut self, params: ModeSwitchParams, now: SimTime) -> Result<(), ConfigError> {
        if let Err(err) = params.validate() {
            log::warn!("ModeSwitch: rejected parameters at {}: {}", now, err);
            self.emit(EventKind::ValidationError, now, err.to_string());
            return Err(err);
        }
        self.params = params;
        log::debug!("ModeSwitch: parameters updated to {:?}", params);
        Ok(())
    }

    /// Enables or disables a mode.
    pub fn enable_mode(&mut self, mode: SidelinkMode, enabled: bool) {
        self.enabled.set(mode, enabled);
        log::info!(
            "ModeSwitch: {} {}",
            mode,
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Pulls a fresh sample from the metrics provider.
    ///
    /// An out-of-range sample is reported as a validation error and the
    /// previous snapshot is kept.
    pub fn refresh_metrics(&mut self, now: SimTime) -> LinkReport {
        let sample = self.source.sample();
        match sample.validate() {
            Ok(()) => self.metrics = sample,
            Err(err) => {
                log::warn!("ModeSwitch: ignoring metrics sample: {}", err);
                self.emit(EventKind::ValidationError, now, err.to_string());
            }
        }
        let report = self.analyzer.observe(&self.metrics);
        log::debug!(
            "ModeSwitch: link quality {:.3} (targets met: {}), rsrp avg {:.1} dBm",
            report.quality_score,
            report.meets_performance_targets,
            report.rsrp_average_dbm
        );
        report
    }

    /// Whether a switch is allowed at `now` as far as the cooldown goes.
    pub fn cooldown_elapsed(&self, now: SimTime) -> bool {
        self.cooldown_remaining(now).is_none()
    }

    /// Time since the last committed switch (or since the start of the run).
    pub fn time_since_last_switch(&self, now: SimTime) -> Duration {
        now.saturating_since(self.last_switch)
    }

    /// The mode currently in force.
    pub fn current_mode(&self) -> SidelinkMode {
        self.mode
    }

    /// When the last switch was committed.
    pub fn last_switch_time(&self) -> SimTime {
        self.last_switch
    }

    /// When an evaluation was last recorded.
    pub fn last_evaluation_time(&self) -> SimTime {
        self.last_evaluation
    }

    /// Number of committed switches.
    pub fn total_switches(&self) -> u64 {
        self.total_switches
    }

    /// Number of refused executions.
    pub fn failed_switches(&self) -> u64 {
        self.failed_switches
    }

    /// The most recent transitions, oldest first.
    pub fn history(&self) -> &ModeHistory {
        &self.history
    }

    /// Whether `mode` may be entered.
    pub fn is_mode_enabled(&self, mode: SidelinkMode) -> bool {
        self.enabled[mode]
    }

    /// The enabled-mode table.
    pub fn enabled_modes(&self) -> ModeTable<bool> {
        self.enabled
    }

    /// Last accepted metrics snapshot.
    pub fn metrics(&self) -> LinkMetrics {
        self.metrics
    }

    /// Current switching parameters.
    pub fn parameters(&self) -> ModeSwitchParams {
        self.params
    }

    /// Link report from the latest metrics refresh.
    pub fn link_report(&self) -> LinkReport {
        self.analyzer.last_report()
    }

    fn cooldown_remaining(&self, now: SimTime) -> Option<Duration> {
        let since = now.saturating_since(self.last_switch);
        (since < MIN_SWITCH_INTERVAL).then(|| MIN_SWITCH_INTERVAL - since)
    }

    // A controller left in a disabled mode falls back to autonomous when the
    // table would otherwise hold.
    fn fallback(&self, target: SidelinkMode) -> SidelinkMode {
        if target == self.mode && !self.enabled[self.mode] && self.enabled[SidelinkMode::Autonomous] {
            SidelinkMode::Autonomous
        } else {
            target
        }
    }

    fn emit(&self, kind: EventKind, at: SimTime, detail: String) {
        self.sink.emit(SidelinkEvent::new(kind, at, detail));
    }
}
