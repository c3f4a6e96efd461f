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

//! The node facade: one pool, one controller, one schedule.

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use sidelink_control::{
    ControllerContext, LinkReport, ModeSwitchController, ModeTransition, MIN_SWITCH_INTERVAL,
};
use sidelink_core::{
    AllocationId, EventKind, EventSink, LinkMetrics, LogSink, ModeSwitchParams, Priority,
    SharedLinkMetrics, SidelinkEvent, SidelinkMode, SimTime,
};
use sidelink_pool::{Allocation, MaintenanceReport, PoolStats, ResourcePool};
use sidelink_telemetry::{GaugeHandle, MetricId, MetricsRegistry, TelemetryRecorder};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Radio-side measurements reported by the PHY.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSample {
    /// Reference signal received power, in dBm.
    pub rsrp_dbm: f64,
    /// Fraction of packets delivered, in `[0, 1]`.
    pub packet_delivery_ratio: f64,
    /// End-to-end latency in milliseconds.
    pub latency_ms: f64,
}

/// What one [`SidelinkNode::advance`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Set when the allocation tick fired.
    pub maintenance: Option<MaintenanceReport>,
    /// Whether the mode tick ran an evaluation.
    pub evaluated: bool,
    /// The switch applied by the mode tick, if any.
    pub transition: Option<ModeTransition>,
}

/// End-of-run scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Time of the summary.
    pub at: SimTime,
    /// Mode in force.
    pub mode: SidelinkMode,
    /// Occupied share of the pool.
    pub utilization: f64,
    /// Allocations still held.
    pub active_allocations: usize,
    /// Committed mode switches.
    pub total_switches: u64,
    /// Refused mode switches.
    pub failed_switches: u64,
    /// Pool lifetime counters.
    pub pool: PoolStats,
    /// Latest link analysis.
    pub link: LinkReport,
    /// Event counts by kind label.
    pub events: BTreeMap<String, u64>,
}

/// A sidelink-capable node.
///
/// The node has no timers of its own. The host calls [`advance`](Self::advance)
/// with the current time and the node fires whichever ticks are due.
pub struct SidelinkNode {
    config: NodeConfig,
    pool: ResourcePool,
    controller: ModeSwitchController,
    metrics: SharedLinkMetrics,
    schedule: Schedule,
    recorder: Arc<TelemetryRecorder>,
    utilization_gauge: GaugeHandle,
    quality_gauge: GaugeHandle,
    last_allocation: Option<SimTime>,
    link_sampled: bool,
    clock: SimTime,
}

impl std::fmt::Debug for SidelinkNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidelinkNode")
            .field("pool", &self.pool)
            .field("controller", &self.controller)
            .field("schedule", &self.schedule)
            .field("clock", &self.clock)
            .finish()
    }
}

impl SidelinkNode {
    /// Builds a node whose events end up in the `log` facade.
    pub fn new(config: NodeConfig) -> NodeResult<Self> {
        Self::with_sink(config, Arc::new(LogSink))
    }

    /// Builds a node whose events are counted and then passed to `downstream`.
    pub fn with_sink(config: NodeConfig, downstream: Arc<dyn EventSink>) -> NodeResult<Self> {
        config.validate()?;

        let registry = MetricsRegistry::new();
        let recorder = Arc::new(TelemetryRecorder::new(registry.clone())?.with_next(downstream));
        let sink: Arc<dyn EventSink> = recorder.clone();

        let utilization_gauge = registry.register_gauge(
            MetricId::new("pool", "utilization"),
            "Occupied share of the resource pool",
            "ratio",
        )?;
        let quality_gauge = registry.register_gauge(
            MetricId::new("link", "quality"),
            "Weighted link quality score",
            "score",
        )?;

        let pool = ResourcePool::with_sink(&config.pool, sink.clone())?;
        let metrics = SharedLinkMetrics::new(LinkMetrics::default());
        let context = ControllerContext::new(Arc::new(metrics.clone()))
            .with_params(config.controller.params())
            .with_initial_mode(config.controller.initial_mode)
            .with_enabled_modes(config.controller.enabled_modes())
            .with_sink(sink);
        let controller = ModeSwitchController::new(context)?;
        let schedule = Schedule::from_config(&config, SimTime::ZERO)?;

        log::info!(
            "Node: numerology {} (slot {:?}), carrier {:.3} GHz, {} MHz, sidelink {}",
            config.numerology_index,
            config.slot_duration(),
            config.carrier_frequency_hz / 1e9,
            config.bandwidth_mhz,
            if config.sidelink_enabled { "enabled" } else { "disabled" }
        );

        Ok(Self {
            config,
            pool,
            controller,
            metrics,
            schedule,
            recorder,
            utilization_gauge,
            quality_gauge,
            last_allocation: None,
            link_sampled: false,
            clock: SimTime::ZERO,
        })
    }

    /// Fires the ticks that are due at `now`.
    ///
    /// The allocation tick runs pool maintenance and publishes the
    /// utilization. The mode tick evaluates the controller once more than
    /// [`MIN_SWITCH_INTERVAL`] has passed since the last switch, and applies
    /// any proposal straight away. Nothing is evaluated until the host has
    /// published a first link sample.
    pub fn advance(&mut self, now: SimTime) -> TickReport {
        self.clock = self.clock.max(now);
        let due = self.schedule.poll(now);
        let mut report = TickReport::default();

        if due.allocation {
            let maintenance = self.pool.maintain(now);
            self.publish_utilization(maintenance.utilization);
            report.maintenance = Some(maintenance);
        }

        if due.mode && !self.link_sampled {
            log::trace!("Node: mode tick at {} skipped, no link sample yet", now);
        } else if due.mode && self.controller.time_since_last_switch(now) > MIN_SWITCH_INTERVAL {
            report.evaluated = true;
            if let Some(target) = self.controller.evaluate(now) {
                match self.controller.execute(target, now) {
                    Ok(transition) => report.transition = Some(transition),
                    Err(err) => log::debug!("Node: proposed switch to {} refused: {}", target, err),
                }
            }
            self.publish_quality();
        }

        report
    }

    /// Asks the pool for `size` contiguous blocks.
    pub fn request_resource(
        &mut self,
        priority: Priority,
        size: usize,
        now: SimTime,
    ) -> NodeResult<AllocationId> {
        self.clock = self.clock.max(now);
        if !self.config.sidelink_enabled {
            log::warn!("Node: resource request while sidelink is disabled");
            return Err(NodeError::SidelinkDisabled);
        }
        if !self.pool.check_availability(size) {
            log::debug!(
                "Node: {} blocks requested, {} available",
                size,
                self.pool.available_block_count()
            );
            return Err(NodeError::Unavailable { size });
        }

        let id = self.pool.allocate(priority, size, now)?;
        self.last_allocation = Some(now);
        self.publish_utilization(self.pool.utilization());
        Ok(id)
    }

    /// Returns an allocation to the pool.
    pub fn release_resource(&mut self, id: AllocationId) -> NodeResult<Allocation> {
        let allocation = self.pool.release(id)?;
        self.publish_utilization(self.pool.utilization());
        Ok(allocation)
    }

    /// Forces a transition to `mode`, subject to the controller's checks.
    pub fn switch_mode(&mut self, mode: SidelinkMode, now: SimTime) -> NodeResult<ModeTransition> {
        self.clock = self.clock.max(now);
        let transition = self.controller.execute(mode, now)?;
        self.publish_quality();
        Ok(transition)
    }

    /// Publishes fresh radio measurements for the next evaluation.
    ///
    /// An out-of-range sample is rejected and the previous one is kept.
    pub fn update_link_metrics(&mut self, sample: LinkSample) -> NodeResult<()> {
        let published = self.metrics.set_link_quality(
            sample.rsrp_dbm,
            sample.packet_delivery_ratio,
            sample.latency_ms,
        );
        if let Err(err) = published {
            log::warn!("Node: rejected link sample: {}", err);
            self.recorder.emit(SidelinkEvent::new(
                EventKind::ValidationError,
                self.clock,
                err.to_string(),
            ));
            return Err(err.into());
        }
        self.link_sampled = true;
        Ok(())
    }

    /// Enables or disables a mode.
    pub fn enable_mode(&mut self, mode: SidelinkMode, enabled: bool) {
        self.controller.enable_mode(mode, enabled);
    }

    /// Replaces the switching parameters, stamping any rejection with the
    /// latest time the node has seen.
    pub fn set_mode_parameters(&mut self, params: ModeSwitchParams) -> NodeResult<()> {
        self.controller.set_parameters(params, self.clock)?;
        Ok(())
    }

    /// Snapshot of the end-of-run scalars at `now`.
    pub fn summary(&self, now: SimTime) -> NodeSummary {
        let events = EventKind::ALL
            .into_iter()
            .map(|kind| (kind.label().to_string(), self.recorder.count(kind)))
            .collect();
        NodeSummary {
            at: now,
            mode: self.controller.current_mode(),
            utilization: self.pool.utilization(),
            active_allocations: self.pool.active_allocation_count(),
            total_switches: self.controller.total_switches(),
            failed_switches: self.controller.failed_switches(),
            pool: self.pool.stats(),
            link: self.controller.link_report(),
            events,
        }
    }

    /// Ends the run and records its scalars.
    pub fn finish(self, now: SimTime) -> NodeSummary {
        let summary = self.summary(now);
        log::info!(
            "Node: finished at {} in {} (utilization {:.3}, {} switches, {} failed, {} allocations, {} failed allocations)",
            now,
            summary.mode,
            summary.utilization,
            summary.total_switches,
            summary.failed_switches,
            summary.pool.total_allocations,
            summary.pool.failed_allocations
        );
        summary
    }

    /// Whether any allocation is currently held.
    pub fn is_transmitting(&self) -> bool {
        self.pool.active_allocation_count() > 0
    }

    /// Whether a link sample has been accepted since start-up.
    pub fn has_link_sample(&self) -> bool {
        self.link_sampled
    }

    /// Time of the last successful resource request.
    pub fn last_allocation_time(&self) -> Option<SimTime> {
        self.last_allocation
    }

    /// The mode in force.
    pub fn current_mode(&self) -> SidelinkMode {
        self.controller.current_mode()
    }

    /// Latest time seen by the node.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// The configuration the node was built from.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Read-only view of the pool.
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Read-only view of the controller.
    pub fn controller(&self) -> &ModeSwitchController {
        &self.controller
    }

    /// The metrics slot the controller reads from.
    pub fn link_metrics(&self) -> LinkMetrics {
        self.metrics.snapshot()
    }

    /// The event counter and its registry.
    pub fn recorder(&self) -> &Arc<TelemetryRecorder> {
        &self.recorder
    }

    /// The telemetry registry.
    pub fn registry(&self) -> &MetricsRegistry {
        self.recorder.registry()
    }

    fn publish_utilization(&self, utilization: f64) {
        if let Err(err) = self.metrics.set_utilization(utilization) {
            log::warn!("Node: could not publish utilization: {}", err);
        }
        if let Err(err) = self.utilization_gauge.set(utilization) {
            log::error!("Node: failed to update utilization gauge: {}", err);
        }
    }

    fn publish_quality(&self) {
        let quality = self.controller.link_report().quality_score;
        if let Err(err) = self.quality_gauge.set(quality) {
            log::error!("Node: failed to update link quality gauge: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidelink_core::{MemorySink, PoolError};
    use sidelink_pool::PoolConfig;

    fn node(num_subchannels: usize, num_symbols: usize) -> SidelinkNode {
        let config = NodeConfig {
            pool: PoolConfig::new(num_subchannels, num_symbols),
            ..Default::default()
        };
        SidelinkNode::new(config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = NodeConfig {
            numerology_index: 9,
            ..Default::default()
        };
        assert!(matches!(SidelinkNode::new(config), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_request_tracks_transmission_state() {
        let mut node = node(4, 2);
        assert!(!node.is_transmitting());
        assert_eq!(node.last_allocation_time(), None);

        let id = node.request_resource(1, 3, SimTime::from_millis(5)).unwrap();
        assert!(node.is_transmitting());
        assert_eq!(node.last_allocation_time(), Some(SimTime::from_millis(5)));
        assert_eq!(node.link_metrics().resource_utilization, 3.0 / 8.0);

        node.release_resource(id).unwrap();
        assert!(!node.is_transmitting());
        assert_eq!(node.link_metrics().resource_utilization, 0.0);
    }

    #[test]
    fn test_unavailable_before_allocating() {
        let mut node = node(2, 2);
        assert!(matches!(
            node.request_resource(1, 5, SimTime::ZERO),
            Err(NodeError::Unavailable { size: 5 })
        ));
        assert_eq!(node.pool().stats().failed_allocations, 0);
    }

    #[test]
    fn test_release_unknown_is_pool_error() {
        let mut node = node(2, 2);
        assert!(matches!(
            node.release_resource(AllocationId::new(3)),
            Err(NodeError::Pool(PoolError::UnknownAllocation(_)))
        ));
    }

    #[test]
    fn test_disabled_sidelink_refuses_requests() {
        let config = NodeConfig {
            sidelink_enabled: false,
            ..Default::default()
        };
        let mut node = SidelinkNode::new(config).unwrap();
        assert!(matches!(
            node.request_resource(1, 1, SimTime::ZERO),
            Err(NodeError::SidelinkDisabled)
        ));
    }

    #[test]
    fn test_mode_tick_waits_for_first_sample() {
        let mut node = node(4, 2);
        for ms in 1..=1_500 {
            let report = node.advance(SimTime::from_millis(ms));
            assert!(!report.evaluated);
            assert!(report.transition.is_none());
        }
        assert!(!node.has_link_sample());
        assert_eq!(node.current_mode(), SidelinkMode::Autonomous);
        assert_eq!(node.controller().total_switches(), 0);

        node.update_link_metrics(LinkSample {
            rsrp_dbm: -100.0,
            packet_delivery_ratio: 0.95,
            latency_ms: 10.0,
        })
        .unwrap();
        assert!(node.has_link_sample());
        let report = node.advance(SimTime::from_millis(1_600));
        assert!(report.evaluated);
        assert_eq!(node.current_mode(), SidelinkMode::NetworkScheduled);
    }

    #[test]
    fn test_rejected_sample_does_not_unlock_mode_tick() {
        let mut node = node(4, 2);
        let bad = LinkSample {
            rsrp_dbm: -100.0,
            packet_delivery_ratio: 2.0,
            latency_ms: 10.0,
        };
        assert!(node.update_link_metrics(bad).is_err());
        assert!(!node.has_link_sample());
        assert!(!node.advance(SimTime::from_millis(1_100)).evaluated);
    }

    #[test]
    fn test_rejected_parameters_use_node_clock() {
        let sink = Arc::new(MemorySink::new());
        let mut node = SidelinkNode::with_sink(NodeConfig::default(), sink.clone()).unwrap();
        node.advance(SimTime::from_millis(250));

        let bad = ModeSwitchParams {
            rsrp_threshold_dbm: -60.0,
            ..Default::default()
        };
        assert!(node.set_mode_parameters(bad).is_err());
        let events = sink.events();
        let rejected = events
            .iter()
            .find(|event| event.kind == EventKind::ValidationError)
            .unwrap();
        assert_eq!(rejected.timestamp, SimTime::from_millis(250));
    }

    #[test]
    fn test_allocation_tick_publishes_gauge() {
        let mut node = node(4, 2);
        node.request_resource(1, 2, SimTime::ZERO).unwrap();
        let report = node.advance(SimTime::from_millis(1));
        assert!(report.maintenance.is_some());
        assert!(!report.evaluated);

        let gauge = node
            .registry()
            .snapshot()
            .find("pool:utilization")
            .and_then(|metric| metric.value.as_gauge());
        assert_eq!(gauge, Some(0.25));
    }
}
