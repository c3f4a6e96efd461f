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

use sidelink_control::{
    Assessment, ControllerContext, ModeSwitchController, HISTORY_CAPACITY, MIN_SWITCH_INTERVAL,
};
use sidelink_core::{
    EventKind, LinkMetrics, MemorySink, ModeSwitchParams, SharedLinkMetrics, SidelinkMode, SimTime,
    TransitionError,
};
use std::sync::Arc;
use std::time::Duration;

fn controller_with(
    metrics: LinkMetrics,
) -> (ModeSwitchController, SharedLinkMetrics, Arc<MemorySink>) {
    let shared = SharedLinkMetrics::new(metrics);
    let sink = Arc::new(MemorySink::new());
    let params = ModeSwitchParams {
        rsrp_threshold_dbm: -110.0,
        hysteresis_db: 3.0,
        ..Default::default()
    };
    let context = ControllerContext::new(Arc::new(shared.clone()))
        .with_params(params)
        .with_sink(sink.clone());
    (ModeSwitchController::new(context).unwrap(), shared, sink)
}

fn good_link(rsrp_dbm: f64) -> LinkMetrics {
    LinkMetrics {
        packet_delivery_ratio: 0.95,
        latency_ms: 20.0,
        resource_utilization: 0.7,
        rsrp_dbm,
    }
}

#[test]
fn test_strong_rsrp_selects_network_scheduled() {
    let (mut controller, _, sink) = controller_with(good_link(-105.0));
    let now = SimTime::from_millis(2_000);

    let target = controller.evaluate(now).unwrap();
    assert_eq!(target, SidelinkMode::NetworkScheduled);

    let transition = controller.execute(target, now).unwrap();
    assert_eq!(transition.from, SidelinkMode::Autonomous);
    assert_eq!(transition.to, SidelinkMode::NetworkScheduled);
    assert_eq!(controller.current_mode(), SidelinkMode::NetworkScheduled);
    assert_eq!(controller.last_switch_time(), now);
    assert_eq!(controller.total_switches(), 1);
    assert_eq!(sink.count(EventKind::ModeSwitchSucceeded), 1);
}

#[test]
fn test_semi_persistent_refused_at_high_utilization() {
    let mut metrics = good_link(-120.0);
    metrics.resource_utilization = 0.85;
    let (mut controller, _, sink) = controller_with(metrics);

    let err = controller
        .execute(SidelinkMode::SemiPersistent, SimTime::from_millis(5_000))
        .unwrap_err();
    assert!(matches!(
        err,
        TransitionError::RequirementsNotMet {
            mode: SidelinkMode::SemiPersistent,
            ..
        }
    ));
    assert_eq!(controller.current_mode(), SidelinkMode::Autonomous);
    assert_eq!(controller.last_switch_time(), SimTime::ZERO);
    assert!(controller.history().is_empty());

    let failure = &sink.events()[0];
    assert_eq!(failure.kind, EventKind::ModeSwitchFailed);
    assert!(failure.detail.contains("resource utilization too high"));
}

#[test]
fn test_no_proposal_inside_hysteresis_band() {
    // High and saturated loads included: an indecisive RSRP gates the table first.
    for utilization in [0.0, 0.5, 0.79, 0.85, 0.95] {
        let mut link = good_link(-110.0);
        link.resource_utilization = utilization;
        let (mut controller, metrics, _) = controller_with(link);

        let mut now = SimTime::from_millis(1_000);
        // Strictly inside (-113, -107); the edges are covered by the unit tests.
        for step in 1..60 {
            let rsrp = -113.0 + 0.1 * step as f64;
            metrics.set_link_quality(rsrp, 0.95, 20.0).unwrap();
            now = now + controller.parameters().time_to_trigger;
            match controller.assess(now) {
                Assessment::ConditionsUnmet {
                    rsrp_decisive,
                    resources_available,
                } => {
                    assert!(!rsrp_decisive, "decisive at rsrp {rsrp}");
                    assert_eq!(resources_available, utilization < 0.9);
                }
                other => panic!("{other:?} at rsrp {rsrp}, utilization {utilization}"),
            }
        }
        assert_eq!(controller.total_switches(), 0);
        assert_eq!(controller.current_mode(), SidelinkMode::Autonomous);
    }
}

#[test]
fn test_cooldown_after_execute_blocks_evaluation() {
    let (mut controller, metrics, _) = controller_with(good_link(-105.0));
    let switched_at = SimTime::from_millis(2_000);
    let target = controller.evaluate(switched_at).unwrap();
    controller.execute(target, switched_at).unwrap();

    metrics.set_link_quality(-120.0, 0.95, 20.0).unwrap();
    let half_way = SimTime::from_millis(2_500);
    assert_eq!(
        controller.assess(half_way),
        Assessment::CoolingDown {
            remaining: Duration::from_millis(500)
        }
    );
    assert_eq!(controller.evaluate(half_way), None);
    assert_eq!(controller.current_mode(), SidelinkMode::NetworkScheduled);

    let released = switched_at + MIN_SWITCH_INTERVAL;
    assert_eq!(controller.evaluate(released), Some(SidelinkMode::Autonomous));
}

#[test]
fn test_switches_are_spaced_by_cooldown() {
    let (mut controller, metrics, _) = controller_with(good_link(-100.0));

    // Alternate the link between strong and weak every 250 ms of sim time.
    for tick in 1..=80u64 {
        let now = SimTime::from_millis(tick * 250);
        let rsrp = if (tick / 4) % 2 == 0 { -100.0 } else { -120.0 };
        metrics.set_link_quality(rsrp, 0.95, 20.0).unwrap();
        if let Some(target) = controller.evaluate(now) {
            let _ = controller.execute(target, now);
        }
    }

    let history = controller.history().to_vec();
    assert!(history.len() >= 2);
    for pair in history.windows(2) {
        assert!(pair[1].at.saturating_since(pair[0].at) >= MIN_SWITCH_INTERVAL);
    }
}

#[test]
fn test_history_keeps_last_hundred_in_order() {
    let (mut controller, _, _) = controller_with(good_link(-100.0));

    let total = HISTORY_CAPACITY as u64 + 25;
    for i in 1..=total {
        let target = if i % 2 == 1 {
            SidelinkMode::NetworkScheduled
        } else {
            SidelinkMode::Autonomous
        };
        controller
            .execute(target, SimTime::from_millis(i * 1_000))
            .unwrap();
    }

    let history = controller.history().to_vec();
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert_eq!(controller.total_switches(), total);
    assert_eq!(history[0].at, SimTime::from_millis(26_000));
    assert_eq!(
        history.last().unwrap().at,
        SimTime::from_millis(total * 1_000)
    );
    assert!(history.windows(2).all(|pair| pair[0].at < pair[1].at));
}
