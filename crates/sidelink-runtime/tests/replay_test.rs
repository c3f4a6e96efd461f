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

use sidelink_core::{SidelinkMode, SimTime};
use sidelink_runtime::{Action, Scenario};
use std::fs;

const EXAMPLE: &str = include_str!("../scenarios/example.ron");

#[test]
fn test_example_scenario_replays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("example.ron");
    fs::write(&path, EXAMPLE).unwrap();

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.events.len(), 8);
    assert!(matches!(
        scenario.events[1].action,
        Action::Request { priority: 1, size: 6 }
    ));

    let report = scenario.replay().unwrap();
    let switches: Vec<_> = report
        .switches
        .iter()
        .map(|transition| (transition.at, transition.to))
        .collect();
    assert_eq!(
        switches,
        vec![
            (SimTime::from_millis(2_100), SidelinkMode::NetworkScheduled),
            (SimTime::from_millis(3_500), SidelinkMode::SemiPersistent),
            (SimTime::from_millis(4_600), SidelinkMode::NetworkScheduled),
        ]
    );

    let summary = &report.summary;
    assert_eq!(summary.mode, SidelinkMode::NetworkScheduled);
    assert_eq!(summary.total_switches, 3);
    assert_eq!(summary.pool.total_allocations, 2);
    assert_eq!(summary.pool.released, 1);
    assert_eq!(summary.pool.expired, 1);
    assert_eq!(summary.active_allocations, 0);
    assert_eq!(report.applied, 7);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.skipped, 0);
}

#[test]
fn test_summary_serializes_to_json() {
    let scenario = Scenario::from_ron_str(EXAMPLE).unwrap();
    let report = scenario.replay().unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();

    assert_eq!(json["summary"]["total_switches"], 3);
    assert_eq!(json["summary"]["mode"], "NetworkScheduled");
    assert!(json["telemetry"]["metrics"].as_array().unwrap().len() >= 10);
}

#[test]
fn test_unreadable_scenario_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.ron");
    let err = Scenario::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing.ron"));
}

#[test]
fn test_invalid_node_config_rejected_on_load() {
    let err = Scenario::from_ron_str("(node: (numerology_index: 7))").unwrap_err();
    assert!(format!("{err:#}").contains("numerology_index"));
}
