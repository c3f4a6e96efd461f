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

use sidelink_core::{EventKind, EventSink, SidelinkEvent, SimTime};
use sidelink_telemetry::{MetricId, MetricValue, MetricsRegistry, TelemetryRecorder};
use std::sync::Arc;
use std::thread;

#[test]
fn test_recorder_counts_from_many_threads_and_exports() {
    let registry = MetricsRegistry::new();
    let recorder = Arc::new(TelemetryRecorder::new(registry.clone()).unwrap());
    let utilization = registry
        .register_gauge(MetricId::new("pool", "utilization"), "Occupied share", "ratio")
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let recorder = recorder.clone();
            thread::spawn(move || {
                for i in 0..50u64 {
                    recorder.emit(SidelinkEvent::new(
                        EventKind::AllocationCommitted,
                        SimTime::from_millis(i),
                        format!("worker {worker}"),
                    ));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    utilization.set(0.25).unwrap();

    assert_eq!(recorder.count(EventKind::AllocationCommitted), 200);

    let snapshot = registry.snapshot();
    let committed = snapshot
        .find("events:total[kind=allocation_committed]")
        .unwrap();
    assert_eq!(committed.value, MetricValue::Counter(200));
    assert_eq!(
        snapshot.find("pool:utilization").unwrap().value,
        MetricValue::Gauge(0.25)
    );

    let json = snapshot.to_json().unwrap();
    assert!(json.contains("allocation_committed"));
}
