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

//! Registration of metrics and typed handles to update them.

use crate::metrics::{Metric, MetricId, MetricType, MetricsError, MetricsResult};
use crate::storage::backend::MetricsBackend;
use crate::storage::memory_backend::InMemoryBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Front door to a [`MetricsBackend`]. Cloning shares the backend.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// A registry over a fresh [`InMemoryBackend`].
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()))
    }

    /// A registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Registers a counter starting at zero.
    pub fn register_counter(
        &self,
        id: MetricId,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        self.backend
            .put_metric(Metric::counter(id.clone(), description, 0))?;
        Ok(CounterHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers a gauge starting at zero.
    pub fn register_gauge(
        &self,
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        self.backend
            .put_metric(Metric::gauge(id.clone(), description, unit, 0.0))?;
        Ok(GaugeHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Returns a copy of a metric.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.backend.get_metric(id)
    }

    /// Number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// All metrics, sorted by id.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let mut metrics = self.backend.list_all_metrics();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));
        TelemetrySnapshot { metrics }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every registered metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Metrics sorted by id.
    pub metrics: Vec<Metric>,
}

impl TelemetrySnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> MetricsResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| MetricsError::Serialization(e.to_string()))
    }

    /// Looks up a metric by its display form, e.g. `"pool:utilization"`.
    pub fn find(&self, key: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id.to_string() == key)
    }
}

/// Handle to a registered counter.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    /// Adds one and returns the new value.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, 1)
    }

    /// Adds `amount` and returns the new value.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, amount)
    }

    /// Current value.
    pub fn get(&self) -> MetricsResult<u64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric.value.as_counter().ok_or(MetricsError::TypeMismatch {
            expected: MetricType::Counter,
            found: metric.value.metric_type(),
        })
    }

    /// The counter's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle to a registered gauge.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    /// Sets the value.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value)
    }

    /// Current value.
    pub fn get(&self) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric.value.as_gauge().ok_or(MetricsError::TypeMismatch {
            expected: MetricType::Gauge,
            found: metric.value.metric_type(),
        })
    }

    /// The gauge's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_registration_and_operations() {
        let registry = MetricsRegistry::new();
        let counter = registry
            .register_counter(MetricId::new("pool", "allocations"), "Committed allocations")
            .unwrap();

        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment_by(4).unwrap(), 5);
        assert_eq!(counter.get().unwrap(), 5);
        assert_eq!(registry.metric_count(), 1);
    }

    #[test]
    fn test_gauge_registration_and_operations() {
        let registry = MetricsRegistry::new();
        let gauge = registry
            .register_gauge(MetricId::new("pool", "utilization"), "Occupied share", "ratio")
            .unwrap();

        gauge.set(0.375).unwrap();
        assert_eq!(gauge.get().unwrap(), 0.375);
    }

    #[test]
    fn test_clones_share_the_backend() {
        let registry = MetricsRegistry::new();
        let counter = registry
            .clone()
            .register_counter(MetricId::new("mode", "switches"), "")
            .unwrap();
        counter.increment().unwrap();
        assert_eq!(
            registry.get_metric(counter.id()).unwrap().value.as_counter(),
            Some(1)
        );
    }

    #[test]
    fn test_snapshot_is_sorted_and_serializes() {
        let registry = MetricsRegistry::new();
        registry
            .register_gauge(MetricId::new("pool", "utilization"), "", "ratio")
            .unwrap()
            .set(0.5)
            .unwrap();
        registry
            .register_counter(MetricId::new("mode", "switches"), "")
            .unwrap();

        let snapshot = registry.snapshot();
        let names: Vec<_> = snapshot.metrics.iter().map(|m| m.id.to_string()).collect();
        assert_eq!(names, vec!["mode:switches", "pool:utilization"]);

        let json = snapshot.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metrics"][1]["value"]["Gauge"], 0.5);
        assert!(snapshot.find("pool:utilization").is_some());
    }
}
