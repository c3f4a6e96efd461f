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

//! Metric identities, values and errors.

pub mod registry;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// Unique identity of a metric: `namespace:name[labels]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricId {
    /// Broad category, e.g. `"pool"` or `"mode"`.
    pub namespace: String,
    /// Metric name within the namespace.
    pub name: String,
    /// Dimensional labels, kept sorted by key.
    pub labels: Vec<(String, String)>,
}

impl MetricId {
    /// Creates an id without labels.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: Vec::new(),
        }
    }

    /// Adds a label. Labels stay sorted by key.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self.labels.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{labels}]")?;
        }
        Ok(())
    }
}

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Monotonic count.
    Counter,
    /// Value that moves both ways.
    Gauge,
}

/// Current value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// Counter value.
    Counter(u64),
    /// Gauge value.
    Gauge(f64),
}

impl MetricValue {
    /// The [`MetricType`] of this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
        }
    }

    /// The counter value, if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            MetricValue::Gauge(_) => None,
        }
    }

    /// The gauge value, if this is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            MetricValue::Counter(_) => None,
        }
    }
}

/// A registered metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Identity.
    pub id: MetricId,
    /// What it measures.
    pub description: String,
    /// Unit of measurement.
    pub unit: String,
    /// Current value.
    pub value: MetricValue,
}

impl Metric {
    /// A counter starting at `initial`.
    pub fn counter(id: MetricId, description: impl Into<String>, initial: u64) -> Self {
        Self {
            id,
            description: description.into(),
            unit: "count".into(),
            value: MetricValue::Counter(initial),
        }
    }

    /// A gauge starting at `initial`.
    pub fn gauge(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        initial: f64,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            value: MetricValue::Gauge(initial),
        }
    }
}

/// Errors of the metrics layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// No metric with this id is registered.
    #[error("metric not found: {0}")]
    MetricNotFound(MetricId),
    /// The operation does not apply to this metric's type.
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Type the operation needs.
        expected: MetricType,
        /// Type of the stored metric.
        found: MetricType,
    },
    /// The storage layer failed.
    #[error("storage error: {0}")]
    Storage(String),
    /// A snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for metrics results.
pub type MetricsResult<T> = Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_id_labels_are_sorted() {
        let id = MetricId::new("events", "total")
            .with_label("kind", "allocation_failed")
            .with_label("al", "x");
        assert_eq!(id.labels[0].0, "al");
        assert_eq!(id.to_string(), "events:total[al=x,kind=allocation_failed]");
        assert_eq!(MetricId::new("pool", "utilization").to_string(), "pool:utilization");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(MetricValue::Counter(3).as_counter(), Some(3));
        assert_eq!(MetricValue::Counter(3).as_gauge(), None);
        assert_eq!(MetricValue::Gauge(0.5).metric_type(), MetricType::Gauge);
    }
}
