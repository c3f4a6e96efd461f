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

//! Link metrics snapshot and the capability used to feed it.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// The measurements the mode controller decides on.
///
/// The controller never measures anything itself: a driver publishes these
/// values through a [`MetricsProvider`] before each evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    /// Fraction of packets delivered, in `[0, 1]`.
    pub packet_delivery_ratio: f64,
    /// End-to-end latency in milliseconds, `>= 0`.
    pub latency_ms: f64,
    /// Occupied share of the resource pool, in `[0, 1]`.
    pub resource_utilization: f64,
    /// Reference signal received power, in dBm.
    pub rsrp_dbm: f64,
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self {
            packet_delivery_ratio: 1.0,
            latency_ms: 0.0,
            resource_utilization: 0.0,
            rsrp_dbm: 0.0,
        }
    }
}

impl LinkMetrics {
    /// Checks every field against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.packet_delivery_ratio) {
            return Err(ConfigError::MetricOutOfRange {
                name: "packet_delivery_ratio",
                value: self.packet_delivery_ratio,
            });
        }
        if !self.latency_ms.is_finite() || self.latency_ms < 0.0 {
            return Err(ConfigError::MetricOutOfRange {
                name: "latency_ms",
                value: self.latency_ms,
            });
        }
        if !unit.contains(&self.resource_utilization) {
            return Err(ConfigError::MetricOutOfRange {
                name: "resource_utilization",
                value: self.resource_utilization,
            });
        }
        if !self.rsrp_dbm.is_finite() {
            return Err(ConfigError::MetricOutOfRange {
                name: "rsrp_dbm",
                value: self.rsrp_dbm,
            });
        }
        Ok(())
    }
}

/// Source of fresh link metrics for the mode controller.
pub trait MetricsProvider: Send + Sync {
    /// Returns the latest measurements.
    fn sample(&self) -> LinkMetrics;
}

/// A fixed snapshot is its own provider.
impl MetricsProvider for LinkMetrics {
    fn sample(&self) -> LinkMetrics {
        *self
    }
}

/// A metrics slot shared between a driver (writer) and a controller (reader).
#[derive(Debug, Clone, Default)]
pub struct SharedLinkMetrics {
    inner: Arc<RwLock<LinkMetrics>>,
}

impl SharedLinkMetrics {
    /// Creates a slot holding `initial`.
    pub fn new(initial: LinkMetrics) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replaces the whole snapshot after validating it.
    pub fn publish(&self, metrics: LinkMetrics) -> Result<(), ConfigError> {
        metrics.validate()?;
        *self.write() = metrics;
        Ok(())
    }

    /// Updates the resource utilization only.
    pub fn set_utilization(&self, utilization: f64) -> Result<(), ConfigError> {
        self.update(|next| next.resource_utilization = utilization)
    }

    /// Updates the radio-side measurements, keeping the utilization.
    pub fn set_link_quality(
        &self,
        rsrp_dbm: f64,
        packet_delivery_ratio: f64,
        latency_ms: f64,
    ) -> Result<(), ConfigError> {
        self.update(|next| {
            next.rsrp_dbm = rsrp_dbm;
            next.packet_delivery_ratio = packet_delivery_ratio;
            next.latency_ms = latency_ms;
        })
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> LinkMetrics {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    // Read, modify and validate under a single write guard.
    fn update(&self, apply: impl FnOnce(&mut LinkMetrics)) -> Result<(), ConfigError> {
        let mut guard = self.write();
        let mut next = *guard;
        apply(&mut next);
        next.validate()?;
        *guard = next;
        Ok(())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LinkMetrics> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricsProvider for SharedLinkMetrics {
    fn sample(&self) -> LinkMetrics {
        self.snapshot()
    }
}
