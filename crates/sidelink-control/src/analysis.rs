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

//! Link quality analysis.
//!
//! The [`LinkAnalyzer`] turns each metrics refresh into a [`LinkReport`]. The
//! report is informative only: it is logged and exposed to the driver but
//! never feeds the decision table.

use crate::history::RingBuffer;
use serde::{Deserialize, Serialize};
use sidelink_core::LinkMetrics;

/// Number of RSRP samples kept for the rolling average and trend.
const RSRP_WINDOW: usize = 16;
/// Latency that maps to a zero latency score.
const LATENCY_REFERENCE_MS: f64 = 100.0;
/// Minimum delivery ratio for the performance targets.
const TARGET_PDR: f64 = 0.9;
/// Maximum latency for the performance targets.
const TARGET_LATENCY_MS: f64 = 50.0;
/// Maximum utilization for the performance targets.
const TARGET_UTILIZATION: f64 = 0.8;

/// Summary of one metrics refresh.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkReport {
    /// Weighted score: 40% delivery, 30% latency, 30% free capacity.
    pub quality_score: f64,
    /// Delivery above 0.9, latency below 50 ms and utilization below 0.8.
    pub meets_performance_targets: bool,
    /// Mean of the recent RSRP samples (dBm).
    pub rsrp_average_dbm: f64,
    /// Newer-half minus older-half RSRP mean (dB). Positive when improving.
    pub rsrp_trend_db: f64,
}

/// Weighted link quality score.
///
/// Not clamped: latency above 100 ms drives the latency term negative.
pub fn quality_score(metrics: &LinkMetrics) -> f64 {
    0.4 * metrics.packet_delivery_ratio
        + 0.3 * (1.0 - metrics.latency_ms / LATENCY_REFERENCE_MS)
        + 0.3 * (1.0 - metrics.resource_utilization)
}

/// Whether the link meets the delivery, latency and utilization targets.
pub fn meets_performance_targets(metrics: &LinkMetrics) -> bool {
    metrics.packet_delivery_ratio > TARGET_PDR
        && metrics.latency_ms < TARGET_LATENCY_MS
        && metrics.resource_utilization < TARGET_UTILIZATION
}

/// Keeps a short RSRP window and produces a [`LinkReport`] per sample.
#[derive(Debug, Clone, Default)]
pub struct LinkAnalyzer {
    rsrp: RingBuffer<f64, RSRP_WINDOW>,
    last: LinkReport,
}

impl LinkAnalyzer {
    /// Creates an analyzer with an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a new sample into the window and returns the updated report.
    pub fn observe(&mut self, metrics: &LinkMetrics) -> LinkReport {
        self.rsrp.push(metrics.rsrp_dbm);
        self.last = LinkReport {
            quality_score: quality_score(metrics),
            meets_performance_targets: meets_performance_targets(metrics),
            rsrp_average_dbm: self.rsrp.average(),
            rsrp_trend_db: self.rsrp.trend(),
        };
        self.last
    }

    /// The report produced by the latest [`LinkAnalyzer::observe`].
    pub fn last_report(&self) -> LinkReport {
        self.last
    }
}
