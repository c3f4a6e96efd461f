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

//! # Sidelink Telemetry
//!
//! Observability for a sidelink node:
//!
//! - [`MetricsRegistry`] hands out counter and gauge handles over a pluggable
//!   [`MetricsBackend`] (in memory by default) and exports JSON snapshots.
//! - [`TelemetryRecorder`] is an [`EventSink`](sidelink_core::EventSink) that
//!   counts every event by kind and can forward events over a channel.
//! - [`init_logging`] installs `env_logger` with an `info` default filter.

#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod storage;

pub use logging::init_logging;
pub use metrics::registry::{CounterHandle, GaugeHandle, MetricsRegistry, TelemetrySnapshot};
pub use metrics::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
pub use recorder::TelemetryRecorder;
pub use storage::backend::MetricsBackend;
pub use storage::memory_backend::InMemoryBackend;
