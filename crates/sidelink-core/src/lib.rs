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

//! # Sidelink Core
//!
//! Foundational crate containing the leaf data types, traits and error
//! taxonomy shared by the resource pool, the mode-switch controller and the
//! host driver.
//!
//! Nothing in here owns any behaviour beyond validation: the pool lives in
//! `sidelink-pool`, the state machine in `sidelink-control`, and the glue that
//! ticks both in `sidelink-node`.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod metrics;
pub mod mode;
pub mod params;
pub mod resource;
pub mod time;

pub use error::{ConfigError, PoolError, PoolResult, TransitionError};
pub use event::{EventKind, EventSink, LogSink, MemorySink, SidelinkEvent};
pub use metrics::{LinkMetrics, MetricsProvider, SharedLinkMetrics};
pub use mode::{ModeTable, SidelinkMode};
pub use params::ModeSwitchParams;
pub use resource::{AllocationId, BlockId, BlockPosition, Priority, ResourceBlock};
pub use time::SimTime;
