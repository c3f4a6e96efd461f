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

//! # Sidelink Node
//!
//! The host driver that ties the resource pool and the mode controller
//! together.
//!
//! A [`SidelinkNode`] owns both engines and is ticked by a [`Schedule`] with
//! two periodic timers: the allocation tick (one slot) runs pool maintenance
//! and the mode tick runs the controller. [`SidelinkService`] moves a node
//! onto its own thread and serializes every request through a mailbox.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod node;
pub mod schedule;
pub mod service;

pub use config::{ControllerConfig, NodeConfig};
pub use error::{NodeError, NodeResult};
pub use node::{LinkSample, NodeSummary, SidelinkNode, TickReport};
pub use schedule::{DueTicks, Schedule, Ticker};
pub use service::{ServiceConfig, ServiceHandle, SidelinkService};
