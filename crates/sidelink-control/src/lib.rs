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

//! # Sidelink Control
//!
//! The mode-switch controller. It samples link metrics on a periodic cadence,
//! runs them through a stability gate, a cooldown gate and a hysteresis band,
//! and proposes a transition between the four sidelink modes. A proposal is
//! only applied when the driver calls [`ModeSwitchController::execute`], which
//! re-validates the transition against the per-mode entry requirements.

#![warn(missing_docs)]

pub mod analysis;
pub mod controller;
pub mod decision;
pub mod history;

pub use analysis::{LinkAnalyzer, LinkReport};
pub use controller::{ControllerContext, ModeSwitchController};
pub use decision::{Assessment, MIN_SWITCH_INTERVAL};
pub use history::{ModeHistory, ModeTransition, RingBuffer, HISTORY_CAPACITY};
