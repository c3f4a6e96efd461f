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

//! Structured events emitted by the pool and the controller.
//!
//! The core only produces events; where they end up (a log, a metrics
//! registry, a channel to another thread) is decided by the [`EventSink`]
//! injected at construction.

use crate::time::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The grid was (re)built.
    PoolConfigured,
    /// An allocation was committed.
    AllocationCommitted,
    /// An allocation request was refused.
    AllocationFailed,
    /// An allocation was released by its owner.
    AllocationReleased,
    /// An allocation outlived the periodicity window and was reclaimed.
    AllocationExpired,
    /// A mode transition was committed.
    ModeSwitchSucceeded,
    /// A mode transition was refused.
    ModeSwitchFailed,
    /// A configuration value or metric sample was rejected.
    ValidationError,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 8] = [
        EventKind::PoolConfigured,
        EventKind::AllocationCommitted,
        EventKind::AllocationFailed,
        EventKind::AllocationReleased,
        EventKind::AllocationExpired,
        EventKind::ModeSwitchSucceeded,
        EventKind::ModeSwitchFailed,
        EventKind::ValidationError,
    ];

    /// Stable snake_case label, used as a metric name.
    pub const fn label(self) -> &'static str {
        match self {
            EventKind::PoolConfigured => "pool_configured",
            EventKind::AllocationCommitted => "allocation_committed",
            EventKind::AllocationFailed => "allocation_failed",
            EventKind::AllocationReleased => "allocation_released",
            EventKind::AllocationExpired => "allocation_expired",
            EventKind::ModeSwitchSucceeded => "mode_switch_succeeded",
            EventKind::ModeSwitchFailed => "mode_switch_failed",
            EventKind::ValidationError => "validation_error",
        }
    }

    /// `true` for kinds that report a refused operation.
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            EventKind::AllocationFailed | EventKind::ModeSwitchFailed | EventKind::ValidationError
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single observability record: `{kind, timestamp, detail}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidelinkEvent {
    /// What happened.
    pub kind: EventKind,
    /// Simulation time of the occurrence.
    pub timestamp: SimTime,
    /// Free-form description for humans.
    pub detail: String,
}

impl SidelinkEvent {
    /// Creates a new event.
    pub fn new(kind: EventKind, timestamp: SimTime, detail: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SidelinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp, self.kind, self.detail)
    }
}

/// Receiver for [`SidelinkEvent`]s.
///
/// Implementations must be cheap and must not call back into the emitter.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn emit(&self, event: SidelinkEvent);
}

/// Writes every event through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SidelinkEvent) {
        if event.kind.is_failure() {
            log::warn!("Sidelink event {}", event);
        } else {
            log::debug!("Sidelink event {}", event);
        }
    }
}

/// Keeps every event in memory. Mostly useful in tests and replays.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SidelinkEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events, oldest first.
    pub fn events(&self) -> Vec<SidelinkEvent> {
        self.lock().clone()
    }

    /// Counts recorded events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// Removes and returns all recorded events.
    pub fn drain(&self) -> Vec<SidelinkEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SidelinkEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: SidelinkEvent) {
        self.lock().push(event);
    }
}
