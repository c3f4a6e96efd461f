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

//! Event sink that feeds the metrics registry.

use crate::metrics::registry::{CounterHandle, MetricsRegistry};
use crate::metrics::{MetricId, MetricsResult};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use sidelink_core::{EventKind, EventSink, LogSink, SidelinkEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts every [`SidelinkEvent`] by kind into a [`MetricsRegistry`], then
/// optionally forwards it over a bounded channel and to a downstream sink.
///
/// Forwarding never blocks: when the channel is full the event is dropped
/// from the channel (it is still counted and passed downstream).
pub struct TelemetryRecorder {
    registry: MetricsRegistry,
    counters: Vec<(EventKind, CounterHandle)>,
    forward: Option<Sender<SidelinkEvent>>,
    dropped: AtomicU64,
    next: Arc<dyn EventSink>,
}

impl TelemetryRecorder {
    /// Registers one `events:total[kind=…]` counter per event kind.
    /// Events continue to the `log` facade.
    pub fn new(registry: MetricsRegistry) -> MetricsResult<Self> {
        let counters = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let id = MetricId::new("events", "total").with_label("kind", kind.label());
                registry
                    .register_counter(id, format!("Number of {} events", kind.label()))
                    .map(|handle| (kind, handle))
            })
            .collect::<MetricsResult<Vec<_>>>()?;

        Ok(Self {
            registry,
            counters,
            forward: None,
            dropped: AtomicU64::new(0),
            next: Arc::new(LogSink),
        })
    }

    /// Creates a recorder that also forwards into a new bounded channel.
    pub fn with_channel(
        registry: MetricsRegistry,
        capacity: usize,
    ) -> MetricsResult<(Self, Receiver<SidelinkEvent>)> {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let mut recorder = Self::new(registry)?;
        recorder.forward = Some(tx);
        Ok((recorder, rx))
    }

    /// Replaces the downstream sink.
    pub fn with_next(mut self, next: Arc<dyn EventSink>) -> Self {
        self.next = next;
        self
    }

    /// Events of `kind` seen so far.
    pub fn count(&self, kind: EventKind) -> u64 {
        self.counter(kind)
            .and_then(|counter| counter.get().ok())
            .unwrap_or(0)
    }

    /// Events that could not be forwarded because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    fn counter(&self, kind: EventKind) -> Option<&CounterHandle> {
        self.counters
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, handle)| handle)
    }
}

impl EventSink for TelemetryRecorder {
    fn emit(&self, event: SidelinkEvent) {
        if let Some(counter) = self.counter(event.kind) {
            if let Err(err) = counter.increment() {
                log::error!("Telemetry: failed to count {} event: {}", event.kind, err);
            }
        }

        if let Some(tx) = &self.forward {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::trace!("Telemetry: event receiver gone");
                }
            }
        }

        self.next.emit(event);
    }
}
