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

//! Actor service that owns a node on a dedicated thread.

use crate::error::{NodeError, NodeResult};
use crate::node::{LinkSample, NodeSummary, SidelinkNode};
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use sidelink_control::ModeTransition;
use sidelink_core::{AllocationId, ConfigError, Priority, SidelinkMode, SimTime};
use sidelink_pool::Allocation;
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for the sidelink service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum number of queued commands. Senders block when it is full.
    pub mailbox_capacity: usize,
    /// How long the service waits for a command before ticking the node.
    pub tick_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            tick_interval: Duration::from_millis(1),
        }
    }
}

impl ServiceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "mailbox_capacity",
                reason: "must be positive".to_string(),
            });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidParameter {
                name: "tick_interval",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

enum Command {
    Request {
        priority: Priority,
        size: usize,
        deadline: Option<Instant>,
        reply: Sender<NodeResult<AllocationId>>,
    },
    Release {
        id: AllocationId,
        reply: Sender<NodeResult<Allocation>>,
    },
    SwitchMode {
        mode: SidelinkMode,
        deadline: Option<Instant>,
        reply: Sender<NodeResult<ModeTransition>>,
    },
    UpdateMetrics {
        sample: LinkSample,
        reply: Sender<NodeResult<()>>,
    },
    EnableMode {
        mode: SidelinkMode,
        enabled: bool,
        reply: Sender<()>,
    },
    Summary {
        reply: Sender<NodeSummary>,
    },
    Shutdown {
        reply: Sender<NodeSummary>,
    },
}

/// Cloneable client side of a [`SidelinkService`].
///
/// Every call is a request/reply round trip through the service mailbox, so
/// calls from many threads are applied to the node one at a time.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: Sender<Command>,
}

impl ServiceHandle {
    /// Requests `size` contiguous blocks.
    pub fn request_resource(&self, priority: Priority, size: usize) -> NodeResult<AllocationId> {
        self.call(None, |reply| Command::Request {
            priority,
            size,
            deadline: None,
            reply,
        })
    }

    /// Requests `size` contiguous blocks, giving up at `deadline`.
    ///
    /// A request still queued when the deadline passes is refused with
    /// [`NodeError::DeadlineExceeded`] and leaves the pool untouched.
    pub fn request_resource_by(
        &self,
        priority: Priority,
        size: usize,
        deadline: Instant,
    ) -> NodeResult<AllocationId> {
        self.call(Some(deadline), |reply| Command::Request {
            priority,
            size,
            deadline: Some(deadline),
            reply,
        })
    }

    /// Releases an allocation.
    pub fn release_resource(&self, id: AllocationId) -> NodeResult<Allocation> {
        self.call(None, |reply| Command::Release { id, reply })
    }

    /// Forces a transition to `mode`.
    pub fn switch_mode(&self, mode: SidelinkMode) -> NodeResult<ModeTransition> {
        self.call(None, |reply| Command::SwitchMode {
            mode,
            deadline: None,
            reply,
        })
    }

    /// Forces a transition to `mode`, giving up at `deadline`.
    pub fn switch_mode_by(&self, mode: SidelinkMode, deadline: Instant) -> NodeResult<ModeTransition> {
        self.call(Some(deadline), |reply| Command::SwitchMode {
            mode,
            deadline: Some(deadline),
            reply,
        })
    }

    /// Publishes fresh radio measurements.
    pub fn update_link_metrics(&self, sample: LinkSample) -> NodeResult<()> {
        self.call(None, |reply| Command::UpdateMetrics { sample, reply })
    }

    /// Enables or disables a mode.
    pub fn enable_mode(&self, mode: SidelinkMode, enabled: bool) -> NodeResult<()> {
        self.roundtrip(None, |reply| Command::EnableMode {
            mode,
            enabled,
            reply,
        })
    }

    /// Current end-of-run scalars.
    pub fn summary(&self) -> NodeResult<NodeSummary> {
        self.roundtrip(None, |reply| Command::Summary { reply })
    }

    fn call<T>(
        &self,
        deadline: Option<Instant>,
        command: impl FnOnce(Sender<NodeResult<T>>) -> Command,
    ) -> NodeResult<T> {
        self.roundtrip(deadline, command)?
    }

    fn roundtrip<T>(
        &self,
        deadline: Option<Instant>,
        command: impl FnOnce(Sender<T>) -> Command,
    ) -> NodeResult<T> {
        let (reply, response) = crossbeam_channel::bounded(1);
        let command = command(reply);
        match deadline {
            Some(deadline) => self.tx.send_deadline(command, deadline).map_err(|err| match err {
                SendTimeoutError::Timeout(_) => NodeError::DeadlineExceeded,
                SendTimeoutError::Disconnected(_) => NodeError::ServiceStopped,
            })?,
            None => self.tx.send(command).map_err(|_| NodeError::ServiceStopped)?,
        }
        response.recv().map_err(|_| NodeError::ServiceStopped)
    }
}

/// Runs a [`SidelinkNode`] on its own thread.
///
/// The node clock is the wall time elapsed since the service started. Between
/// commands the service ticks the node every
/// [`tick_interval`](ServiceConfig::tick_interval).
pub struct SidelinkService {
    handle: ServiceHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl SidelinkService {
    /// Moves `node` onto a new thread.
    pub fn spawn(node: SidelinkNode, config: ServiceConfig) -> NodeResult<Self> {
        config.validate()?;
        let (tx, rx) = crossbeam_channel::bounded(config.mailbox_capacity);
        let tick_interval = config.tick_interval;

        let thread = thread::Builder::new()
            .name("sidelink-node".to_string())
            .spawn(move || run(node, rx, tick_interval))
            .map_err(NodeError::Spawn)?;

        Ok(Self {
            handle: ServiceHandle { tx },
            thread: Some(thread),
        })
    }

    /// A new client handle.
    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    /// Stops the service and returns the node's final summary.
    pub fn shutdown(mut self) -> NodeResult<NodeSummary> {
        let summary = self.handle.roundtrip(None, |reply| Command::Shutdown { reply });
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        summary
    }
}

impl Drop for SidelinkService {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let (reply, _response) = crossbeam_channel::bounded(1);
            let _ = self.handle.tx.send(Command::Shutdown { reply });
            let _ = thread.join();
        }
    }
}

fn run(mut node: SidelinkNode, rx: Receiver<Command>, tick_interval: Duration) {
    let start = Instant::now();
    let clock = || SimTime::from_duration(start.elapsed());
    log::info!("Node: service thread started");

    let mut shutdown_reply = None;
    loop {
        match rx.recv_timeout(tick_interval) {
            Ok(Command::Shutdown { reply }) => {
                shutdown_reply = Some(reply);
                break;
            }
            Ok(command) => dispatch(&mut node, command, clock()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        node.advance(clock());
    }

    let now = clock();
    node.advance(now);
    let summary = node.finish(now);
    if let Some(reply) = shutdown_reply {
        let _ = reply.send(summary);
    }
    log::info!("Node: service thread stopped");
}

fn dispatch(node: &mut SidelinkNode, command: Command, now: SimTime) {
    match command {
        Command::Request {
            priority,
            size,
            deadline,
            reply,
        } => {
            let result = if expired(deadline) {
                Err(NodeError::DeadlineExceeded)
            } else {
                node.request_resource(priority, size, now)
            };
            let _ = reply.send(result);
        }
        Command::Release { id, reply } => {
            let _ = reply.send(node.release_resource(id));
        }
        Command::SwitchMode {
            mode,
            deadline,
            reply,
        } => {
            let result = if expired(deadline) {
                Err(NodeError::DeadlineExceeded)
            } else {
                node.switch_mode(mode, now)
            };
            let _ = reply.send(result);
        }
        Command::UpdateMetrics { sample, reply } => {
            let _ = reply.send(node.update_link_metrics(sample));
        }
        Command::EnableMode {
            mode,
            enabled,
            reply,
        } => {
            node.enable_mode(mode, enabled);
            let _ = reply.send(());
        }
        Command::Summary { reply } => {
            let _ = reply.send(node.summary(now));
        }
        Command::Shutdown { .. } => {}
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() > deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;

    #[test]
    fn test_invalid_service_config_rejected() {
        let node = SidelinkNode::new(NodeConfig::default()).unwrap();
        let config = ServiceConfig {
            mailbox_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            SidelinkService::spawn(node, config),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn test_shutdown_returns_summary() {
        let node = SidelinkNode::new(NodeConfig::default()).unwrap();
        let service = SidelinkService::spawn(node, ServiceConfig::default()).unwrap();
        let handle = service.handle();
        handle.request_resource(1, 2).unwrap();

        let summary = service.shutdown().unwrap();
        assert_eq!(summary.pool.total_allocations, 1);
        assert!(matches!(handle.summary(), Err(NodeError::ServiceStopped)));
    }
}
