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

//! Node-level errors.

use sidelink_core::{ConfigError, PoolError, TransitionError};
use sidelink_telemetry::MetricsError;
use std::path::PathBuf;
use thiserror::Error;

/// Anything a node operation can fail with.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid configuration or parameter.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The pool refused the request.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The controller refused the transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// Telemetry registration failed.
    #[error(transparent)]
    Telemetry(#[from] MetricsError),
    /// Sidelink is switched off in the node configuration.
    #[error("sidelink is disabled on this node")]
    SidelinkDisabled,
    /// Fewer than `size` blocks are free.
    #[error("resource not available for size {size}")]
    Unavailable {
        /// Requested number of blocks.
        size: usize,
    },
    /// The request's deadline passed before it reached the node.
    #[error("request deadline passed before it could run")]
    DeadlineExceeded,
    /// The service thread is gone.
    #[error("sidelink service has stopped")]
    ServiceStopped,
    /// The service thread could not be started.
    #[error("failed to spawn sidelink service thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A file could not be parsed.
    #[error("failed to parse {what}: {reason}")]
    Parse {
        /// What was being parsed.
        what: String,
        /// Parser message.
        reason: String,
    },
}

/// Convenience alias for node results.
pub type NodeResult<T> = Result<T, NodeError>;
