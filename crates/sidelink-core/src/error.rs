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

//! Error taxonomy shared by the pool, the controller and the driver.
//!
//! Every variant here is local and recoverable: a failed call leaves the
//! instance in its previous valid state.

use crate::mode::SidelinkMode;
use crate::resource::{AllocationId, BlockPosition, Priority};
use std::time::Duration;
use thiserror::Error;

/// A configuration value was rejected. The previous configuration is kept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A pool dimension was zero or the grid would not fit in memory.
    #[error("invalid pool dimensions {num_subchannels}x{num_symbols}")]
    InvalidPoolDimensions {
        /// Requested number of subchannels.
        num_subchannels: usize,
        /// Requested number of symbols.
        num_symbols: usize,
    },
    /// The allocation periodicity must be strictly positive.
    #[error("invalid periodicity {0:?}: must be greater than zero")]
    InvalidPeriodicity(Duration),
    /// The RSRP threshold lies outside [-140, -70] dBm.
    #[error("invalid RSRP threshold {0} dBm (valid range: -140..=-70)")]
    RsrpThresholdOutOfRange(f64),
    /// The hysteresis margin lies outside [0, 10] dB.
    #[error("invalid hysteresis {0} dB (valid range: 0..=10)")]
    HysteresisOutOfRange(f64),
    /// The controller cannot start in a disabled mode.
    #[error("initial mode {0} is not enabled")]
    InitialModeDisabled(SidelinkMode),
    /// A metric sample lies outside its domain.
    #[error("metric '{name}' has out-of-range value {value}")]
    MetricOutOfRange {
        /// Metric name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A host-level parameter was rejected.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// An allocation request or release could not be served.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    /// The request is malformed (zero size or larger than the pool).
    #[error("invalid request: priority={priority}, size={size}, capacity={capacity}")]
    InvalidRequest {
        /// Requested priority.
        priority: Priority,
        /// Requested number of blocks.
        size: usize,
        /// Total number of blocks in the pool.
        capacity: usize,
    },
    /// No run of `requested` contiguous free blocks exists.
    #[error("insufficient resources: no run of {requested} contiguous free blocks ({available} free)")]
    InsufficientResources {
        /// Requested number of blocks.
        requested: usize,
        /// Free blocks at the time of the search.
        available: usize,
    },
    /// A candidate block is already held by an active allocation.
    #[error("conflict at block {position} held by {holder}")]
    Conflict {
        /// Contested grid cell.
        position: BlockPosition,
        /// Allocation that owns the cell.
        holder: AllocationId,
    },
    /// The plan was computed against a grid that has since been rebuilt.
    #[error("allocation plan is stale: the pool was reconfigured")]
    StalePlan,
    /// No active allocation has this identifier.
    #[error("unknown allocation {0}")]
    UnknownAllocation(AllocationId),
    /// The deadline passed before the request could run. Nothing was changed.
    #[error("deadline exceeded before the request could run")]
    DeadlineExceeded,
    /// The lock guarding a shared pool was poisoned by a panicking holder.
    #[error("pool lock poisoned")]
    LockPoisoned,
}

/// Convenience alias for pool results.
pub type PoolResult<T> = Result<T, PoolError>;

/// A mode transition was refused. The current mode is unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    /// The minimum switch interval has not elapsed since the last switch.
    #[error("switch cooldown active for another {remaining:?}")]
    CoolingDown {
        /// Time left before a switch is allowed.
        remaining: Duration,
    },
    /// The target mode is disabled.
    #[error("target mode {0} is not enabled")]
    ModeDisabled(SidelinkMode),
    /// The controller is already operating in the requested mode. A mode has
    /// no edge to itself in the transition graph.
    #[error("already operating in {0}")]
    AlreadyActive(SidelinkMode),
    /// The target mode's entry requirement is not met by the current metrics.
    #[error("transition requirements not met for {mode}: {reason}")]
    RequirementsNotMet {
        /// Requested mode.
        mode: SidelinkMode,
        /// Which requirement failed.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = PoolError::Conflict {
            position: BlockPosition::new(1, 0),
            holder: AllocationId::new(4),
        };
        assert_eq!(err.to_string(), "conflict at block (1, 0) held by R4");

        let err = TransitionError::RequirementsNotMet {
            mode: SidelinkMode::SemiPersistent,
            reason: "resource utilization too high",
        };
        assert_eq!(
            err.to_string(),
            "transition requirements not met for semi_persistent: resource utilization too high"
        );
    }
}
