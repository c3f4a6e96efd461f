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

//! # Sidelink Pool
//!
//! Owns the subchannel×symbol grid and the table of active allocations.
//!
//! - [`ResourceGrid`]: block storage and the contiguous-run search.
//! - [`AllocationTable`]: which allocation owns which block.
//! - [`ResourcePool`]: the public allocator (configure, allocate, release,
//!   expiry sweep, statistics).
//! - [`SharedPool`]: a lock-guarded handle for concurrent callers.

#![warn(missing_docs)]

pub mod allocation;
pub mod config;
pub mod grid;
pub mod pool;
pub mod shared;

pub use allocation::{Allocation, AllocationTable};
pub use config::PoolConfig;
pub use grid::ResourceGrid;
pub use pool::{AllocationPlan, MaintenanceReport, PoolStats, ResourcePool, CLEANUP_INTERVAL};
pub use shared::SharedPool;
