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

//! Resource blocks and allocation identifiers.

use crate::time::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a block in the pool's scan order (subchannel-major, symbol-minor).
pub type BlockId = usize;

/// Priority attached to an allocation. Larger values are more important.
pub type Priority = u32;

/// Identifier of an active allocation, unique for the lifetime of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationId(u64);

impl AllocationId {
    /// Wraps a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A cell of the time/frequency grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPosition {
    /// Frequency-domain index.
    pub subchannel: usize,
    /// Time-domain index within the slot.
    pub symbol: usize,
}

impl BlockPosition {
    /// Creates a new position.
    pub const fn new(subchannel: usize, symbol: usize) -> Self {
        Self { subchannel, symbol }
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.subchannel, self.symbol)
    }
}

/// One atomic allocatable unit of the sidelink resource pool.
///
/// Identity and position are fixed at creation; only the occupancy state
/// (`occupied`, `priority`, `alloc_time`) ever changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    id: BlockId,
    position: BlockPosition,
    occupied: bool,
    priority: Priority,
    alloc_time: SimTime,
}

impl ResourceBlock {
    /// Creates a free block at the given position.
    pub fn new(id: BlockId, position: BlockPosition) -> Self {
        Self {
            id,
            position,
            occupied: false,
            priority: 0,
            alloc_time: SimTime::ZERO,
        }
    }

    /// Returns the block identifier.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the grid position of the block.
    pub fn position(&self) -> BlockPosition {
        self.position
    }

    /// Returns `true` if the block is held by an allocation.
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Priority of the holding allocation, if occupied.
    pub fn priority(&self) -> Option<Priority> {
        self.occupied.then_some(self.priority)
    }

    /// Time at which the block was allocated, if occupied.
    pub fn alloc_time(&self) -> Option<SimTime> {
        self.occupied.then_some(self.alloc_time)
    }

    /// Marks the block as held at `priority` since `at`.
    pub fn occupy(&mut self, priority: Priority, at: SimTime) {
        self.occupied = true;
        self.priority = priority;
        self.alloc_time = at;
    }

    /// Returns the block to the free state.
    pub fn vacate(&mut self) {
        self.occupied = false;
        self.priority = 0;
        self.alloc_time = SimTime::ZERO;
    }

    /// Two blocks conflict when they describe the same grid cell.
    pub fn conflicts_with(&self, other: &ResourceBlock) -> bool {
        self.position == other.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_fields_hidden_while_free() {
        let mut block = ResourceBlock::new(3, BlockPosition::new(1, 1));
        assert_eq!(block.priority(), None);
        assert_eq!(block.alloc_time(), None);

        block.occupy(5, SimTime::from_millis(20));
        assert!(block.is_occupied());
        assert_eq!(block.priority(), Some(5));
        assert_eq!(block.alloc_time(), Some(SimTime::from_millis(20)));

        block.vacate();
        assert!(!block.is_occupied());
        assert_eq!(block.priority(), None);
        assert_eq!(block.position(), BlockPosition::new(1, 1));
    }

    #[test]
    fn test_conflict_is_positional() {
        let a = ResourceBlock::new(0, BlockPosition::new(2, 0));
        let mut b = ResourceBlock::new(7, BlockPosition::new(2, 0));
        let c = ResourceBlock::new(1, BlockPosition::new(2, 1));
        b.occupy(1, SimTime::from_millis(5));
        assert!(a.conflicts_with(&b));
        assert!(!a.conflicts_with(&c));
    }

    #[test]
    fn test_allocation_id_display() {
        assert_eq!(AllocationId::new(12).to_string(), "R12");
    }
}
