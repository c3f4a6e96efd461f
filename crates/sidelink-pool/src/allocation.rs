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

//! Active allocations and block ownership.

use sidelink_core::{AllocationId, BlockId, Priority, SimTime};
use std::collections::BTreeMap;

/// A named group of blocks held by one requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    id: AllocationId,
    blocks: Vec<BlockId>,
    priority: Priority,
    allocated_at: SimTime,
}

impl Allocation {
    /// Identifier of the allocation.
    pub fn id(&self) -> AllocationId {
        self.id
    }

    /// Blocks held, in scan order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Number of blocks held.
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    /// Priority the allocation was made at.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Commit time.
    pub fn allocated_at(&self) -> SimTime {
        self.allocated_at
    }
}

/// The allocation map plus a per-block owner index.
///
/// The owner index is what makes the exclusivity invariant checkable in O(1)
/// per block: a block id maps to at most one holder.
#[derive(Debug, Clone, Default)]
pub struct AllocationTable {
    entries: BTreeMap<AllocationId, Allocation>,
    owners: Vec<Option<AllocationId>>,
}

impl AllocationTable {
    /// Creates an empty table for a grid of `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            owners: vec![None; capacity],
        }
    }

    /// Number of active allocations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The allocation currently owning `block`.
    pub fn holder_of(&self, block: BlockId) -> Option<AllocationId> {
        self.owners.get(block).copied().flatten()
    }

    /// Looks up an allocation.
    pub fn get(&self, id: AllocationId) -> Option<&Allocation> {
        self.entries.get(&id)
    }

    /// `true` if `id` is active.
    pub fn contains(&self, id: AllocationId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Active allocations in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.entries.values()
    }

    /// Total number of blocks held by all allocations.
    pub fn held_blocks(&self) -> usize {
        self.entries.values().map(Allocation::size).sum()
    }

    /// Records a new allocation. Callers guarantee the blocks are unowned.
    pub fn insert(
        &mut self,
        id: AllocationId,
        blocks: Vec<BlockId>,
        priority: Priority,
        allocated_at: SimTime,
    ) {
        for &block in &blocks {
            if let Some(owner) = self.owners.get_mut(block) {
                *owner = Some(id);
            }
        }
        self.entries.insert(
            id,
            Allocation {
                id,
                blocks,
                priority,
                allocated_at,
            },
        );
    }

    /// Removes an allocation and clears ownership of its blocks.
    pub fn remove(&mut self, id: AllocationId) -> Option<Allocation> {
        let allocation = self.entries.remove(&id)?;
        for &block in allocation.blocks() {
            if let Some(owner) = self.owners.get_mut(block) {
                if *owner == Some(id) {
                    *owner = None;
                }
            }
        }
        Some(allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove_track_owners() {
        let mut table = AllocationTable::new(6);
        let r1 = AllocationId::new(1);
        let r2 = AllocationId::new(2);
        table.insert(r1, vec![0, 1], 2, SimTime::ZERO);
        table.insert(r2, vec![3], 1, SimTime::from_millis(4));

        assert_eq!(table.len(), 2);
        assert_eq!(table.holder_of(1), Some(r1));
        assert_eq!(table.holder_of(2), None);
        assert_eq!(table.held_blocks(), 3);

        let removed = table.remove(r1).unwrap();
        assert_eq!(removed.blocks(), &[0, 1]);
        assert_eq!(table.holder_of(0), None);
        assert!(table.remove(r1).is_none());
    }

    #[test]
    fn test_iteration_is_ordered_by_id() {
        let mut table = AllocationTable::new(4);
        table.insert(AllocationId::new(9), vec![3], 0, SimTime::ZERO);
        table.insert(AllocationId::new(2), vec![0], 0, SimTime::ZERO);
        let ids: Vec<_> = table.iter().map(|a| a.id().get()).collect();
        assert_eq!(ids, vec![2, 9]);
    }
}
