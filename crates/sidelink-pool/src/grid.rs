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

//! The subchannel×symbol block grid.

use sidelink_core::{BlockId, BlockPosition, ConfigError, Priority, ResourceBlock, SimTime};
use std::ops::Range;

/// Dense storage for every block of the pool, in scan order.
///
/// Block `id` sits at position `(id / num_symbols, id % num_symbols)`, so the
/// scan order is subchannel-major, symbol-minor.
#[derive(Debug, Clone)]
pub struct ResourceGrid {
    num_subchannels: usize,
    num_symbols: usize,
    blocks: Vec<ResourceBlock>,
    occupied: usize,
}

impl ResourceGrid {
    /// Builds a grid of free blocks.
    pub fn new(num_subchannels: usize, num_symbols: usize) -> Result<Self, ConfigError> {
        let capacity = num_subchannels
            .checked_mul(num_symbols)
            .filter(|total| *total > 0)
            .ok_or(ConfigError::InvalidPoolDimensions {
                num_subchannels,
                num_symbols,
            })?;

        let mut blocks = Vec::with_capacity(capacity);
        for subchannel in 0..num_subchannels {
            for symbol in 0..num_symbols {
                let id = blocks.len();
                blocks.push(ResourceBlock::new(
                    id,
                    BlockPosition::new(subchannel, symbol),
                ));
            }
        }

        Ok(Self {
            num_subchannels,
            num_symbols,
            blocks,
            occupied: 0,
        })
    }

    /// Returns `(num_subchannels, num_symbols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.num_subchannels, self.num_symbols)
    }

    /// Total number of blocks.
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Number of occupied blocks.
    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Number of free blocks.
    pub fn free_count(&self) -> usize {
        self.blocks.len() - self.occupied
    }

    /// Occupied share of the grid, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        if self.blocks.is_empty() {
            0.0
        } else {
            self.occupied as f64 / self.blocks.len() as f64
        }
    }

    /// All blocks in scan order.
    pub fn blocks(&self) -> &[ResourceBlock] {
        &self.blocks
    }

    /// Returns the block with the given id.
    pub fn block(&self, id: BlockId) -> Option<&ResourceBlock> {
        self.blocks.get(id)
    }

    /// Returns the id of the block at `position`.
    pub fn id_at(&self, position: BlockPosition) -> Option<BlockId> {
        (position.subchannel < self.num_subchannels && position.symbol < self.num_symbols)
            .then(|| position.subchannel * self.num_symbols + position.symbol)
    }

    /// Finds the first run of `size` free blocks in scan order.
    ///
    /// A run resets whenever an occupied block is met.
    pub fn find_contiguous(&self, size: usize) -> Option<Range<BlockId>> {
        if size == 0 || size > self.free_count() {
            return None;
        }

        let mut run_start = 0;
        let mut run_len = 0;
        for block in &self.blocks {
            if block.is_occupied() {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = block.id();
            }
            run_len += 1;
            if run_len == size {
                return Some(run_start..run_start + size);
            }
        }
        None
    }

    /// Marks the given blocks as held.
    ///
    /// Blocks that are already occupied keep their state; callers check for
    /// conflicts before calling this.
    pub fn occupy(&mut self, ids: &[BlockId], priority: Priority, at: SimTime) {
        for &id in ids {
            if let Some(block) = self.blocks.get_mut(id) {
                if !block.is_occupied() {
                    block.occupy(priority, at);
                    self.occupied += 1;
                }
            }
        }
    }

    /// Returns the given blocks to the free state.
    pub fn vacate(&mut self, ids: &[BlockId]) {
        for &id in ids {
            if let Some(block) = self.blocks.get_mut(id) {
                if block.is_occupied() {
                    block.vacate();
                    self.occupied -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout_is_subchannel_major() {
        let grid = ResourceGrid::new(4, 2).unwrap();
        assert_eq!(grid.capacity(), 8);
        assert_eq!(grid.block(0).unwrap().position(), BlockPosition::new(0, 0));
        assert_eq!(grid.block(1).unwrap().position(), BlockPosition::new(0, 1));
        assert_eq!(grid.block(2).unwrap().position(), BlockPosition::new(1, 0));
        assert_eq!(grid.block(7).unwrap().position(), BlockPosition::new(3, 1));
        assert_eq!(grid.id_at(BlockPosition::new(3, 1)), Some(7));
        assert_eq!(grid.id_at(BlockPosition::new(4, 0)), None);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(ResourceGrid::new(0, 4).is_err());
        assert!(ResourceGrid::new(4, 0).is_err());
    }

    #[test]
    fn test_find_contiguous_resets_on_occupied_block() {
        let mut grid = ResourceGrid::new(3, 2).unwrap();
        // Free layout: _ X _ _ X _
        grid.occupy(&[1, 4], 1, SimTime::ZERO);

        assert_eq!(grid.find_contiguous(1), Some(0..1));
        assert_eq!(grid.find_contiguous(2), Some(2..4));
        assert_eq!(grid.find_contiguous(3), None);
        assert_eq!(grid.free_count(), 4);
    }

    #[test]
    fn test_occupy_and_vacate_keep_count_consistent() {
        let mut grid = ResourceGrid::new(2, 2).unwrap();
        grid.occupy(&[0, 1], 3, SimTime::from_millis(5));
        grid.occupy(&[1], 3, SimTime::from_millis(6));
        assert_eq!(grid.occupied_count(), 2);
        assert_eq!(grid.utilization(), 0.5);

        grid.vacate(&[0, 1, 1]);
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.utilization(), 0.0);
    }
}
