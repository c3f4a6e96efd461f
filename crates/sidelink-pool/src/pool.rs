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

//! The resource pool allocator.

use crate::allocation::{Allocation, AllocationTable};
use crate::config::PoolConfig;
use crate::grid::ResourceGrid;
use serde::{Deserialize, Serialize};
use sidelink_core::{
    AllocationId, BlockId, ConfigError, EventKind, EventSink, LogSink, PoolError, PoolResult,
    Priority, SidelinkEvent, SimTime,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Minimum spacing between two expiry sweeps run by [`ResourcePool::maintain`].
pub const CLEANUP_INTERVAL: Duration = Duration::from_millis(100);

/// A candidate run of blocks found by [`ResourcePool::plan`].
///
/// A plan carries the grid generation it was computed against; committing it
/// after a reconfiguration fails with [`PoolError::StalePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    blocks: Vec<BlockId>,
    generation: u64,
}

impl AllocationPlan {
    /// Candidate blocks, in scan order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Number of blocks requested.
    pub fn size(&self) -> usize {
        self.blocks.len()
    }
}

/// Outcome of one [`ResourcePool::maintain`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaintenanceReport {
    /// Whether the expiry sweep ran on this call.
    pub swept: bool,
    /// Allocations removed by the sweep, in ascending id order.
    pub expired: Vec<AllocationId>,
    /// Utilization after maintenance.
    pub utilization: f64,
}

/// Lifetime counters of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Successful allocations.
    pub total_allocations: u64,
    /// Allocations that failed for lack of space or on a conflict.
    pub failed_allocations: u64,
    /// Explicit releases.
    pub released: u64,
    /// Allocations removed by the expiry sweep.
    pub expired: u64,
    /// Number of blocks in the grid.
    pub capacity: usize,
}

/// Owns a [`ResourceGrid`] and the [`AllocationTable`] layered on top of it.
///
/// All timing is explicit: every time-dependent call takes the current
/// simulation time as `now`.
pub struct ResourcePool {
    grid: ResourceGrid,
    table: AllocationTable,
    periodicity: Duration,
    generation: u64,
    next_id: u64,
    last_cleanup: SimTime,
    clock: SimTime,
    stats: PoolStats,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("dimensions", &self.grid.dimensions())
            .field("active", &self.table.len())
            .field("utilization", &self.utilization())
            .field("periodicity", &self.periodicity)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ResourcePool {
    /// Creates a pool that reports events through the `log` facade.
    pub fn new(config: &PoolConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, Arc::new(LogSink))
    }

    /// Creates a pool that reports events to `sink`.
    pub fn with_sink(config: &PoolConfig, sink: Arc<dyn EventSink>) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = ResourceGrid::new(config.num_subchannels, config.num_symbols)?;
        let capacity = grid.capacity();
        log::info!(
            "Pool: created {}x{} grid ({} blocks), periodicity {:?}",
            config.num_subchannels,
            config.num_symbols,
            capacity,
            config.periodicity()
        );
        Ok(Self {
            table: AllocationTable::new(capacity),
            grid,
            periodicity: config.periodicity(),
            generation: 0,
            next_id: 1,
            last_cleanup: SimTime::ZERO,
            clock: SimTime::ZERO,
            stats: PoolStats {
                capacity,
                ..Default::default()
            },
            sink,
        })
    }

    /// Rebuilds the grid with new dimensions, dropping every allocation.
    ///
    /// On error the previous grid and allocations are untouched. Allocation
    /// ids keep counting up across reconfigurations.
    pub fn configure(&mut self, num_subchannels: usize, num_symbols: usize) -> Result<(), ConfigError> {
        let grid = ResourceGrid::new(num_subchannels, num_symbols).inspect_err(|err| {
            self.emit(EventKind::ValidationError, self.clock, err.to_string());
        })?;

        let dropped = self.table.len();
        self.table = AllocationTable::new(grid.capacity());
        self.stats.capacity = grid.capacity();
        self.grid = grid;
        self.generation += 1;

        log::info!(
            "Pool: reconfigured to {}x{} ({} allocations dropped)",
            num_subchannels,
            num_symbols,
            dropped
        );
        self.emit(
            EventKind::PoolConfigured,
            self.clock,
            format!("{num_subchannels}x{num_symbols}"),
        );
        Ok(())
    }

    /// Sets the expiry window. A zero duration is refused.
    pub fn set_periodicity(&mut self, periodicity: Duration) -> Result<(), ConfigError> {
        if periodicity.is_zero() {
            let err = ConfigError::InvalidPeriodicity(periodicity);
            self.emit(EventKind::ValidationError, self.clock, err.to_string());
            return Err(err);
        }
        self.periodicity = periodicity;
        log::debug!("Pool: periodicity set to {:?}", periodicity);
        Ok(())
    }

    /// Current expiry window.
    pub fn periodicity(&self) -> Duration {
        self.periodicity
    }

    /// Housekeeping pass. Expires old allocations at most once per
    /// [`CLEANUP_INTERVAL`]; calling it again at the same `now` is a no-op.
    pub fn maintain(&mut self, now: SimTime) -> MaintenanceReport {
        self.observe(now);
        let mut report = MaintenanceReport::default();

        if now.saturating_since(self.last_cleanup) >= CLEANUP_INTERVAL {
            report.expired = self.expire(now);
            report.swept = true;
            self.last_cleanup = now;
        }

        report.utilization = self.utilization();
        report
    }

    /// Unthrottled expiry sweep.
    ///
    /// Visits active allocations in ascending id order and removes every one
    /// whose first block is at least one periodicity old.
    pub fn expire(&mut self, now: SimTime) -> Vec<AllocationId> {
        self.observe(now);
        let periodicity = self.periodicity;
        let due: Vec<AllocationId> = self
            .table
            .iter()
            .filter(|allocation| {
                allocation
                    .blocks()
                    .first()
                    .and_then(|&block| self.grid.block(block))
                    .and_then(|block| block.alloc_time())
                    .is_some_and(|at| now.saturating_since(at) >= periodicity)
            })
            .map(Allocation::id)
            .collect();

        for &id in &due {
            if let Some(allocation) = self.remove(id) {
                self.stats.expired += 1;
                log::debug!("Pool: {} expired after {:?}", id, periodicity);
                self.emit(
                    EventKind::AllocationExpired,
                    now,
                    format!("{} ({} blocks)", id, allocation.size()),
                );
            }
        }
        due
    }

    /// Searches for the first run of `size` contiguous free blocks without
    /// changing anything.
    pub fn plan(&self, size: usize) -> PoolResult<AllocationPlan> {
        if size == 0 || size > self.grid.capacity() {
            return Err(PoolError::InvalidRequest {
                priority: 0,
                size,
                capacity: self.grid.capacity(),
            });
        }
        self.grid
            .find_contiguous(size)
            .map(|run| AllocationPlan {
                blocks: run.collect(),
                generation: self.generation,
            })
            .ok_or(PoolError::InsufficientResources {
                requested: size,
                available: self.grid.free_count(),
            })
    }

    /// Compare-and-commit: re-checks every planned block against the active
    /// allocations and takes them only if none is held.
    pub fn commit(
        &mut self,
        plan: AllocationPlan,
        priority: Priority,
        now: SimTime,
    ) -> PoolResult<AllocationId> {
        self.observe(now);
        if plan.generation != self.generation {
            return Err(self.reject(PoolError::StalePlan, priority, plan.size(), now));
        }

        for &block in &plan.blocks {
            let Some(cell) = self.grid.block(block) else {
                return Err(self.reject(PoolError::StalePlan, priority, plan.size(), now));
            };
            if let Some(holder) = self.table.holder_of(block) {
                let err = PoolError::Conflict {
                    position: cell.position(),
                    holder,
                };
                return Err(self.reject(err, priority, plan.size(), now));
            }
        }

        let id = AllocationId::new(self.next_id);
        self.next_id += 1;
        self.grid.occupy(&plan.blocks, priority, now);
        let size = plan.size();
        let first = plan.blocks.first().copied().unwrap_or_default();
        self.table.insert(id, plan.blocks, priority, now);
        self.stats.total_allocations += 1;

        log::debug!(
            "Pool: {} committed {} blocks from #{} at priority {}",
            id,
            size,
            first,
            priority
        );
        self.emit(
            EventKind::AllocationCommitted,
            now,
            format!("{id}: {size} blocks from #{first}, priority {priority}"),
        );
        Ok(id)
    }

    /// Plans and commits in one step.
    pub fn allocate(&mut self, priority: Priority, size: usize, now: SimTime) -> PoolResult<AllocationId> {
        self.observe(now);
        match self.plan(size) {
            Ok(plan) => self.commit(plan, priority, now),
            Err(PoolError::InvalidRequest { size, capacity, .. }) => {
                let err = PoolError::InvalidRequest {
                    priority,
                    size,
                    capacity,
                };
                Err(self.reject(err, priority, size, now))
            }
            Err(err) => Err(self.reject(err, priority, size, now)),
        }
    }

    /// Frees every block of an allocation.
    pub fn release(&mut self, id: AllocationId) -> PoolResult<Allocation> {
        let Some(allocation) = self.remove(id) else {
            log::warn!("Pool: release of unknown allocation {}", id);
            return Err(PoolError::UnknownAllocation(id));
        };
        self.stats.released += 1;
        log::debug!("Pool: {} released ({} blocks)", id, allocation.size());
        self.emit(
            EventKind::AllocationReleased,
            self.clock,
            format!("{} ({} blocks)", id, allocation.size()),
        );
        Ok(allocation)
    }

    /// Count-based capacity hint. Does not look at contiguity.
    pub fn check_availability(&self, size: usize) -> bool {
        size > 0 && size <= self.grid.capacity() && size <= self.grid.free_count()
    }

    /// Occupied share of the grid.
    pub fn utilization(&self) -> f64 {
        self.grid.utilization()
    }

    /// Number of free blocks.
    pub fn available_block_count(&self) -> usize {
        self.grid.free_count()
    }

    /// Ids of all occupied blocks.
    pub fn occupied_resource_ids(&self) -> BTreeSet<BlockId> {
        self.grid
            .blocks()
            .iter()
            .filter(|block| block.is_occupied())
            .map(|block| block.id())
            .collect()
    }

    /// Ids of the active allocations, ascending.
    pub fn active_allocation_ids(&self) -> Vec<AllocationId> {
        self.table.iter().map(Allocation::id).collect()
    }

    /// Number of active allocations.
    pub fn active_allocation_count(&self) -> usize {
        self.table.len()
    }

    /// Looks up an active allocation.
    pub fn allocation(&self, id: AllocationId) -> Option<&Allocation> {
        self.table.get(id)
    }

    /// Blocks held by an active allocation.
    pub fn allocation_blocks(&self, id: AllocationId) -> Option<&[BlockId]> {
        self.table.get(id).map(Allocation::blocks)
    }

    /// Lifetime counters.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Number of blocks in the grid.
    pub fn capacity(&self) -> usize {
        self.grid.capacity()
    }

    /// `(num_subchannels, num_symbols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    /// Read-only view of the grid.
    pub fn grid(&self) -> &ResourceGrid {
        &self.grid
    }

    /// Latest simulation time the pool has seen.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Records a failed request: bumps the failure counter where it applies
    /// and emits an `AllocationFailed` event.
    pub(crate) fn reject(
        &mut self,
        err: PoolError,
        priority: Priority,
        size: usize,
        now: SimTime,
    ) -> PoolError {
        if matches!(
            err,
            PoolError::InsufficientResources { .. } | PoolError::Conflict { .. }
        ) {
            self.stats.failed_allocations += 1;
        }
        log::debug!(
            "Pool: request (priority {}, size {}) refused: {}",
            priority,
            size,
            err
        );
        self.emit(
            EventKind::AllocationFailed,
            now,
            format!("priority {priority}, size {size}: {err}"),
        );
        err
    }

    fn remove(&mut self, id: AllocationId) -> Option<Allocation> {
        let allocation = self.table.remove(id)?;
        self.grid.vacate(allocation.blocks());
        Some(allocation)
    }

    fn observe(&mut self, now: SimTime) {
        self.clock = self.clock.max(now);
    }

    fn emit(&self, kind: EventKind, at: SimTime, detail: String) {
        self.sink.emit(SidelinkEvent::new(kind, at, detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sidelink_core::{BlockPosition, MemorySink};

    fn pool(ns: usize, nsym: usize) -> (ResourcePool, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let pool = ResourcePool::with_sink(&PoolConfig::new(ns, nsym), sink.clone()).unwrap();
        (pool, sink)
    }

    // ── Allocation ──

    #[test]
    fn test_four_by_two_scenario() {
        let (mut pool, _) = pool(4, 2);

        let r1 = pool.allocate(1, 3, SimTime::ZERO).unwrap();
        assert_eq!(r1, AllocationId::new(1));
        assert_eq!(pool.allocation_blocks(r1).unwrap(), &[0, 1, 2]);
        assert_eq!(pool.available_block_count(), 5);
        assert!(!pool.check_availability(6));
        assert!(pool.check_availability(5));

        pool.release(r1).unwrap();
        assert_eq!(pool.available_block_count(), 8);
        assert_relative_eq!(pool.utilization(), 0.0);
    }

    #[test]
    fn test_invalid_requests_do_not_count_as_failures() {
        let (mut pool, sink) = pool(2, 2);
        assert!(matches!(
            pool.allocate(3, 0, SimTime::ZERO),
            Err(PoolError::InvalidRequest { priority: 3, size: 0, capacity: 4 })
        ));
        assert!(matches!(
            pool.allocate(3, 5, SimTime::ZERO),
            Err(PoolError::InvalidRequest { .. })
        ));
        assert_eq!(pool.stats().failed_allocations, 0);
        assert_eq!(sink.count(EventKind::AllocationFailed), 2);
        assert!(!pool.check_availability(0));
    }

    #[test]
    fn test_insufficient_contiguous_run_is_a_failure() {
        let (mut pool, _) = pool(2, 2);
        let a = pool.allocate(0, 1, SimTime::ZERO).unwrap();
        pool.allocate(0, 1, SimTime::ZERO).unwrap();
        pool.allocate(0, 1, SimTime::ZERO).unwrap();
        pool.release(a).unwrap();
        // Layout: _ X X _ : two free blocks but no run of two.
        assert!(pool.check_availability(2));
        assert!(matches!(
            pool.allocate(0, 2, SimTime::ZERO),
            Err(PoolError::InsufficientResources { requested: 2, available: 2 })
        ));
        assert_eq!(pool.stats().failed_allocations, 1);
    }

    #[test]
    fn test_ids_are_never_reused_across_configure() {
        let (mut pool, sink) = pool(2, 2);
        let first = pool.allocate(0, 2, SimTime::ZERO).unwrap();
        pool.configure(3, 3).unwrap();
        assert!(pool.active_allocation_ids().is_empty());
        assert_eq!(pool.capacity(), 9);
        let second = pool.allocate(0, 2, SimTime::ZERO).unwrap();
        assert!(second > first);
        assert_eq!(sink.count(EventKind::PoolConfigured), 1);
    }

    #[test]
    fn test_failed_configure_keeps_grid() {
        let (mut pool, _) = pool(2, 2);
        let id = pool.allocate(0, 1, SimTime::ZERO).unwrap();
        assert!(pool.configure(0, 5).is_err());
        assert_eq!(pool.dimensions(), (2, 2));
        assert!(pool.allocation(id).is_some());
    }

    #[test]
    fn test_release_unknown_id() {
        let (mut pool, _) = pool(2, 2);
        let err = pool.release(AllocationId::new(42)).unwrap_err();
        assert_eq!(err, PoolError::UnknownAllocation(AllocationId::new(42)));
        assert_eq!(pool.stats().released, 0);
    }

    // ── Compare-and-commit ──

    #[test]
    fn test_second_commit_of_same_plan_conflicts() {
        let (mut pool, _) = pool(2, 2);
        let plan_a = pool.plan(2).unwrap();
        let plan_b = pool.plan(2).unwrap();
        assert_eq!(plan_a.blocks(), plan_b.blocks());

        let winner = pool.commit(plan_a, 1, SimTime::ZERO).unwrap();
        let err = pool.commit(plan_b, 1, SimTime::ZERO).unwrap_err();
        assert_eq!(
            err,
            PoolError::Conflict {
                position: BlockPosition::new(0, 0),
                holder: winner,
            }
        );
        assert_eq!(pool.stats().failed_allocations, 1);
        assert_eq!(pool.available_block_count(), 2);
    }

    #[test]
    fn test_plan_is_stale_after_configure() {
        let (mut pool, _) = pool(2, 2);
        let plan = pool.plan(1).unwrap();
        pool.configure(2, 2).unwrap();
        assert_eq!(pool.commit(plan, 0, SimTime::ZERO), Err(PoolError::StalePlan));
        assert_eq!(pool.available_block_count(), 4);
    }

    // ── Maintenance and expiry ──

    #[test]
    fn test_periodicity_zero_rejected() {
        let (mut pool, sink) = pool(2, 2);
        assert!(pool.set_periodicity(Duration::ZERO).is_err());
        assert_eq!(pool.periodicity(), Duration::from_millis(100));
        assert_eq!(sink.count(EventKind::ValidationError), 1);
    }

    #[test]
    fn test_maintain_sweeps_at_most_once_per_interval() {
        let (mut pool, _) = pool(2, 2);
        pool.set_periodicity(Duration::from_millis(50)).unwrap();
        let id = pool.allocate(0, 2, SimTime::ZERO).unwrap();

        let early = pool.maintain(SimTime::from_millis(60));
        assert!(!early.swept);
        assert!(pool.allocation(id).is_some());

        let report = pool.maintain(SimTime::from_millis(100));
        assert!(report.swept);
        assert_eq!(report.expired, vec![id]);
        assert_relative_eq!(report.utilization, 0.0);

        let again = pool.maintain(SimTime::from_millis(100));
        assert!(!again.swept);
        assert!(again.expired.is_empty());
        assert_eq!(pool.stats().expired, 1);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let (mut pool, sink) = pool(3, 1);
        let old = pool.allocate(0, 1, SimTime::from_millis(0)).unwrap();
        let young = pool.allocate(0, 1, SimTime::from_millis(1)).unwrap();

        let expired = pool.expire(SimTime::from_millis(100));
        assert_eq!(expired, vec![old]);
        assert!(pool.allocation(young).is_some());
        assert_eq!(sink.count(EventKind::AllocationExpired), 1);
        assert_eq!(sink.count(EventKind::AllocationReleased), 0);
    }
}
