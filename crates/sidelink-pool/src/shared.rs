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

//! Lock-guarded pool handle for concurrent callers.

use crate::allocation::Allocation;
use crate::pool::{MaintenanceReport, PoolStats, ResourcePool};
use sidelink_core::{AllocationId, PoolError, PoolResult, Priority, SimTime};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_micros(50);

/// A cloneable handle to a [`ResourcePool`].
///
/// Searches run under the read lock so several callers can plan at once.
/// Commits take the write lock and re-check every block, so two callers that
/// planned the same run cannot both win it.
#[derive(Debug, Clone)]
pub struct SharedPool {
    inner: Arc<RwLock<ResourcePool>>,
}

impl SharedPool {
    /// Wraps a pool.
    pub fn new(pool: ResourcePool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(pool)),
        }
    }

    /// Plans under the read lock, then commits under the write lock.
    pub fn allocate(&self, priority: Priority, size: usize, now: SimTime) -> PoolResult<AllocationId> {
        let planned = self.read()?.plan(size);
        let mut pool = self.write()?;
        match planned {
            Ok(plan) => pool.commit(plan, priority, now),
            Err(err) => {
                let err = match err {
                    PoolError::InvalidRequest { size, capacity, .. } => PoolError::InvalidRequest {
                        priority,
                        size,
                        capacity,
                    },
                    other => other,
                };
                Err(pool.reject(err, priority, size, now))
            }
        }
    }

    /// Like [`SharedPool::allocate`] but gives up once `deadline` passes.
    ///
    /// Returns [`PoolError::DeadlineExceeded`] with the pool untouched if the
    /// write lock could not be taken in time.
    pub fn allocate_with_deadline(
        &self,
        priority: Priority,
        size: usize,
        now: SimTime,
        deadline: Instant,
    ) -> PoolResult<AllocationId> {
        let mut pool = loop {
            match self.inner.try_write() {
                Ok(guard) => break guard,
                Err(TryLockError::Poisoned(_)) => return Err(PoolError::LockPoisoned),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        log::debug!("Pool: allocation (priority {priority}, size {size}) timed out");
                        return Err(PoolError::DeadlineExceeded);
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
            }
        };
        if Instant::now() > deadline {
            return Err(PoolError::DeadlineExceeded);
        }
        pool.allocate(priority, size, now)
    }

    /// See [`ResourcePool::release`].
    pub fn release(&self, id: AllocationId) -> PoolResult<Allocation> {
        self.write()?.release(id)
    }

    /// See [`ResourcePool::maintain`].
    pub fn maintain(&self, now: SimTime) -> PoolResult<MaintenanceReport> {
        Ok(self.write()?.maintain(now))
    }

    /// See [`ResourcePool::check_availability`].
    pub fn check_availability(&self, size: usize) -> PoolResult<bool> {
        Ok(self.read()?.check_availability(size))
    }

    /// See [`ResourcePool::utilization`].
    pub fn utilization(&self) -> PoolResult<f64> {
        Ok(self.read()?.utilization())
    }

    /// See [`ResourcePool::stats`].
    pub fn stats(&self) -> PoolResult<PoolStats> {
        Ok(self.read()?.stats())
    }

    /// Runs `f` with shared access to the pool.
    pub fn with_pool<R>(&self, f: impl FnOnce(&ResourcePool) -> R) -> PoolResult<R> {
        Ok(f(&*self.read()?))
    }

    fn read(&self) -> PoolResult<RwLockReadGuard<'_, ResourcePool>> {
        self.inner.read().map_err(|_| PoolError::LockPoisoned)
    }

    fn write(&self) -> PoolResult<RwLockWriteGuard<'_, ResourcePool>> {
        self.inner.write().map_err(|_| PoolError::LockPoisoned)
    }
}
