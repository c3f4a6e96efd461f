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

//! Bounded, chronological storage for transitions and metric samples.

use serde::{Deserialize, Serialize};
use sidelink_core::{SidelinkMode, SimTime};

/// Number of transitions kept in a [`ModeHistory`].
pub const HISTORY_CAPACITY: usize = 100;

/// A fixed-size circular buffer. Once full, each push overwrites the oldest
/// entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    next: usize,
    len: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            next: 0,
            len: 0,
        }
    }

    /// Appends `value`, dropping the oldest entry when full.
    pub fn push(&mut self, value: T) {
        self.data[self.next] = value;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of entries.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = if self.len < N { 0 } else { self.next };
        (0..self.len).map(move |offset| &self.data[(start + offset) % N])
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&T> {
        (self.len > 0).then(|| &self.data[(self.next + N - 1) % N])
    }

    /// Copies the entries out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f64, N> {
    /// Arithmetic mean, `0.0` when empty.
    pub fn average(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.iter().sum::<f64>() / self.len as f64
    }

    /// Difference between the mean of the newer half and the mean of the
    /// older half. Positive when the series is rising.
    pub fn trend(&self) -> f64 {
        if self.len < 2 {
            return 0.0;
        }
        let half = self.len / 2;
        let older: f64 = self.iter().take(half).sum::<f64>() / half as f64;
        let newer: f64 = self.iter().skip(self.len - half).sum::<f64>() / half as f64;
        newer - older
    }
}

/// One committed mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeTransition {
    /// When the switch was committed.
    pub at: SimTime,
    /// Mode before the switch.
    pub from: SidelinkMode,
    /// Mode after the switch.
    pub to: SidelinkMode,
}

/// The last [`HISTORY_CAPACITY`] transitions.
pub type ModeHistory = RingBuffer<ModeTransition, HISTORY_CAPACITY>;
