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

//! Sidelink operating modes and per-mode lookup tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// The four mutually exclusive resource scheduling policies.
///
/// The variant order is fixed and doubles as the index into [`ModeTable`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum SidelinkMode {
    /// The network schedules sidelink resources (mode 1).
    NetworkScheduled,
    /// Devices pick resources autonomously (mode 2). Always-available fallback.
    #[default]
    Autonomous,
    /// Semi-persistent scheduling (mode 3).
    SemiPersistent,
    /// Sensing-based semi-persistent scheduling (mode 4).
    SensingSemiPersistent,
}

impl SidelinkMode {
    /// Number of modes.
    pub const COUNT: usize = 4;

    /// All modes in index order.
    pub const ALL: [SidelinkMode; Self::COUNT] = [
        SidelinkMode::NetworkScheduled,
        SidelinkMode::Autonomous,
        SidelinkMode::SemiPersistent,
        SidelinkMode::SensingSemiPersistent,
    ];

    /// Returns the dense index of this mode.
    pub const fn index(self) -> usize {
        match self {
            SidelinkMode::NetworkScheduled => 0,
            SidelinkMode::Autonomous => 1,
            SidelinkMode::SemiPersistent => 2,
            SidelinkMode::SensingSemiPersistent => 3,
        }
    }

    /// Returns the mode at a dense index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parses a mode from its label or its numeric alias (`"mode1"` … `"mode4"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "network_scheduled" | "networkscheduled" | "mode1" => Some(Self::NetworkScheduled),
            "autonomous" | "mode2" => Some(Self::Autonomous),
            "semi_persistent" | "semipersistent" | "mode3" => Some(Self::SemiPersistent),
            "sensing_semi_persistent" | "sensingsemipersistent" | "mode4" => {
                Some(Self::SensingSemiPersistent)
            }
            _ => None,
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            SidelinkMode::NetworkScheduled => "network_scheduled",
            SidelinkMode::Autonomous => "autonomous",
            SidelinkMode::SemiPersistent => "semi_persistent",
            SidelinkMode::SensingSemiPersistent => "sensing_semi_persistent",
        }
    }
}

impl fmt::Display for SidelinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fixed-size table holding one value per [`SidelinkMode`].
///
/// The mode set is closed, so membership checks are plain array lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTable<T> {
    slots: [T; SidelinkMode::COUNT],
}

impl<T: Copy> ModeTable<T> {
    /// Creates a table with every slot set to `value`.
    pub const fn filled(value: T) -> Self {
        Self {
            slots: [value; SidelinkMode::COUNT],
        }
    }

    /// Returns the value for `mode`.
    pub fn get(&self, mode: SidelinkMode) -> T {
        self.slots[mode.index()]
    }

    /// Sets the value for `mode`.
    pub fn set(&mut self, mode: SidelinkMode, value: T) {
        self.slots[mode.index()] = value;
    }

    /// Iterates over `(mode, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SidelinkMode, T)> + '_ {
        SidelinkMode::ALL
            .into_iter()
            .map(move |mode| (mode, self.slots[mode.index()]))
    }
}

impl ModeTable<bool> {
    /// A table with every mode enabled.
    pub const fn all_enabled() -> Self {
        Self::filled(true)
    }

    /// Returns the enabled modes in index order.
    pub fn enabled_modes(&self) -> impl Iterator<Item = SidelinkMode> + '_ {
        self.iter()
            .filter_map(|(mode, enabled)| enabled.then_some(mode))
    }

    /// Returns how many modes are enabled.
    pub fn enabled_count(&self) -> usize {
        self.slots.iter().filter(|enabled| **enabled).count()
    }
}

impl Default for ModeTable<bool> {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl<T> Index<SidelinkMode> for ModeTable<T> {
    type Output = T;

    fn index(&self, mode: SidelinkMode) -> &T {
        &self.slots[mode.index()]
    }
}

impl<T> IndexMut<SidelinkMode> for ModeTable<T> {
    fn index_mut(&mut self, mode: SidelinkMode) -> &mut T {
        &mut self.slots[mode.index()]
    }
}
