// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on lock waits
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on partitions created for a single missing value
pub const DEFAULT_MAX_PARTITIONS_PER_EVENT: usize = 1000;

/// Runtime switches for partition routing and creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Route and prune through partitions at all
    pub enabled: bool,
    /// Create partitions in an isolated worker when inline creation is unsafe
    pub spawn_using_worker: bool,
    /// How long blocking lock requests wait before giving up
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
    pub max_partitions_per_event: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spawn_using_worker: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_partitions_per_event: DEFAULT_MAX_PARTITIONS_PER_EVENT,
        }
    }
}

impl EngineConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_spawn_using_worker(mut self, spawn: bool) -> Self {
        self.spawn_using_worker = spawn;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_max_partitions_per_event(mut self, max: usize) -> Self {
        self.max_partitions_per_event = max;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
