// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry operations persisted to the WAL

use partix_core::{
    DatabaseId, KeyType, PartType, PartitionConfig, RangeInterval, RelId, Value,
};
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryOp {
    /// Put a relation under partition management
    ConfigAdded {
        database: DatabaseId,
        parent: RelId,
        key_column: String,
        key_type: KeyType,
        part_type: PartType,
        #[serde(default)]
        interval: Option<RangeInterval>,
    },

    /// Record a range partition `[min, max)`
    PartitionCreated {
        parent: RelId,
        child: RelId,
        min: Value,
        max: Value,
    },

    /// Append a hash bucket
    HashPartitionCreated { parent: RelId, child: RelId },

    /// Remove a relation and its partitions from management
    ConfigRemoved { parent: RelId },
}

impl RegistryOp {
    pub fn config_added(config: &PartitionConfig) -> Self {
        RegistryOp::ConfigAdded {
            database: config.database,
            parent: config.parent,
            key_column: config.key_column.clone(),
            key_type: config.key_type,
            part_type: config.part_type,
            interval: config.interval,
        }
    }

    /// Parent relation the operation applies to
    pub fn parent(&self) -> RelId {
        match self {
            RegistryOp::ConfigAdded { parent, .. }
            | RegistryOp::PartitionCreated { parent, .. }
            | RegistryOp::HashPartitionCreated { parent, .. }
            | RegistryOp::ConfigRemoved { parent } => *parent,
        }
    }
}
