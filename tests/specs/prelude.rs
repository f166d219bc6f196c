//! Shared setup for specs

#![allow(dead_code, unused_imports)]

pub use partix_core::{
    CmpOp, DatabaseId, Expr, Interval, IsolationLevel, KeyType, LockManager, LockMode,
    PartitionConfig, PartitionRegistry, RangeInterval, RelId, SharedState, Transaction, Value,
};
pub use partix_engine::{EngineConfig, EngineError, IntervalPolicy, Runtime, RuntimeDeps};
pub use partix_storage::Catalog;
pub use std::sync::Arc;
pub use std::time::Duration;

pub const DB: DatabaseId = DatabaseId(1);
pub const PARENT: RelId = RelId(10);

/// Runtime over a catalog the spec can inspect directly
pub struct Harness {
    pub runtime: Runtime,
    pub catalog: Arc<Catalog>,
}

impl Harness {
    pub fn in_memory() -> Self {
        Self::with(Arc::new(Catalog::in_memory()), EngineConfig::default())
    }

    pub fn at(wal: &std::path::Path) -> Self {
        Self::with(Arc::new(Catalog::open(wal).unwrap()), EngineConfig::default())
    }

    pub fn with(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        let deps = RuntimeDeps {
            locks: Arc::new(LockManager::new()),
            state: Arc::new(SharedState::new()),
            registry: catalog.clone(),
            policy: Arc::new(IntervalPolicy::new(config.max_partitions_per_event)),
        };
        Self {
            runtime: Runtime::new(deps, config),
            catalog,
        }
    }

    /// Range-partition PARENT on integer `key` with step 10 and the given bounds
    pub async fn ranges(&self, bounds: &[(i64, i64)]) -> Vec<RelId> {
        self.catalog
            .add_config(PartitionConfig::range(
                DB,
                PARENT,
                "key",
                KeyType::Int,
                Some(RangeInterval::Int(10)),
            ))
            .await
            .unwrap();
        let mut children = Vec::new();
        for (min, max) in bounds {
            let child = self.catalog.next_child_id().await.unwrap();
            self.catalog
                .register_partition(PARENT, Interval::new(Value::Int(*min), Value::Int(*max)), child)
                .await
                .unwrap();
            children.push(child);
        }
        children
    }

    /// Registered bounds of PARENT, sorted
    pub fn bounds(&self) -> Vec<(i64, i64)> {
        let mut bounds: Vec<(i64, i64)> = self
            .catalog
            .entry(PARENT)
            .unwrap()
            .ranges
            .iter()
            .map(|re| match (&re.min, &re.max) {
                (Value::Int(min), Value::Int(max)) => (*min, *max),
                other => panic!("non-integer bounds {other:?}"),
            })
            .collect();
        bounds.sort();
        bounds
    }

    /// Route `value` in a fresh transaction and commit
    pub async fn insert(&self, value: i64, isolation: IsolationLevel) -> Result<RelId, EngineError> {
        let xact = self.runtime.begin(DB, isolation);
        let child = self
            .runtime
            .router()
            .route_and_ensure_partition(&xact, &Value::Int(value), PARENT)
            .await;
        match child {
            Ok(_) => xact.commit(),
            Err(_) => xact.abort(),
        }
        child
    }
}
