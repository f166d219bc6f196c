// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

use super::*;
use crate::policy::IntervalPolicy;
use crate::config::DEFAULT_MAX_PARTITIONS_PER_EVENT;
use crate::error::PolicyError;
use async_trait::async_trait;
use partix_core::{
    select_hash_partition, CmpOp, CreationError, Expr, Interval, KeyType, LockError, LockMode,
    PartitionConfig, RangeInterval, RegistryError, SearchMiss, StateError, Value, ValueError,
};
use partix_storage::Catalog;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const DB: DatabaseId = DatabaseId(1);
const PARENT: RelId = RelId(10);

fn setup_with(config: EngineConfig) -> (Runtime, Arc<Catalog>) {
    let catalog = Arc::new(Catalog::in_memory());
    let deps = RuntimeDeps {
        locks: Arc::new(LockManager::new()),
        state: Arc::new(SharedState::new()),
        registry: catalog.clone(),
        policy: Arc::new(IntervalPolicy::new(config.max_partitions_per_event)),
    };
    (Runtime::new(deps, config), catalog)
}

fn setup() -> (Runtime, Arc<Catalog>) {
    setup_with(EngineConfig::default().with_lock_timeout(Duration::from_millis(200)))
}

/// Partition PARENT by `id` with the given `[min, max)` ranges and step 10
async fn partition_ranges(catalog: &Catalog, bounds: &[(i64, i64)]) -> Vec<RelId> {
    catalog
        .add_config(partix_core::PartitionConfig::range(
            DB,
            PARENT,
            "id",
            KeyType::Int,
            Some(RangeInterval::Int(10)),
        ))
        .await
        .unwrap();
    let mut children = Vec::new();
    for (min, max) in bounds {
        let child = catalog.next_child_id().await.unwrap();
        catalog
            .register_partition(PARENT, Interval::new(Value::Int(*min), Value::Int(*max)), child)
            .await
            .unwrap();
        children.push(child);
    }
    children
}

fn bounds(catalog: &Catalog) -> Vec<(i64, i64)> {
    let mut ranges: Vec<(i64, i64)> = catalog
        .entry(PARENT)
        .unwrap()
        .ranges
        .iter()
        .map(|re| match (&re.min, &re.max) {
            (Value::Int(min), Value::Int(max)) => (*min, *max),
            other => panic!("unexpected bounds {other:?}"),
        })
        .collect();
    ranges.sort();
    ranges
}

async fn route(runtime: &Runtime, xact: &Transaction, value: i64) -> Result<RelId, EngineError> {
    runtime
        .router()
        .route_and_ensure_partition(xact, &Value::Int(value), PARENT)
        .await
}

#[tokio::test]
async fn existing_partition_is_used_without_creation() {
    let (runtime, catalog) = setup();
    let children = partition_ranges(&catalog, &[(0, 10), (10, 20)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);

    assert_eq!(route(&runtime, &xact, 15).await.unwrap(), children[1]);
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20)]);
}

#[tokio::test]
async fn value_above_last_range_appends_partition() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10), (10, 20)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);

    let child = route(&runtime, &xact, 25).await.unwrap();
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20), (20, 30)]);

    let info = runtime.relation(DB, PARENT).await.unwrap();
    assert_eq!(info.children().last(), Some(&child));
    assert!(info.version >= 2);
    // Routing again finds the new partition
    assert_eq!(route(&runtime, &xact, 29).await.unwrap(), child);
}

#[tokio::test]
async fn gap_is_filled_inline_under_read_committed() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10), (20, 30)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    assert_eq!(
        crate::decide_path(true, &xact, PARENT),
        crate::CreationPath::Inline
    );

    route(&runtime, &xact, 15).await.unwrap();
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20), (20, 30)]);
}

#[tokio::test]
async fn concurrent_sessions_create_gap_partition_once() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10), (20, 30)]).await;

    let sessions: Vec<_> = (0..2)
        .map(|_| {
            let runtime = runtime.clone();
            tokio::spawn(async move {
                let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
                let child = route(&runtime, &xact, 15).await;
                xact.commit();
                child
            })
        })
        .collect();

    let mut children = Vec::new();
    for session in sessions {
        children.push(session.await.unwrap().unwrap());
    }
    assert_eq!(children[0], children[1]);
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20), (20, 30)]);
}

#[tokio::test]
async fn concurrent_inserts_never_overlap() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10)]).await;

    let values = [95, 12, 47, 33, 12, 78, 61, 24];
    let sessions: Vec<_> = values
        .iter()
        .map(|value| {
            let runtime = runtime.clone();
            let value = *value;
            tokio::spawn(async move {
                let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
                route(&runtime, &xact, value).await.map(|child| (value, child))
            })
        })
        .collect();

    let mut routed = Vec::new();
    for session in sessions {
        routed.push(session.await.unwrap().unwrap());
    }

    let expected: Vec<(i64, i64)> = (0..10).map(|n| (n * 10, n * 10 + 10)).collect();
    assert_eq!(bounds(&catalog), expected);
    let info = runtime.relation(DB, PARENT).await.unwrap();
    for (value, child) in routed {
        let owner = info.ranges().iter().find(|re| re.child == child).unwrap();
        assert!(owner.contains(&Value::Int(value)), "{value} routed to {child}");
    }
}

#[tokio::test]
async fn repeatable_read_creates_in_isolated_worker() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::RepeatableRead);
    assert_eq!(
        crate::decide_path(true, &xact, PARENT),
        crate::CreationPath::Isolated
    );

    let child = route(&runtime, &xact, 15).await.unwrap();
    xact.abort();

    // The worker committed on its own
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20)]);
    let info = runtime.relation(DB, PARENT).await.unwrap();
    assert!(info.children().contains(&child));
}

#[tokio::test]
async fn conflicting_lock_sends_creation_to_worker_without_deadlock() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    xact.lock_relation(PARENT, LockMode::Share).await.unwrap();
    assert_eq!(
        crate::decide_path(true, &xact, PARENT),
        crate::CreationPath::Isolated
    );

    route(&runtime, &xact, 12).await.unwrap();
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20)]);
    assert!(xact.lock_manager().holds(
        xact.id(),
        partix_core::LockTag::relation(DB, PARENT),
        LockMode::Share
    ));
}

#[tokio::test]
async fn worker_switch_off_forces_inline() {
    let (runtime, catalog) = setup_with(
        EngineConfig::default()
            .with_spawn_using_worker(false)
            .with_lock_timeout(Duration::from_millis(200)),
    );
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::Serializable);
    assert_eq!(
        crate::decide_path(false, &xact, PARENT),
        crate::CreationPath::Inline
    );
    route(&runtime, &xact, -5).await.unwrap();
    assert_eq!(bounds(&catalog), vec![(-10, 0), (0, 10)]);
}

#[tokio::test]
async fn creation_waits_out_lock_timeout() {
    let (runtime, catalog) = setup_with(
        EngineConfig::default().with_lock_timeout(Duration::from_millis(50)),
    );
    partition_ranges(&catalog, &[(0, 10)]).await;
    let editor = runtime.begin(DB, IsolationLevel::ReadCommitted);
    editor.lock_partitioned_relation(PARENT).await.unwrap();

    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    let err = route(&runtime, &xact, 15).await.unwrap_err();
    assert!(matches!(err, EngineError::Lock(LockError::NotAcquired { .. })));
    assert_eq!(bounds(&catalog), vec![(0, 10)]);
}

#[tokio::test]
async fn rejects_unroutable_keys() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    let router = runtime.router();

    let null = router
        .route_and_ensure_partition(&xact, &Value::Null, PARENT)
        .await;
    assert_eq!(null, Err(EngineError::NullKey));

    let date = Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    let mistyped = router.route_and_ensure_partition(&xact, &date, PARENT).await;
    assert!(matches!(mistyped, Err(EngineError::Value(_))));

    let unknown = router
        .route_and_ensure_partition(&xact, &Value::Int(1), RelId(99))
        .await;
    assert_eq!(unknown, Err(EngineError::NotPartitioned(RelId(99))));
}

#[tokio::test]
async fn disabled_engine_refuses_work() {
    let (runtime, catalog) = setup_with(EngineConfig::default().with_enabled(false));
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);

    assert_eq!(route(&runtime, &xact, 5).await, Err(EngineError::Disabled));
    let pruned = runtime
        .pruner()
        .prune(DB, &Expr::eq("id", Value::Int(5)), PARENT, None)
        .await;
    assert_eq!(pruned, Err(EngineError::Disabled));
}

#[tokio::test]
async fn pruner_selects_overlapping_partitions() {
    let (runtime, catalog) = setup();
    let children = partition_ranges(&catalog, &[(0, 10), (10, 20), (20, 30)]).await;

    let expr = Expr::And(vec![
        Expr::cmp("id", CmpOp::Gt, Value::Int(15)),
        Expr::cmp("id", CmpOp::Lt, Value::Int(25)),
    ]);
    let result = runtime.pruner().prune(DB, &expr, PARENT, None).await.unwrap();
    assert_eq!(result.children, children[1..].to_vec());
    assert!(!result.found_gap);
    assert_eq!(bounds(&catalog).len(), 3);
}

#[tokio::test]
async fn partitioner_sets_up_ranges() {
    let (runtime, catalog) = setup();
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);

    let info = runtime
        .partitioner()
        .create_range_partitions(
            &xact,
            PARENT,
            "id",
            KeyType::Int,
            Value::Int(100),
            RangeInterval::Int(50),
            3,
        )
        .await
        .unwrap();
    assert_eq!(info.nparts(), 3);
    assert_eq!(bounds(&catalog), vec![(100, 150), (150, 200), (200, 250)]);
    assert!(xact.lock_manager().held(xact.id(), partix_core::LockTag::relation(DB, PARENT)).is_empty());

    assert_eq!(route(&runtime, &xact, 260).await.map(|_| ()), Ok(()));
    assert_eq!(bounds(&catalog).last(), Some(&(250, 300)));
}

#[tokio::test]
async fn partitioner_refuses_relation_being_modified() {
    let (runtime, _catalog) = setup();
    let writer = runtime.begin(DB, IsolationLevel::ReadCommitted);
    writer.lock_relation(PARENT, LockMode::RowExclusive).await.unwrap();

    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    let result = runtime
        .partitioner()
        .create_hash_partitions(&xact, PARENT, "id", KeyType::Int, 4)
        .await;
    assert_eq!(result.map(|_| ()), Err(EngineError::BeingModified(PARENT)));
}

#[tokio::test]
async fn hash_partitions_route_by_bucket() {
    let (runtime, _catalog) = setup();
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    let info = runtime
        .partitioner()
        .create_hash_partitions(&xact, PARENT, "id", KeyType::Int, 4)
        .await
        .unwrap();

    let bucket = select_hash_partition(&Value::Int(42), 4).unwrap();
    assert_eq!(route(&runtime, &xact, 42).await.unwrap(), info.children()[bucket]);

    let zero = runtime
        .partitioner()
        .create_hash_partitions(&xact, RelId(11), "id", KeyType::Int, 0)
        .await;
    assert!(matches!(zero, Err(EngineError::InvalidArgument(_))));
}

#[tokio::test]
async fn dropped_relation_is_no_longer_partitioned() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    route(&runtime, &xact, 5).await.unwrap();

    runtime.partitioner().drop_config(&xact, PARENT).await.unwrap();
    assert_eq!(
        route(&runtime, &xact, 5).await,
        Err(EngineError::NotPartitioned(PARENT))
    );
    assert!(catalog.entry(PARENT).is_none());
}

#[tokio::test]
async fn shutdown_fails_later_calls() {
    let (runtime, catalog) = setup();
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    runtime.shutdown();

    assert_eq!(
        route(&runtime, &xact, 5).await,
        Err(EngineError::State(StateError::ShutDown))
    );
}

/// Catalog wrapper that can stall one descriptor read or fail registrations
struct ScriptedRegistry {
    inner: Arc<Catalog>,
    stall_next_read: AtomicBool,
    /// Registrations allowed before the next one fails
    registrations_left: AtomicUsize,
}

impl ScriptedRegistry {
    fn new(inner: Arc<Catalog>) -> Self {
        Self {
            inner,
            stall_next_read: AtomicBool::new(false),
            registrations_left: AtomicUsize::new(usize::MAX),
        }
    }

    fn take_registration(&self) -> Result<(), CreationError> {
        match self.registrations_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
            left.checked_sub(1)
        }) {
            Ok(_) => Ok(()),
            Err(_) => Err(CreationError::Storage("disk full".to_string())),
        }
    }
}

#[async_trait]
impl PartitionRegistry for ScriptedRegistry {
    async fn load_config(&self, database: DatabaseId) -> Result<Vec<PartitionConfig>, RegistryError> {
        self.inner.load_config(database).await
    }

    async fn load_partition_descriptors(
        &self,
        parent: RelId,
    ) -> Result<PartRelationInfo, RegistryError> {
        let snapshot = self.inner.load_partition_descriptors(parent).await;
        if self.stall_next_read.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        snapshot
    }

    async fn add_config(&self, config: PartitionConfig) -> Result<(), RegistryError> {
        self.inner.add_config(config).await
    }

    async fn remove_config(&self, parent: RelId) -> Result<(), RegistryError> {
        self.inner.remove_config(parent).await
    }

    async fn next_child_id(&self) -> Result<RelId, RegistryError> {
        self.inner.next_child_id().await
    }

    async fn release_child_id(&self, child: RelId) {
        self.inner.release_child_id(child).await
    }

    async fn register_partition(
        &self,
        parent: RelId,
        interval: Interval,
        child: RelId,
    ) -> Result<(), CreationError> {
        self.take_registration()?;
        self.inner.register_partition(parent, interval, child).await
    }

    async fn register_hash_partition(
        &self,
        parent: RelId,
        child: RelId,
    ) -> Result<(), CreationError> {
        self.take_registration()?;
        self.inner.register_hash_partition(parent, child).await
    }
}

fn scripted_runtime(
    policy: Arc<dyn BoundPolicy>,
) -> (Runtime, Arc<Catalog>, Arc<ScriptedRegistry>, Arc<SharedState>) {
    let catalog = Arc::new(Catalog::in_memory());
    let registry = Arc::new(ScriptedRegistry::new(catalog.clone()));
    let state = Arc::new(SharedState::new());
    let deps = RuntimeDeps {
        locks: Arc::new(LockManager::new()),
        state: state.clone(),
        registry: registry.clone(),
        policy,
    };
    let config = EngineConfig::default().with_lock_timeout(Duration::from_secs(2));
    (Runtime::new(deps, config), catalog, registry, state)
}

#[tokio::test]
async fn reload_racing_creation_keeps_new_partition() {
    let (runtime, catalog, registry, state) =
        scripted_runtime(Arc::new(IntervalPolicy::new(DEFAULT_MAX_PARTITIONS_PER_EVENT)));
    partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    route(&runtime, &xact, 5).await.unwrap();

    // The reload reads the registry, then stalls before publishing
    registry.stall_next_read.store(true, Ordering::SeqCst);
    let reload = tokio::spawn({
        let state = state.clone();
        let registry = registry.clone();
        async move { state.reload(DB, registry.as_ref()).await.map(|_| ()) }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let child = route(&runtime, &xact, 15).await.unwrap();
    reload.await.unwrap().unwrap();

    let pruned = runtime
        .pruner()
        .prune(DB, &Expr::eq("id", Value::Int(15)), PARENT, None)
        .await
        .unwrap();
    assert_eq!(pruned.children, vec![child]);
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20)]);
    let cached = runtime.relation(DB, PARENT).await.unwrap();
    assert_eq!(cached.nparts(), 2);
}

#[tokio::test]
async fn failed_setup_leaves_relation_unpartitioned() {
    async fn partition(
        runtime: &Runtime,
        xact: &Transaction,
        start: i64,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        runtime
            .partitioner()
            .create_range_partitions(
                xact,
                PARENT,
                "id",
                KeyType::Int,
                Value::Int(start),
                RangeInterval::Int(10),
                3,
            )
            .await
    }

    let (runtime, catalog) = setup();
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);

    let overflow = partition(&runtime, &xact, i64::MAX - 15).await;
    assert!(matches!(
        overflow,
        Err(EngineError::Value(ValueError::Overflow { .. }))
    ));
    assert!(catalog.entry(PARENT).is_none());

    partition(&runtime, &xact, 0).await.unwrap();
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20), (20, 30)]);
}

#[tokio::test]
async fn registry_failure_mid_setup_removes_config() {
    let (runtime, catalog, registry, _state) =
        scripted_runtime(Arc::new(IntervalPolicy::new(DEFAULT_MAX_PARTITIONS_PER_EVENT)));
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);
    registry.registrations_left.store(2, Ordering::SeqCst);

    let failed = runtime
        .partitioner()
        .create_hash_partitions(&xact, PARENT, "id", KeyType::Int, 4)
        .await;
    assert!(matches!(
        failed,
        Err(EngineError::Creation(CreationError::Storage(_)))
    ));
    assert!(catalog.entry(PARENT).is_none());
    assert_eq!(
        route(&runtime, &xact, 1).await,
        Err(EngineError::NotPartitioned(PARENT))
    );

    registry.registrations_left.store(usize::MAX, Ordering::SeqCst);
    let info = runtime
        .partitioner()
        .create_hash_partitions(&xact, PARENT, "id", KeyType::Int, 4)
        .await
        .unwrap();
    assert_eq!(info.nparts(), 4);
}

/// Plans `[0, 10)` ahead of the interval that holds the value
struct LeadingCoveredPolicy;

impl BoundPolicy for LeadingCoveredPolicy {
    fn plan(
        &self,
        value: &Value,
        info: &PartRelationInfo,
        miss: SearchMiss,
    ) -> Result<Vec<Interval>, PolicyError> {
        let mut planned = vec![Interval::new(Value::Int(0), Value::Int(10))];
        planned.extend(IntervalPolicy::new(DEFAULT_MAX_PARTITIONS_PER_EVENT).plan(value, info, miss)?);
        Ok(planned)
    }
}

#[tokio::test]
async fn skipped_interval_does_not_use_up_an_id() {
    let (runtime, catalog, _registry, _state) = scripted_runtime(Arc::new(LeadingCoveredPolicy));
    let children = partition_ranges(&catalog, &[(0, 10)]).await;
    let xact = runtime.begin(DB, IsolationLevel::ReadCommitted);

    let child = route(&runtime, &xact, 15).await.unwrap();
    assert_eq!(child, RelId(children[0].0 + 1));
    assert_eq!(bounds(&catalog), vec![(0, 10), (10, 20)]);
    assert_eq!(catalog.next_child_id().await.unwrap(), RelId(child.0 + 1));
}
