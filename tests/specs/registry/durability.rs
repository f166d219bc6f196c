//! Registry durability specs
//!
//! Verify partitions created at runtime survive a restart.

use crate::prelude::*;

#[tokio::test]
async fn created_partitions_are_replayed_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("registry.wal");

    let first = Harness::at(&wal);
    let xact = first.runtime.begin(DB, IsolationLevel::ReadCommitted);
    first
        .runtime
        .partitioner()
        .create_range_partitions(
            &xact,
            PARENT,
            "key",
            KeyType::Int,
            Value::Int(0),
            RangeInterval::Int(10),
            2,
        )
        .await
        .unwrap();
    xact.commit();
    let created = first.insert(35, IsolationLevel::RepeatableRead).await.unwrap();
    drop(first);

    let second = Harness::at(&wal);
    similar_asserts::assert_eq!(second.bounds(), vec![(0, 10), (10, 20), (20, 30), (30, 40)]);
    assert_eq!(
        second.insert(31, IsolationLevel::ReadCommitted).await.unwrap(),
        created
    );
    // New ids continue after the replayed ones
    let next = second.insert(45, IsolationLevel::ReadCommitted).await.unwrap();
    assert!(next > created);
}

#[tokio::test]
async fn dropped_relation_stays_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("registry.wal");

    let first = Harness::at(&wal);
    first.ranges(&[(0, 10)]).await;
    let xact = first.runtime.begin(DB, IsolationLevel::ReadCommitted);
    first.runtime.partitioner().drop_config(&xact, PARENT).await.unwrap();
    xact.commit();
    drop(first);

    let second = Harness::at(&wal);
    assert!(second.catalog.entry(PARENT).is_none());
    assert_eq!(
        second.insert(5, IsolationLevel::ReadCommitted).await,
        Err(EngineError::NotPartitioned(PARENT))
    );
}
