//! Routing and on-demand creation specs
//!
//! Verify inserts land in the owning partition and that missing partitions
//! are created with interval-aligned bounds.

use crate::prelude::*;

#[tokio::test]
async fn value_inside_a_range_is_found_without_creation() {
    let h = Harness::in_memory();
    let children = h.ranges(&[(0, 10), (10, 20)]).await;

    let child = h.insert(15, IsolationLevel::ReadCommitted).await.unwrap();

    assert_eq!(child, children[1]);
    similar_asserts::assert_eq!(h.bounds(), vec![(0, 10), (10, 20)]);
}

#[tokio::test]
async fn value_past_the_last_range_creates_the_next_one() {
    let h = Harness::in_memory();
    let children = h.ranges(&[(0, 10), (10, 20)]).await;

    let child = h.insert(25, IsolationLevel::ReadCommitted).await.unwrap();

    assert!(!children.contains(&child));
    similar_asserts::assert_eq!(h.bounds(), vec![(0, 10), (10, 20), (20, 30)]);
    let info = h.runtime.relation(DB, PARENT).await.unwrap();
    assert_eq!(info.child_at(2), Some(child));
}

#[tokio::test]
async fn gap_is_filled_inline() {
    let h = Harness::in_memory();
    h.ranges(&[(0, 10), (20, 30)]).await;

    let xact = h.runtime.begin(DB, IsolationLevel::ReadCommitted);
    assert_eq!(
        partix_engine::decide_path(true, &xact, PARENT),
        partix_engine::CreationPath::Inline
    );
    let child = h
        .runtime
        .router()
        .route_and_ensure_partition(&xact, &Value::Int(15), PARENT)
        .await
        .unwrap();
    xact.commit();

    similar_asserts::assert_eq!(h.bounds(), vec![(0, 10), (10, 20), (20, 30)]);
    let info = h.runtime.relation(DB, PARENT).await.unwrap();
    assert_eq!(info.child_at(1), Some(child));
}

#[tokio::test]
async fn far_value_creates_every_step_in_between() {
    let h = Harness::in_memory();
    h.ranges(&[(0, 10)]).await;

    h.insert(47, IsolationLevel::ReadCommitted).await.unwrap();
    h.insert(-12, IsolationLevel::ReadCommitted).await.unwrap();

    similar_asserts::assert_eq!(
        h.bounds(),
        vec![(-20, -10), (-10, 0), (0, 10), (10, 20), (20, 30), (30, 40), (40, 50)]
    );
}

#[tokio::test]
async fn runaway_creation_is_capped() {
    let config = EngineConfig::default().with_max_partitions_per_event(5);
    let h = Harness::with(Arc::new(Catalog::in_memory()), config);
    h.ranges(&[(0, 10)]).await;

    let err = h.insert(1_000, IsolationLevel::ReadCommitted).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Policy(partix_engine::PolicyError::TooManyPartitions { limit: 5, .. })
    ));
    similar_asserts::assert_eq!(h.bounds(), vec![(0, 10)]);
}

#[tokio::test]
async fn first_insert_into_empty_relation_aligns_to_interval() {
    let h = Harness::in_memory();
    h.ranges(&[]).await;

    h.insert(37, IsolationLevel::ReadCommitted).await.unwrap();
    h.insert(-3, IsolationLevel::ReadCommitted).await.unwrap();

    similar_asserts::assert_eq!(h.bounds(), vec![(-10, 0), (0, 10), (10, 20), (20, 30), (30, 40)]);
}
