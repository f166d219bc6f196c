//! Concurrent creation specs
//!
//! Verify sessions racing on the same missing key converge on one partition.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_sessions_share_one_new_partition() {
    let h = Arc::new(Harness::in_memory());
    h.ranges(&[(0, 10), (20, 30)]).await;

    let sessions: Vec<_> = (0..2)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.insert(15, IsolationLevel::ReadCommitted).await })
        })
        .collect();
    let mut children = Vec::new();
    for session in sessions {
        children.push(session.await.unwrap().unwrap());
    }

    assert_eq!(children[0], children[1]);
    similar_asserts::assert_eq!(h.bounds(), vec![(0, 10), (10, 20), (20, 30)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_sessions_never_publish_overlaps() {
    let h = Arc::new(Harness::in_memory());
    h.ranges(&[(0, 10)]).await;

    let sessions: Vec<_> = (0..16)
        .map(|n| {
            let h = Arc::clone(&h);
            let value = (n * 37) % 120;
            let isolation = if n % 3 == 0 {
                IsolationLevel::RepeatableRead
            } else {
                IsolationLevel::ReadCommitted
            };
            tokio::spawn(async move { (value, h.insert(value, isolation).await) })
        })
        .collect();

    let mut routed = Vec::new();
    for session in sessions {
        let (value, child) = session.await.unwrap();
        routed.push((value, child.unwrap()));
    }

    let bounds = h.bounds();
    assert!(bounds.windows(2).all(|pair| pair[0].1 <= pair[1].0));
    let info = h.runtime.relation(DB, PARENT).await.unwrap();
    for (value, child) in routed {
        let owner = info.ranges().iter().find(|re| re.child == child).unwrap();
        assert!(owner.contains(&Value::Int(value)), "{value} routed to {child}");
    }
}

#[tokio::test]
async fn isolated_worker_does_not_deadlock_with_its_caller() {
    let h = Harness::in_memory();
    h.ranges(&[(0, 10)]).await;

    let xact = h.runtime.begin(DB, IsolationLevel::ReadCommitted);
    xact.lock_relation(PARENT, LockMode::ShareUpdateExclusive)
        .await
        .unwrap();
    let child = h
        .runtime
        .router()
        .route_and_ensure_partition(&xact, &Value::Int(14), PARENT)
        .await
        .unwrap();
    xact.abort();

    // The worker committed independently of the aborted caller
    let info = h.runtime.relation(DB, PARENT).await.unwrap();
    assert_eq!(info.child_at(1), Some(child));
    similar_asserts::assert_eq!(h.bounds(), vec![(0, 10), (10, 20)]);
}
