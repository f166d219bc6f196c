//! Pruning specs
//!
//! Verify filters select the partitions that can hold matching rows.

use crate::prelude::*;

#[tokio::test]
async fn range_conjunction_selects_overlapping_partitions() {
    let h = Harness::in_memory();
    let children = h.ranges(&[(0, 10), (10, 20), (20, 30)]).await;

    let expr = Expr::And(vec![
        Expr::cmp("key", CmpOp::Gt, Value::Int(15)),
        Expr::cmp("key", CmpOp::Lt, Value::Int(25)),
    ]);
    let result = h.runtime.pruner().prune(DB, &expr, PARENT, None).await.unwrap();

    similar_asserts::assert_eq!(result.children, vec![children[1], children[2]]);
    assert!(!result.found_gap);
    // key > 15 keeps two of three partitions, key < 25 keeps all three
    assert!((result.selectivity - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn filter_over_a_gap_reports_it() {
    let h = Harness::in_memory();
    let children = h.ranges(&[(0, 10), (20, 30)]).await;

    let expr = Expr::cmp("key", CmpOp::Ge, Value::Int(15));
    let result = h.runtime.pruner().prune(DB, &expr, PARENT, None).await.unwrap();

    similar_asserts::assert_eq!(result.children, vec![children[1]]);
    assert!(result.found_gap);
}

#[tokio::test]
async fn pruning_sees_partitions_created_by_inserts() {
    let h = Harness::in_memory();
    h.ranges(&[(0, 10)]).await;
    let expr = Expr::cmp("key", CmpOp::Ge, Value::Int(10));

    let before = h.runtime.pruner().prune(DB, &expr, PARENT, None).await.unwrap();
    assert!(before.children.is_empty());

    let child = h.insert(12, IsolationLevel::ReadCommitted).await.unwrap();
    let after = h.runtime.pruner().prune(DB, &expr, PARENT, None).await.unwrap();
    similar_asserts::assert_eq!(after.children, vec![child]);
    assert!(after.version > before.version);
}
