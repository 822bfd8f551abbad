//! Database lifecycle through the facade

use crate::common::{config, init_tracing};
use strata_client::{Database, Error, PartitionId};
use strata_testing::TestCluster;

#[tokio::test]
async fn test_reverse_ordered_partitions_are_sorted() {
    init_tracing();
    let cluster = TestCluster::start(4);
    let mut configs = cluster.configs();
    configs.reverse();

    let db = Database::open(config(), &configs, &cluster.connector())
        .await
        .unwrap();
    let expected: Vec<PartitionId> = (1..=4).map(|id| PartitionId::new(id).unwrap()).collect();
    assert_eq!(db.partition_ids(), expected);
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_close_continues_past_failure() {
    init_tracing();
    let cluster = TestCluster::start(3);
    let db = Database::open(config(), &cluster.configs(), &cluster.connector())
        .await
        .unwrap();

    cluster.replica(2).faults().fail_session_close(true);
    let err = db.close().await.unwrap_err();
    assert!(matches!(err, Error::CloseFailed { failed: 1, .. }));
    assert_eq!(cluster.replica(1).close_calls(), 1);
    assert_eq!(cluster.replica(3).close_calls(), 1);
}

#[tokio::test]
async fn test_unreachable_partition_fails_open() {
    init_tracing();
    let cluster = TestCluster::start(2);
    cluster.replica(1).faults().set_unreachable(true);

    let err = Database::open(
        config(),
        &cluster.configs(),
        &cluster.connector(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::PartitionUnavailable { partition: 1, .. }));
    assert_eq!(cluster.replica(2).open_sessions(), 0);
}
