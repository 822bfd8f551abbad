//! Sequencing and exactly-once through a database

use crate::common::open;
use strata_client::route;

#[tokio::test]
async fn test_commands_observed_in_issue_order() {
    let (cluster, db) = open(2).await;
    let log = db.get_log("ordered").unwrap();
    let target = route(log.name(), 2);

    for i in 0..10u8 {
        log.append(vec![i]).await.unwrap();
    }

    let session = &db.sessions()[target];
    let replica = &cluster.replicas()[target];
    assert_eq!(
        replica.applied_sequences(session.session_id()),
        (1..=10).collect::<Vec<u64>>()
    );
    assert_eq!(session.command_sequence(), 10);
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_increment_applies_once_across_resend() -> anyhow::Result<()> {
    let (cluster, db) = open(3).await;
    let counter = db.get_counter("exactly-once")?;
    let target = route(counter.name(), 3);

    cluster.replicas()[target].faults().drop_next_responses(1);
    assert_eq!(counter.increment(1).await?, 1);
    assert_eq!(counter.get().await?, 1);

    db.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_resend_after_failed_delivery() -> anyhow::Result<()> {
    let (cluster, db) = open(1).await;
    let counter = db.get_counter("delivery")?;

    cluster.replica(1).faults().fail_next_requests(2);
    assert_eq!(counter.increment(5).await?, 5);
    assert_eq!(counter.decrement(2).await?, 3);
    assert_eq!(
        cluster
            .replica(1)
            .applied_sequences(db.sessions()[0].session_id()),
        vec![1, 2]
    );

    db.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_session_expiry_surfaces_to_clients() {
    let (cluster, db) = open(1).await;
    let set = db.get_set("expiring").unwrap();
    set.add("a").await.unwrap();

    cluster
        .replica(1)
        .expire_session(db.sessions()[0].session_id());

    let err = set.add("b").await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!db.sessions()[0].is_open());
}
