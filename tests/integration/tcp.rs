//! Full stack over loopback TCP

use crate::common::{config, init_tracing, TcpCluster};
use futures::StreamExt;
use strata_client::{route, with_replay, Database, SetEventKind, TcpConnector};

#[tokio::test]
async fn test_database_over_tcp() -> anyhow::Result<()> {
    init_tracing();
    let cluster = TcpCluster::start(2).await;
    let db = Database::open(config(), &cluster.configs, &TcpConnector::new()).await?;

    let set = db.get_set("tcp")?;
    set.add("b").await?;
    set.add("a").await?;
    let mut events = set.watch(&[with_replay()]).await?;
    set.add("c").await?;

    let mut values = Vec::new();
    for _ in 0..3 {
        let event = events.next().await.expect("event")?;
        assert_eq!(event.kind, SetEventKind::Added);
        values.push(event.value);
    }
    assert_eq!(values, vec!["a", "b", "c"]);

    let counter = db.get_counter("tcp-counter")?;
    assert_eq!(counter.increment(3).await?, 3);

    let target = route(set.name(), 2);
    let session = &db.sessions()[target];
    assert_eq!(
        cluster.replicas[target].applied_sequences(session.session_id())[..3],
        [1, 2, 3]
    );

    db.close().await?;
    for replica in &cluster.replicas {
        assert_eq!(replica.open_sessions(), 0);
    }
    Ok(())
}
