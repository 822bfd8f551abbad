//! Primitive behavior through database-issued clients

use crate::common::open;
use futures::StreamExt;
use std::time::Duration;
use strata_client::{
    route, with_default, with_replay, with_version, Error, MapEventKind, SetEvent, SetEventKind,
};

fn added(value: &str) -> SetEvent {
    SetEvent {
        kind: SetEventKind::Added,
        value: value.to_string(),
    }
}

#[tokio::test]
async fn test_set_elements() {
    let (_cluster, db) = open(2).await;
    let set = db.get_set("elements").unwrap();

    let empty: Vec<_> = set.elements().await.unwrap().collect().await;
    assert!(empty.is_empty());

    set.add("y").await.unwrap();
    set.add("x").await.unwrap();
    let elements: Vec<String> = set
        .elements()
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(elements, vec!["x", "y"]);
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_set_watch_with_and_without_replay() {
    let (_cluster, db) = open(2).await;
    let set = db.get_set("watched").unwrap();
    set.add("a").await.unwrap();
    set.add("b").await.unwrap();

    let mut replayed = set.watch(&[with_replay()]).await.unwrap();
    let mut live = set.watch(&[]).await.unwrap();
    set.add("c").await.unwrap();

    assert_eq!(replayed.next().await.unwrap().unwrap(), added("a"));
    assert_eq!(replayed.next().await.unwrap().unwrap(), added("b"));
    assert_eq!(replayed.next().await.unwrap().unwrap(), added("c"));

    assert_eq!(live.next().await.unwrap().unwrap(), added("c"));
    let idle = tokio::time::timeout(Duration::from_millis(50), live.next()).await;
    assert!(idle.is_err());

    set.close().await.unwrap();
    assert!(replayed.next().await.is_none());
    assert!(live.next().await.is_none());
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_map_version_and_default_options() {
    let (_cluster, db) = open(3).await;
    let map = db.get_map("options").unwrap();

    let first = map.put("k", b"v1".to_vec(), &[]).await.unwrap();
    let stale = map
        .put("k", b"v2".to_vec(), &[with_version(first.version + 100)])
        .await
        .unwrap_err();
    assert!(matches!(stale, Error::PreconditionFailed { .. }));

    let second = map
        .put("k", b"v2".to_vec(), &[with_version(first.version)])
        .await
        .unwrap();
    assert!(second.version > first.version);

    let missing = map
        .get("absent", &[with_default(b"fallback".to_vec())])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(missing.value, b"fallback".to_vec());
    assert_eq!(missing.version, 0);
    assert!(map.get("absent", &[]).await.unwrap().is_none());

    let removed = map
        .remove("k", &[with_version(second.version)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.value, b"v2".to_vec());
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_write_lock_is_distinguished() {
    let (cluster, db) = open(2).await;
    let map = db.get_map("contended").unwrap();
    let target = route(map.name(), 2);

    cluster.replicas()[target].faults().lock_next_writes(1);
    let err = map.put("k", b"v".to_vec(), &[]).await.unwrap_err();
    assert!(err.is_write_lock());

    // Safe to retry
    map.put("k", b"v".to_vec(), &[]).await.unwrap();
    assert!(map.get("k", &[]).await.unwrap().is_some());
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_map_watch_reports_changes() {
    let (_cluster, db) = open(1).await;
    let map = db.get_map("events").unwrap();
    let mut events = map.watch(&[]).await.unwrap();

    map.put("k", b"1".to_vec(), &[]).await.unwrap();
    map.put("k", b"2".to_vec(), &[]).await.unwrap();
    map.remove("k", &[]).await.unwrap();

    let kinds: Vec<MapEventKind> = events
        .by_ref()
        .take(3)
        .map(|e| e.unwrap().kind)
        .collect()
        .await;
    assert_eq!(
        kinds,
        vec![
            MapEventKind::Inserted,
            MapEventKind::Updated,
            MapEventKind::Removed
        ]
    );
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_lock_released_when_holder_database_closes() {
    let cluster = strata_testing::TestCluster::start(1);
    let config = crate::common::config();
    let holder_db =
        strata_client::Database::open(config.clone(), &cluster.configs(), &cluster.connector())
            .await
            .unwrap();
    let waiter_db = strata_client::Database::open(config, &cluster.configs(), &cluster.connector())
        .await
        .unwrap();

    let holder = holder_db.get_lock("mutex").unwrap();
    let waiter = waiter_db.get_lock("mutex").unwrap();
    assert!(holder.try_lock().await.unwrap().is_some());
    assert!(waiter.try_lock().await.unwrap().is_none());

    let pending = tokio::spawn(async move { waiter.lock(Some(Duration::from_secs(1))).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    holder_db.close().await.unwrap();

    assert!(pending.await.unwrap().unwrap().is_some());
    waiter_db.close().await.unwrap();
}
