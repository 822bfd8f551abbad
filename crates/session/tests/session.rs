//! Session behavior against in-process partitions

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{Address, Error, Name, Partition, PartitionId, PrimitiveId, PrimitiveType};
use strata_protocol::{counter, set};
use strata_session::{RetryPolicy, Session, SessionConfig, TcpConnector};
use strata_testing::{serve_tcp, Replica, TestCluster};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn config() -> SessionConfig {
    SessionConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_request_timeout(Duration::from_secs(2))
        .with_retry(
            RetryPolicy::new()
                .with_max_retries(3)
                .with_base_delay_ms(1)
                .with_max_delay_ms(5),
        )
}

fn set_id(name: &str) -> PrimitiveId {
    PrimitiveId::new(PrimitiveType::Set, Name::new("test", "db", "scope", name))
}

fn counter_id(name: &str) -> PrimitiveId {
    PrimitiveId::new(PrimitiveType::Counter, Name::new("test", "db", "scope", name))
}

/// A replica served over TCP on a local port
async fn tcp_replica() -> (Arc<Replica>, Address, JoinHandle<()>) {
    let replica = Replica::new(PartitionId::new(1).unwrap(), Address::new("127.0.0.1", 0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = Address::from(listener.local_addr().unwrap().to_string());
    let server = serve_tcp(listener, replica.clone());
    (replica, address, server)
}

/// Forwards connections to `upstream`; `cut` drops every open one
struct Relay {
    address: Address,
    pipes: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept: JoinHandle<()>,
}

impl Relay {
    async fn start(upstream: Address) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = Address::from(listener.local_addr().unwrap().to_string());
        let pipes: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();
        let accept = {
            let pipes = pipes.clone();
            tokio::spawn(async move {
                while let Ok((mut inbound, _)) = listener.accept().await {
                    let upstream = upstream.clone();
                    pipes.lock().push(tokio::spawn(async move {
                        if let Ok(mut outbound) = TcpStream::connect(upstream.as_str()).await {
                            let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                        }
                    }));
                }
            })
        };
        Self {
            address,
            pipes,
            accept,
        }
    }

    fn connections(&self) -> usize {
        self.pipes.lock().len()
    }

    fn cut(&self) {
        for pipe in self.pipes.lock().iter() {
            pipe.abort();
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.cut();
        self.accept.abort();
    }
}

async fn open(cluster: &TestCluster) -> Session {
    let partition = cluster.partitions().remove(0);
    Session::open(partition, &cluster.connector(), config())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_commands_arrive_in_issue_order() {
    let cluster = TestCluster::start(1);
    let session = open(&cluster).await;
    let id = set_id("ordered");

    for value in ["a", "b", "c", "d", "e"] {
        session
            .command(&id, set::AddRequest { value: value.into() })
            .await
            .unwrap();
    }

    let applied = cluster.replica(1).applied_sequences(session.session_id());
    assert_eq!(applied, vec![1, 2, 3, 4, 5]);
    assert_eq!(session.command_sequence(), 5);
}

#[tokio::test]
async fn test_concurrent_commands_apply_once_each() {
    let cluster = TestCluster::start(1);
    let session = std::sync::Arc::new(open(&cluster).await);
    let id = counter_id("concurrent");

    let calls: Vec<_> = (0..8)
        .map(|_| {
            let session = session.clone();
            let id = id.clone();
            tokio::spawn(async move {
                session
                    .command(&id, counter::IncrementRequest { delta: 1 })
                    .await
            })
        })
        .collect();
    for call in futures::future::join_all(calls).await {
        call.unwrap().unwrap();
    }

    let value = session.query(&id, counter::GetRequest {}).await.unwrap();
    assert_eq!(value.value, 8);
    let mut applied = cluster.replica(1).applied_sequences(session.session_id());
    applied.sort();
    assert_eq!(applied, (1..=8).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_lost_response_is_resent_with_same_sequence() {
    let cluster = TestCluster::start(1);
    let session = open(&cluster).await;
    let id = counter_id("exactly-once");

    cluster.replica(1).faults().drop_next_responses(1);
    let out = session
        .command(&id, counter::IncrementRequest { delta: 1 })
        .await
        .unwrap();
    assert_eq!((out.previous, out.next), (0, 1));

    let value = session.query(&id, counter::GetRequest {}).await.unwrap();
    assert_eq!(value.value, 1);
    assert_eq!(
        cluster.replica(1).applied_sequences(session.session_id()),
        vec![1]
    );
}

#[tokio::test]
async fn test_query_sees_own_writes() {
    let cluster = TestCluster::start(1);
    let session = open(&cluster).await;
    let id = set_id("rw");

    session
        .command(&id, set::AddRequest { value: "x".into() })
        .await
        .unwrap();
    let found = session
        .query(&id, set::ContainsRequest { value: "x".into() })
        .await
        .unwrap();
    assert!(found.contains);
}

#[tokio::test]
async fn test_open_retries_unreachable_partition() {
    let cluster = TestCluster::start(1);
    let replica = cluster.replica(1).clone();
    replica.faults().fail_next_requests(2);

    let partition = cluster.partitions().remove(0);
    let session = Session::open(
        partition,
        &cluster.connector(),
        config().with_open_attempts(3),
    )
    .await
    .unwrap();
    assert!(session.session_id().is_assigned());
    assert_eq!(replica.open_sessions(), 1);
}

#[tokio::test]
async fn test_open_fails_when_attempts_exhausted() {
    let cluster = TestCluster::start(1);
    cluster.replica(1).faults().set_unreachable(true);

    let partition = cluster.partitions().remove(0);
    let err = Session::open(
        partition,
        &cluster.connector(),
        config().with_open_attempts(2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
}

#[tokio::test]
async fn test_close_releases_server_state() {
    let cluster = TestCluster::start(1);
    let session = open(&cluster).await;
    assert_eq!(cluster.replica(1).open_sessions(), 1);

    session.close().await.unwrap();
    session.close().await.unwrap();

    assert_eq!(cluster.replica(1).open_sessions(), 0);
    assert_eq!(cluster.replica(1).close_calls(), 1);
    let err = session
        .command(&set_id("after"), set::AddRequest { value: "x".into() })
        .await
        .unwrap_err();
    assert!(err.is_session_expired());
}

#[tokio::test]
async fn test_expired_session_fails_operations() {
    let cluster = TestCluster::start(1);
    let session = open(&cluster).await;
    cluster.replica(1).expire_session(session.session_id());

    let err = session
        .command(&set_id("gone"), set::AddRequest { value: "x".into() })
        .await
        .unwrap_err();
    assert!(err.is_session_expired());
    assert!(!session.is_open());
}

#[tokio::test]
async fn test_watch_delivers_changes() {
    let cluster = TestCluster::start(1);
    let session = open(&cluster).await;
    let id = set_id("watched");

    let mut events = session
        .command_stream(&id, set::EventRequest { replay: false })
        .await
        .unwrap();
    assert_eq!(session.active_streams(), 1);

    session
        .command(&id, set::AddRequest { value: "x".into() })
        .await
        .unwrap();
    let event = events.recv().await.unwrap().unwrap();
    assert_eq!(event.r#type, set::EventType::Added);
    assert_eq!(event.value, "x");

    session.close_primitive(&id).await.unwrap();
    assert!(events.recv().await.is_none());
    assert_eq!(session.active_streams(), 0);
}

#[tokio::test]
async fn test_session_over_tcp() {
    let replica = Replica::new(
        strata_core::PartitionId::new(1).unwrap(),
        strata_core::Address::new("127.0.0.1", 0),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = strata_core::Address::from(listener.local_addr().unwrap().to_string());
    let server = serve_tcp(listener, replica.clone());

    let partition = strata_core::Partition::new(strata_core::PartitionId::new(1).unwrap(), address);
    let session = Session::open(partition, &TcpConnector::new(), config())
        .await
        .unwrap();
    let id = set_id("tcp");

    for value in ["b", "a"] {
        session
            .command(&id, set::AddRequest { value: value.into() })
            .await
            .unwrap();
    }
    let values: Vec<String> = session
        .query_stream(&id, set::IterateRequest {})
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.value)
        .collect();
    assert_eq!(values, vec!["a", "b"]);
    assert_eq!(replica.applied_sequences(session.session_id()), vec![1, 2]);

    session.close().await.unwrap();
    assert_eq!(replica.open_sessions(), 0);
    server.abort();
}

#[tokio::test]
async fn test_session_survives_connection_reset() {
    let (replica, address, server) = tcp_replica().await;
    let relay = Relay::start(address).await;
    let partition = Partition::new(PartitionId::new(1).unwrap(), relay.address.clone());
    let session = Session::open(partition, &TcpConnector::new(), config())
        .await
        .unwrap();
    let id = set_id("reset");

    session
        .command(&id, set::AddRequest { value: "a".into() })
        .await
        .unwrap();
    relay.cut();
    tokio::time::sleep(Duration::from_millis(50)).await;

    session
        .command(&id, set::AddRequest { value: "b".into() })
        .await
        .unwrap();
    assert_eq!(relay.connections(), 2);
    assert_eq!(replica.applied_sequences(session.session_id()), vec![1, 2]);

    let size = session.query(&id, set::SizeRequest {}).await.unwrap();
    assert_eq!(size.size, 2);
    session.close().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_unread_watch_does_not_stall_commands_over_tcp() {
    let (_replica, address, server) = tcp_replica().await;
    let partition = Partition::new(PartitionId::new(1).unwrap(), address);
    let session = Session::open(
        partition,
        &TcpConnector::new(),
        config().with_stream_buffer(2),
    )
    .await
    .unwrap();
    let watched = set_id("unread");

    // Never read: its events pile up behind the stream buffer
    let _events = session
        .command_stream(&watched, set::EventRequest { replay: false })
        .await
        .unwrap();

    for i in 0..200 {
        tokio::time::timeout(
            Duration::from_secs(2),
            session.command(&watched, set::AddRequest { value: format!("v{}", i) }),
        )
        .await
        .expect("command stalled behind an unread watch")
        .unwrap();
    }
    let other = counter_id("unrelated");
    let value = tokio::time::timeout(
        Duration::from_secs(2),
        session.query(&other, counter::GetRequest {}),
    )
    .await
    .expect("query stalled behind an unread watch")
    .unwrap();
    assert_eq!(value.value, 0);
    server.abort();
}

#[tokio::test]
async fn test_abandoned_command_is_still_applied_once() {
    let cluster = TestCluster::start(1);
    let partition = cluster.partitions().remove(0);
    let session = Session::open(
        partition,
        &cluster.connector(),
        config().with_retry(
            RetryPolicy::new()
                .with_max_retries(3)
                .with_base_delay_ms(200)
                .with_max_delay_ms(200),
        ),
    )
    .await
    .unwrap();
    let id = counter_id("abandoned");

    cluster.replica(1).faults().fail_next_requests(1);
    let waited = tokio::time::timeout(
        Duration::from_millis(20),
        session.command(&id, counter::IncrementRequest { delta: 1 }),
    )
    .await;
    assert!(waited.is_err());

    // The resend goes out after the backoff even though nobody waits for it
    for _ in 0..100 {
        if !cluster.replica(1).applied_sequences(session.session_id()).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        cluster.replica(1).applied_sequences(session.session_id()),
        vec![1]
    );

    session
        .command(&id, counter::IncrementRequest { delta: 1 })
        .await
        .unwrap();
    let value = session.query(&id, counter::GetRequest {}).await.unwrap();
    assert_eq!(value.value, 2);
    assert_eq!(
        cluster.replica(1).applied_sequences(session.session_id()),
        vec![1, 2]
    );
}
