//! Protocol behavior of the in-process replica, driven with raw requests

use std::sync::Arc;
use std::time::Duration;
use strata_core::{
    Address, Name, PartitionId, PrimitiveId, PrimitiveType, RequestHeader, ServerError,
    SessionId,
};
use strata_protocol::session::{OpenSessionRequest, OpenSessionResponse};
use strata_protocol::{counter, lock, set, Operation, Request, RequestKind, Response, ResponseKind};
use strata_testing::{Replica, GAP_TIMEOUT};

fn replica() -> Arc<Replica> {
    Replica::new(PartitionId::new(1).unwrap(), Address::new("partition-1", 5678))
}

fn primitive(primitive_type: PrimitiveType, name: &str) -> PrimitiveId {
    PrimitiveId::new(primitive_type, Name::new("test", "db", "scope", name))
}

async fn open(replica: &Arc<Replica>) -> SessionId {
    let request = Request::new(
        RequestKind::OpenSession,
        RequestHeader::default(),
        None,
        &OpenSessionRequest { timeout_ms: 5000 },
    )
    .unwrap();
    let response = replica.unary(request).await.unwrap();
    response.decode::<OpenSessionResponse>().unwrap().session_id
}

fn header(session: SessionId, sequence: u64) -> RequestHeader {
    RequestHeader {
        partition: 1,
        session_id: session,
        sequence_number: sequence,
        index: 0,
    }
}

fn command<O: Operation>(id: &PrimitiveId, session: SessionId, sequence: u64, op: &O) -> Request {
    Request::new(RequestKind::Command, header(session, sequence), Some(id.clone()), op).unwrap()
}

fn query<O: Operation>(id: &PrimitiveId, session: SessionId, last: u64, op: &O) -> Request {
    Request::new(RequestKind::Query, header(session, last), Some(id.clone()), op).unwrap()
}

fn increment(id: &PrimitiveId, session: SessionId, sequence: u64) -> Request {
    command(id, session, sequence, &counter::IncrementRequest { delta: 1 })
}

async fn counter_value(replica: &Arc<Replica>, id: &PrimitiveId, session: SessionId) -> i64 {
    let response = replica
        .unary(query(id, session, 0, &counter::GetRequest {}))
        .await
        .unwrap();
    response.decode::<counter::GetResponse>().unwrap().value
}

#[tokio::test]
async fn test_open_assigns_distinct_sessions() {
    let replica = replica();
    let a = open(&replica).await;
    let b = open(&replica).await;
    assert_ne!(a, b);
    assert_eq!(replica.session_ids(), vec![a, b]);
    assert_eq!(replica.session_timeout(a), Some(Duration::from_millis(5000)));
}

#[tokio::test]
async fn test_out_of_order_commands_apply_in_sequence() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Counter, "c");

    let second = {
        let replica = Arc::clone(&replica);
        let request = increment(&id, session, 2);
        tokio::spawn(async move { replica.unary(request).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    replica.unary(increment(&id, session, 1)).await.unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(replica.applied_sequences(session), vec![1, 2]);
}

#[tokio::test]
async fn test_duplicate_command_answered_from_cache() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Counter, "c");

    let first = replica.unary(increment(&id, session, 1)).await.unwrap();
    let again = replica.unary(increment(&id, session, 1)).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(counter_value(&replica, &id, session).await, 1);
    assert_eq!(replica.applied_sequences(session), vec![1]);
}

#[tokio::test]
async fn test_gap_is_skipped_after_timeout() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Counter, "c");

    let started = std::time::Instant::now();
    replica.unary(increment(&id, session, 2)).await.unwrap();
    assert!(started.elapsed() >= GAP_TIMEOUT);
    assert_eq!(replica.applied_sequences(session), vec![2]);

    // The late command still applies once
    replica.unary(increment(&id, session, 1)).await.unwrap();
    assert_eq!(replica.applied_sequences(session), vec![2, 1]);
}

#[tokio::test]
async fn test_unknown_session_reported_in_header() {
    let replica = replica();
    let id = primitive(PrimitiveType::Counter, "c");
    let response = replica.unary(increment(&id, SessionId(99), 1)).await.unwrap();
    assert_eq!(response.header.error, Some(ServerError::UnknownSession));
}

#[tokio::test]
async fn test_dropped_response_still_applies() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Counter, "c");

    replica.faults().drop_next_responses(1);
    assert!(replica.unary(increment(&id, session, 1)).await.is_err());
    replica.unary(increment(&id, session, 1)).await.unwrap();

    assert_eq!(counter_value(&replica, &id, session).await, 1);
}

#[tokio::test]
async fn test_watch_replays_then_follows() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Set, "s");

    replica
        .unary(command(&id, session, 1, &set::AddRequest { value: "x".into() }))
        .await
        .unwrap();
    let mut events = replica
        .stream(command(&id, session, 2, &set::EventRequest { replay: true }))
        .await
        .unwrap();
    replica
        .unary(command(&id, session, 3, &set::AddRequest { value: "y".into() }))
        .await
        .unwrap();

    let ack = events.recv().await.unwrap().unwrap();
    assert_eq!(ack.kind, ResponseKind::StreamOpen);
    let decode = |r: Response| r.decode::<set::EventResponse>().unwrap();
    let replayed = decode(events.recv().await.unwrap().unwrap());
    assert_eq!((replayed.r#type, replayed.value.as_str()), (set::EventType::Added, "x"));
    let live = decode(events.recv().await.unwrap().unwrap());
    assert_eq!((live.r#type, live.value.as_str()), (set::EventType::Added, "y"));
}

#[tokio::test]
async fn test_query_stream_lists_elements() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Set, "s");
    for (sequence, value) in [(1, "b"), (2, "a")] {
        replica
            .unary(command(&id, session, sequence, &set::AddRequest { value: value.into() }))
            .await
            .unwrap();
    }

    let mut items = replica
        .stream(query(&id, session, 2, &set::IterateRequest {}))
        .await
        .unwrap();
    assert_eq!(items.recv().await.unwrap().unwrap().kind, ResponseKind::StreamOpen);
    let mut values = Vec::new();
    while let Some(item) = items.recv().await {
        values.push(item.unwrap().decode::<set::IterateResponse>().unwrap().value);
    }
    assert_eq!(values, vec!["a", "b"]);
}

#[tokio::test]
async fn test_lock_waiter_granted_when_holder_session_closes() {
    let replica = replica();
    let holder = open(&replica).await;
    let waiter = open(&replica).await;
    let id = primitive(PrimitiveType::Lock, "l");

    let acquire = |session, timeout_ms| command(&id, session, 1, &lock::LockRequest { timeout_ms });
    let held = replica.unary(acquire(holder, None)).await.unwrap();
    assert!(held.decode::<lock::LockResponse>().unwrap().acquired);

    let pending = {
        let replica = Arc::clone(&replica);
        let request = acquire(waiter, None);
        tokio::spawn(async move { replica.unary(request).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    replica.expire_session(holder);
    let granted = pending.await.unwrap().unwrap();
    assert!(granted.decode::<lock::LockResponse>().unwrap().acquired);
}

#[tokio::test]
async fn test_lock_wait_times_out() {
    let replica = replica();
    let holder = open(&replica).await;
    let waiter = open(&replica).await;
    let id = primitive(PrimitiveType::Lock, "l");

    replica
        .unary(command(&id, holder, 1, &lock::LockRequest { timeout_ms: None }))
        .await
        .unwrap();
    let response = replica
        .unary(command(&id, waiter, 1, &lock::LockRequest { timeout_ms: Some(50) }))
        .await
        .unwrap();
    assert!(!response.decode::<lock::LockResponse>().unwrap().acquired);
}

#[tokio::test]
async fn test_write_lock_fault_sets_status() {
    let replica = replica();
    let session = open(&replica).await;
    let id = primitive(PrimitiveType::Set, "s");

    replica.faults().lock_next_writes(1);
    let response = replica
        .unary(command(&id, session, 1, &set::AddRequest { value: "x".into() }))
        .await
        .unwrap();
    let added: set::AddResponse = response.decode().unwrap();
    assert!(!added.added);
    assert_eq!(set::AddRequest::status(&added), strata_core::ResponseStatus::WriteLock);
}
