//! In-process partition replica
//!
//! A [`Replica`] answers the session protocol for one partition the way a
//! server would:
//! - commands from a session are applied strictly in sequence order; a
//!   command that arrives ahead of its predecessor waits for it (for at most
//!   [`GAP_TIMEOUT`]), and a duplicate is answered from the response cache
//! - queries wait until the session's last issued command has been applied
//! - streams start with a `StreamOpen` acknowledgement; watches with replay
//!   receive the current state before any later change
//!
//! Every applied command is recorded so tests can check the sequence the
//! partition observed.

use crate::faults::Faults;
use crate::machine::{Context, Machine};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_core::{
    Address, Error, PartitionId, PrimitiveId, RequestHeader, ResponseHeader, Result,
    ServerError, SessionId,
};
use strata_protocol::session::{
    ClosePrimitiveResponse, CloseSessionResponse, DeleteResponse, KeepAliveRequest,
    KeepAliveResponse, OpenSessionRequest, OpenSessionResponse,
};
use strata_protocol::{encode, Request, RequestKind, Response, ResponseKind};
use strata_session::ResponseReceiver;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::Instant;
use tracing::debug;

/// Longest a command waits for a missing predecessor before it is applied anyway
pub const GAP_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a waiting request sleeps between state checks
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Delivery buffer of each outgoing stream
const STREAM_BUFFER: usize = 64;

// ============================================================================
// State
// ============================================================================

enum Cached {
    Ready(Response),
    Pending,
}

#[derive(Default)]
struct SessionEntry {
    timeout_ms: u64,
    last_applied: u64,
    applied: Vec<u64>,
    responses: HashMap<u64, Cached>,
}

struct Listener {
    session: SessionId,
    primitive: PrimitiveId,
    tx: mpsc::UnboundedSender<Result<Response>>,
}

#[derive(Default)]
struct ReplicaState {
    last_session: u64,
    index: u64,
    sessions: HashMap<SessionId, SessionEntry>,
    machines: HashMap<PrimitiveId, Machine>,
    listeners: Vec<Listener>,
}

enum Position {
    UnknownSession,
    Cached(Response),
    Wait,
    Apply,
}

enum Step {
    Done(Response),
    Wait,
    Deferred(oneshot::Receiver<Bytes>, ResponseHeader),
}

#[derive(Deserialize)]
struct WatchFlags {
    #[serde(default)]
    replay: bool,
}

fn unknown_session(header: &RequestHeader) -> Response {
    Response::failure(ResponseHeader {
        session_id: header.session_id,
        error: Some(ServerError::UnknownSession),
        ..Default::default()
    })
}

fn to_response(mut header: ResponseHeader, result: Result<Bytes>) -> Response {
    match result {
        Ok(payload) => Response {
            header,
            kind: ResponseKind::Response,
            payload,
        },
        Err(e) => {
            header.error = Some(ServerError::Internal {
                message: e.to_string(),
            });
            Response::failure(header)
        }
    }
}

/// Send events to the primitive's listeners, dropping listeners that went away
fn publish(listeners: &mut Vec<Listener>, primitive: &PrimitiveId, index: u64, events: &[Bytes]) {
    if events.is_empty() {
        return;
    }
    listeners.retain(|listener| {
        if &listener.primitive != primitive {
            return true;
        }
        events.iter().all(|payload| {
            let header = ResponseHeader {
                session_id: listener.session,
                index,
                ..Default::default()
            };
            let event = Response {
                header,
                kind: ResponseKind::Response,
                payload: payload.clone(),
            };
            listener.tx.send(Ok(event)).is_ok()
        })
    });
}

impl ReplicaState {
    fn position(&self, header: &RequestHeader, gap_expired: bool) -> Position {
        let Some(entry) = self.sessions.get(&header.session_id) else {
            return Position::UnknownSession;
        };
        let sequence = header.sequence_number;
        match entry.responses.get(&sequence) {
            Some(Cached::Ready(response)) => Position::Cached(response.clone()),
            Some(Cached::Pending) => Position::Wait,
            None if sequence <= entry.last_applied + 1 || gap_expired => Position::Apply,
            None => Position::Wait,
        }
    }

    /// Advance the index and record the command; returns the response header
    fn record(&mut self, header: &RequestHeader) -> ResponseHeader {
        self.index += 1;
        let sequence = header.sequence_number;
        if let Some(entry) = self.sessions.get_mut(&header.session_id) {
            entry.last_applied = entry.last_applied.max(sequence);
            entry.applied.push(sequence);
        }
        ResponseHeader {
            session_id: header.session_id,
            index: self.index,
            sequence_number: sequence,
            error: None,
        }
    }

    fn cache(&mut self, header: &RequestHeader, cached: Cached) {
        if let Some(entry) = self.sessions.get_mut(&header.session_id) {
            entry.responses.insert(header.sequence_number, cached);
        }
    }

    fn machine(&mut self, primitive: &PrimitiveId) -> &mut Machine {
        self.machines
            .entry(primitive.clone())
            .or_insert_with(|| Machine::new(primitive.primitive_type))
    }

    /// Forget a session and release everything it held
    fn end_session(&mut self, session: SessionId) -> bool {
        if self.sessions.remove(&session).is_none() {
            return false;
        }
        self.index += 1;
        let index = self.index;
        self.listeners.retain(|l| l.session != session);
        for (primitive, machine) in self.machines.iter_mut() {
            let mut ctx = Context::new(session, index);
            if machine.get_mut().release(&mut ctx).is_ok() {
                publish(&mut self.listeners, primitive, index, &ctx.events);
            }
        }
        true
    }
}

// ============================================================================
// Replica
// ============================================================================

/// One in-process partition
pub struct Replica {
    id: PartitionId,
    address: Address,
    state: Mutex<ReplicaState>,
    changed: Notify,
    faults: Faults,
    close_calls: AtomicUsize,
}

impl Replica {
    /// Create an empty replica
    pub fn new(id: PartitionId, address: Address) -> Arc<Self> {
        Arc::new(Self {
            id,
            address,
            state: Mutex::new(ReplicaState::default()),
            changed: Notify::new(),
            faults: Faults::default(),
            close_calls: AtomicUsize::new(0),
        })
    }

    /// Partition ID
    pub fn id(&self) -> PartitionId {
        self.id
    }

    /// Address clients connect to
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Fault injection controls
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Command sequence numbers applied for a session, in application order
    pub fn applied_sequences(&self, session: SessionId) -> Vec<u64> {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|entry| entry.applied.clone())
            .unwrap_or_default()
    }

    /// IDs of the sessions currently registered
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.state.lock().sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of sessions currently registered
    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Session timeout a client requested, if the session is registered
    pub fn session_timeout(&self, session: SessionId) -> Option<Duration> {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|entry| Duration::from_millis(entry.timeout_ms))
    }

    /// Number of session close requests received, including failed ones
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Forget a session as if it had timed out
    pub fn expire_session(&self, session: SessionId) {
        if self.state.lock().end_session(session) {
            self.changed.notify_waiters();
        }
    }

    /// Handle a unary request
    pub async fn unary(self: &Arc<Self>, request: Request) -> Result<Response> {
        self.faults.before_delivery(&self.address)?;
        let response = match request.kind {
            RequestKind::OpenSession => self.open_session(&request)?,
            RequestKind::KeepAlive => self.keep_alive(&request)?,
            RequestKind::CloseSession => self.close_session(&request)?,
            RequestKind::Command | RequestKind::ClosePrimitive | RequestKind::Delete => {
                self.command(&request).await
            }
            RequestKind::Query => self.query(&request).await,
        };
        self.faults.after_apply(&self.address)?;
        Ok(response)
    }

    /// Handle a streaming request
    pub async fn stream(self: &Arc<Self>, request: Request) -> Result<ResponseReceiver> {
        self.faults.before_delivery(&self.address)?;
        match request.kind {
            RequestKind::Query => Ok(self.query_stream(&request).await),
            RequestKind::Command => Ok(self.watch(&request).await),
            kind => Err(Error::rpc(format!("{:?} cannot be streamed", kind))),
        }
    }

    // ------------------------------------------------------------------------
    // Session management
    // ------------------------------------------------------------------------

    fn open_session(&self, request: &Request) -> Result<Response> {
        let open: OpenSessionRequest = request.decode()?;
        let mut state = self.state.lock();
        state.last_session += 1;
        let session_id = SessionId(state.last_session);
        state.sessions.insert(
            session_id,
            SessionEntry {
                timeout_ms: open.timeout_ms,
                ..Default::default()
            },
        );
        debug!(partition = self.id.as_u32(), session_id = %session_id, "Registered session");
        let header = ResponseHeader {
            session_id,
            index: state.index,
            ..Default::default()
        };
        Response::new(header, &OpenSessionResponse { session_id })
    }

    fn keep_alive(&self, request: &Request) -> Result<Response> {
        let keep_alive: KeepAliveRequest = request.decode()?;
        let mut state = self.state.lock();
        let index = state.index;
        let Some(entry) = state.sessions.get_mut(&request.header.session_id) else {
            return Ok(unknown_session(&request.header));
        };
        // The client has seen these responses and will not resend them
        entry.responses.retain(|sequence, cached| {
            *sequence > keep_alive.command_sequence || matches!(cached, Cached::Pending)
        });
        let header = ResponseHeader {
            session_id: request.header.session_id,
            index,
            ..Default::default()
        };
        Response::new(header, &KeepAliveResponse {})
    }

    fn close_session(&self, request: &Request) -> Result<Response> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.close_fails() {
            return Err(Error::rpc("injected close failure"));
        }
        let session_id = request.header.session_id;
        let index = {
            let mut state = self.state.lock();
            state.end_session(session_id);
            state.index
        };
        self.changed.notify_waiters();
        let header = ResponseHeader {
            session_id,
            index,
            ..Default::default()
        };
        Response::new(header, &CloseSessionResponse {})
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn command(self: &Arc<Self>, request: &Request) -> Response {
        let deadline = Instant::now() + GAP_TIMEOUT;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let step = {
                let mut state = self.state.lock();
                match state.position(&request.header, Instant::now() >= deadline) {
                    Position::UnknownSession => Step::Done(unknown_session(&request.header)),
                    Position::Cached(response) => Step::Done(response),
                    Position::Wait => Step::Wait,
                    Position::Apply => self.apply(&mut state, request),
                }
            };
            match step {
                Step::Done(response) => return response,
                Step::Wait => {
                    let _ = tokio::time::timeout(WAIT_SLICE, notified).await;
                }
                Step::Deferred(deferred, header) => {
                    return self.complete_deferred(request, deferred, header).await;
                }
            }
        }
    }

    fn apply(self: &Arc<Self>, state: &mut ReplicaState, request: &Request) -> Step {
        let header = state.record(&request.header);
        let session = request.header.session_id;
        let mut ctx = Context::new(session, header.index);

        let result = match (&request.primitive, request.kind) {
            (Some(primitive), RequestKind::Command) => {
                ctx.write_locked = self.faults.take_write_lock();
                state.machine(primitive).get_mut().command(&mut ctx, request)
            }
            (Some(primitive), RequestKind::ClosePrimitive) => {
                state
                    .listeners
                    .retain(|l| !(l.session == session && &l.primitive == primitive));
                let released = match state.machines.get_mut(primitive) {
                    Some(machine) => machine.get_mut().release(&mut ctx),
                    None => Ok(()),
                };
                released.and_then(|()| encode(&ClosePrimitiveResponse {}))
            }
            (Some(primitive), RequestKind::Delete) => {
                state.machines.remove(primitive);
                state.listeners.retain(|l| &l.primitive != primitive);
                encode(&DeleteResponse {})
            }
            (None, _) => Err(Error::rpc("command without a primitive")),
            (Some(_), kind) => Err(Error::rpc(format!("{:?} is not a command", kind))),
        };

        if let Some(primitive) = &request.primitive {
            publish(&mut state.listeners, primitive, header.index, &ctx.events);
            self.arm_timers(primitive, &ctx.timers);
        }

        let step = match ctx.deferred.take() {
            Some(deferred) if result.is_ok() => {
                state.cache(&request.header, Cached::Pending);
                Step::Deferred(deferred, header)
            }
            _ => {
                let response = to_response(header, result);
                state.cache(&request.header, Cached::Ready(response.clone()));
                Step::Done(response)
            }
        };
        self.changed.notify_waiters();
        step
    }

    async fn complete_deferred(
        &self,
        request: &Request,
        deferred: oneshot::Receiver<Bytes>,
        header: ResponseHeader,
    ) -> Response {
        let result = deferred
            .await
            .map_err(|_| Error::rpc("request abandoned"));
        let response = to_response(header, result);
        self.state
            .lock()
            .cache(&request.header, Cached::Ready(response.clone()));
        self.changed.notify_waiters();
        response
    }

    fn arm_timers(self: &Arc<Self>, primitive: &PrimitiveId, timers: &[(u64, Duration)]) {
        for &(waiter, delay) in timers {
            let replica = Arc::clone(self);
            let primitive = primitive.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(Machine::Lock(lock)) = replica.state.lock().machines.get_mut(&primitive) {
                    lock.expire(waiter);
                }
            });
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Wait until the session's last issued command has been applied
    async fn wait_for_commands(&self, header: &RequestHeader) {
        let deadline = Instant::now() + GAP_TIMEOUT;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let caught_up = self
                .state
                .lock()
                .sessions
                .get(&header.session_id)
                .map_or(true, |entry| entry.last_applied >= header.sequence_number);
            if caught_up || Instant::now() >= deadline {
                return;
            }
            let _ = tokio::time::timeout(WAIT_SLICE, notified).await;
        }
    }

    async fn query(&self, request: &Request) -> Response {
        self.wait_for_commands(&request.header).await;
        let state = self.state.lock();
        if !state.sessions.contains_key(&request.header.session_id) {
            return unknown_session(&request.header);
        }
        let header = ResponseHeader {
            session_id: request.header.session_id,
            index: state.index,
            ..Default::default()
        };
        let result = match &request.primitive {
            Some(primitive) => match state.machines.get(primitive) {
                Some(machine) => machine.get().query(request),
                None => Machine::new(primitive.primitive_type).get().query(request),
            },
            None => Err(Error::rpc("query without a primitive")),
        };
        to_response(header, result)
    }

    async fn query_stream(&self, request: &Request) -> ResponseReceiver {
        self.wait_for_commands(&request.header).await;
        let responses = {
            let state = self.state.lock();
            if !state.sessions.contains_key(&request.header.session_id) {
                vec![unknown_session(&request.header)]
            } else {
                let header = ResponseHeader {
                    session_id: request.header.session_id,
                    index: state.index,
                    ..Default::default()
                };
                let items = match &request.primitive {
                    Some(primitive) => match state.machines.get(primitive) {
                        Some(machine) => machine.get().iterate(request),
                        None => Machine::new(primitive.primitive_type).get().iterate(request),
                    },
                    None => Err(Error::rpc("stream without a primitive")),
                };
                match items {
                    Ok(items) => std::iter::once(Response::stream_open(header.clone()))
                        .chain(items.into_iter().map(|payload| Response {
                            header: header.clone(),
                            kind: ResponseKind::Response,
                            payload,
                        }))
                        .collect(),
                    Err(e) => vec![to_response(header, Err(e))],
                }
            }
        };

        let (tx, rx) = mpsc::channel(responses.len().max(1));
        for response in responses {
            let _ = tx.try_send(Ok(response));
        }
        rx
    }

    // ------------------------------------------------------------------------
    // Watches
    // ------------------------------------------------------------------------

    async fn watch(self: &Arc<Self>, request: &Request) -> ResponseReceiver {
        let deadline = Instant::now() + GAP_TIMEOUT;
        let source = loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let registered = {
                let mut state = self.state.lock();
                match state.position(&request.header, Instant::now() >= deadline) {
                    Position::UnknownSession => {
                        let (tx, rx) = mpsc::unbounded_channel();
                        let _ = tx.send(Ok(unknown_session(&request.header)));
                        Some(rx)
                    }
                    Position::Cached(ack) => Some(self.register(&mut state, request, ack)),
                    Position::Wait => None,
                    Position::Apply => {
                        let header = state.record(&request.header);
                        let ack = Response::stream_open(header);
                        state.cache(&request.header, Cached::Ready(ack.clone()));
                        let rx = self.register(&mut state, request, ack);
                        self.changed.notify_waiters();
                        Some(rx)
                    }
                }
            };
            match registered {
                Some(source) => break source,
                None => {
                    let _ = tokio::time::timeout(WAIT_SLICE, notified).await;
                }
            }
        };
        pump(source)
    }

    /// Add a listener; the acknowledgement and any replayed state go first
    fn register(
        &self,
        state: &mut ReplicaState,
        request: &Request,
        ack: Response,
    ) -> mpsc::UnboundedReceiver<Result<Response>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let header = ack.header.clone();
        let _ = tx.send(Ok(ack));
        let Some(primitive) = request.primitive.clone() else {
            return rx;
        };

        let replay = request
            .decode::<WatchFlags>()
            .map(|flags| flags.replay)
            .unwrap_or(false);
        if replay {
            let events = state.machine(&primitive).get().replay();
            match events {
                Ok(events) => {
                    for payload in events {
                        let _ = tx.send(Ok(Response {
                            header: header.clone(),
                            kind: ResponseKind::Response,
                            payload,
                        }));
                    }
                }
                Err(e) => {
                    let _ = tx.send(Ok(to_response(header, Err(e))));
                    return rx;
                }
            }
        }

        state.listeners.push(Listener {
            session: request.header.session_id,
            primitive,
            tx,
        });
        rx
    }
}

/// Move listener output onto a bounded stream channel
fn pump(mut source: mpsc::UnboundedReceiver<Result<Response>>) -> ResponseReceiver {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(async move {
        while let Some(item) = source.recv().await {
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });
    rx
}
