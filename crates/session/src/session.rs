//! Partition session
//!
//! A [`Session`] owns one server-registered session against one partition.
//!
//! ## Sequencing
//!
//! Every command (including primitive close and delete) takes the next
//! value of a single atomic counter at send time, so concurrent callers
//! still produce a total order. A command that fails with a transient
//! transport error is resent with the number it was first given; the
//! partition applies each number once and answers duplicates from its
//! response cache. If the connection was lost, the resend goes out on a
//! new one from the session's connector.
//!
//! Numbering and sending run on a spawned task. A caller that stops
//! waiting does not withdraw a numbered command.
//!
//! Queries take no number. Their header carries the last issued command
//! sequence and the highest index seen, and the partition holds the query
//! until its state has caught up (read-your-writes).
//!
//! ## Streams
//!
//! Stream calls return once the partition has acknowledged registration.
//! A dedicated forwarding task then owns the stream's receive loop and the
//! only sender of the output channel; it stops on stream end, the first
//! error, or when the consumer drops the stream.
//!
//! ## Lifecycle
//!
//! A keep-alive task pings the partition every `timeout / 2`. When the
//! partition no longer knows the session, or after [`Session::close`],
//! every operation fails with `SessionExpired`.

use crate::config::SessionConfig;
use crate::stream::ResponseStream;
use crate::transport::{Connector, ResponseReceiver, Transport};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_core::{
    Error, Partition, PrimitiveId, RequestHeader, ResponseHeader, Result, SessionId,
};
use strata_protocol::session::{
    ClosePrimitiveRequest, CloseSessionRequest, DeleteRequest, KeepAliveRequest,
    OpenSessionRequest, OpenSessionResponse,
};
use strata_protocol::{Operation, Request, RequestKind, Response, ResponseKind};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// ============================================================================
// Shared state
// ============================================================================

/// Counters shared with the keep-alive and stream forwarding tasks
#[derive(Debug, Default)]
struct SessionState {
    /// Last command sequence number handed out
    command_sequence: AtomicU64,
    /// Highest command sequence number with a response
    response_sequence: AtomicU64,
    /// Highest state-machine index observed
    last_index: AtomicU64,
    open: AtomicBool,
}

impl SessionState {
    fn next_sequence(&self) -> u64 {
        self.command_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn observe(&self, header: &ResponseHeader) {
        self.last_index.fetch_max(header.index, Ordering::AcqRel);
    }

    fn record_command(&self, sequence: u64, header: &ResponseHeader) {
        self.response_sequence.fetch_max(sequence, Ordering::AcqRel);
        self.observe(header);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Mark closed; returns whether the session was open
    fn shut(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

/// A stream forwarding task registered with the session
struct ActiveStream {
    primitive: PrimitiveId,
    handle: AbortHandle,
}

type StreamRegistry = Arc<Mutex<HashMap<u64, ActiveStream>>>;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Link
// ============================================================================

/// The session's connection to its partition, shared with background tasks
///
/// The transport sits in a swappable slot: a resend after the connection
/// was lost first connects again, then sends the unchanged request.
struct Link {
    partition: Partition,
    session_id: SessionId,
    connector: Arc<dyn Connector>,
    transport: RwLock<Arc<dyn Transport>>,
    /// Serializes reconnects so one lost connection is replaced once
    reconnecting: tokio::sync::Mutex<()>,
    config: SessionConfig,
    state: SessionState,
}

impl Link {
    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.read().clone()
    }

    fn command_header(&self, sequence: u64) -> RequestHeader {
        RequestHeader {
            partition: self.partition.id.as_u32(),
            session_id: self.session_id,
            sequence_number: sequence,
            index: self.state.last_index.load(Ordering::Acquire),
        }
    }

    fn query_header(&self) -> RequestHeader {
        self.command_header(self.state.command_sequence.load(Ordering::Acquire))
    }

    /// Convert a session-level failure, expiring the session if needed
    fn check(&self, header: &ResponseHeader) -> Result<()> {
        header.check().map_err(|e| {
            if e.is_session_expired() {
                self.state.shut();
            }
            e
        })
    }

    /// Replace `failed` with a fresh transport if it is no longer usable
    async fn reconnect(&self, failed: &Arc<dyn Transport>) -> Result<()> {
        if failed.is_healthy() {
            return Ok(());
        }
        let _guard = self.reconnecting.lock().await;
        if !same_transport(&self.transport(), failed) {
            // Another caller already replaced it
            return Ok(());
        }
        let transport = self.connector.connect(&self.partition).await?;
        *self.transport.write() = transport;
        info!(
            partition = self.partition.id.as_u32(),
            session_id = %self.session_id,
            "Reconnected"
        );
        Ok(())
    }

    /// Back off, then make sure the next attempt has a live transport
    async fn prepare_resend(&self, failed: &Arc<dyn Transport>, attempt: usize) {
        tokio::time::sleep(self.config.retry.jittered_delay(attempt)).await;
        if let Err(e) = self.reconnect(failed).await {
            debug!(
                partition = self.partition.id.as_u32(),
                session_id = %self.session_id,
                error = %e,
                "Reconnect failed"
            );
        }
    }

    /// Send a unary request, resending it unchanged on transient failure
    async fn send(&self, request: Request) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let transport = self.transport();
            let result = call_unary(
                transport.as_ref(),
                request.clone(),
                self.config.request_timeout,
                &request.method,
            )
            .await
            .and_then(|response| {
                self.check(&response.header)?;
                Ok(response)
            });
            match result {
                Err(e) if e.is_retryable() && attempt < self.config.retry.max_retries => {
                    debug!(
                        partition = self.partition.id.as_u32(),
                        session_id = %self.session_id,
                        sequence = request.header.sequence_number,
                        attempt,
                        error = %e,
                        "Resending request"
                    );
                    self.prepare_resend(&transport, attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Number a command and send it until it is answered or fails for good
    async fn command(&self, mut request: Request) -> Result<(u64, Response)> {
        let sequence = self.state.next_sequence();
        request.header = self.command_header(sequence);
        let response = self.send(request).await?;
        self.state.record_command(sequence, &response.header);
        Ok((sequence, response))
    }

    /// Open a transport stream and wait for its acknowledgement
    async fn start_stream(&self, request: Request) -> Result<(ResponseReceiver, ResponseHeader)> {
        let mut attempt = 0;
        loop {
            let transport = self.transport();
            match self.try_start_stream(transport.as_ref(), request.clone()).await {
                Err(e) if e.is_retryable() && attempt < self.config.retry.max_retries => {
                    debug!(
                        partition = self.partition.id.as_u32(),
                        session_id = %self.session_id,
                        attempt,
                        error = %e,
                        "Reopening stream"
                    );
                    self.prepare_resend(&transport, attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_start_stream(
        &self,
        transport: &dyn Transport,
        request: Request,
    ) -> Result<(ResponseReceiver, ResponseHeader)> {
        let timeout = self.config.request_timeout;
        let operation = format!("{} stream", request.method);
        let mut receiver = tokio::time::timeout(timeout, transport.stream(request))
            .await
            .map_err(|_| Error::timeout(operation.as_str(), timeout))??;
        let ack = tokio::time::timeout(timeout, receiver.recv())
            .await
            .map_err(|_| Error::timeout(operation.as_str(), timeout))?
            .ok_or_else(|| Error::rpc(format!("{} closed before acknowledgement", operation)))??;
        self.check(&ack.header)?;
        if ack.kind != ResponseKind::StreamOpen {
            return Err(Error::rpc(format!("{} was not acknowledged", operation)));
        }
        Ok((receiver, ack.header))
    }
}

fn same_transport(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Run `work` on its own task
///
/// Dropping the returned future abandons only the wait: a request that has
/// taken a sequence number is still delivered, so the partition never sees
/// a gap left by a cancelled caller.
async fn detached<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| Error::rpc(format!("request task failed: {}", e)))?
}

// ============================================================================
// Session
// ============================================================================

/// One logical session against one partition
pub struct Session {
    link: Arc<Link>,
    streams: StreamRegistry,
    next_stream: AtomicU64,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("partition", &self.link.partition)
            .field("session_id", &self.link.session_id)
            .field("open", &self.link.state.is_open())
            .finish()
    }
}

impl Session {
    /// Connect to the partition and register a new session.
    ///
    /// Transient connection failures are retried up to
    /// `config.open_attempts` times. Each successful registration creates
    /// new server-side state. The session keeps a copy of `connector` to
    /// replace a lost connection.
    ///
    /// # Errors
    ///
    /// `Connection` or `Timeout` when every attempt failed; any other error
    /// from the partition immediately.
    pub async fn open<C>(partition: Partition, connector: &C, config: SessionConfig) -> Result<Self>
    where
        C: Connector + Clone,
    {
        let connector: Arc<dyn Connector> = Arc::new(connector.clone());
        let attempts = config.open_attempts.max(1);
        let mut attempt = 0;
        loop {
            match Self::register(&partition, &connector, &config).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    debug!(
                        partition = partition.id.as_u32(),
                        attempt,
                        error = %e,
                        "Session open failed, retrying"
                    );
                    tokio::time::sleep(config.retry.jittered_delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn register(
        partition: &Partition,
        connector: &Arc<dyn Connector>,
        config: &SessionConfig,
    ) -> Result<Self> {
        let transport = connector.connect(partition).await?;
        let header = RequestHeader {
            partition: partition.id.as_u32(),
            ..Default::default()
        };
        let request = Request::new(
            RequestKind::OpenSession,
            header,
            None,
            &OpenSessionRequest {
                timeout_ms: millis(config.timeout),
            },
        )?;
        let response = call_unary(
            transport.as_ref(),
            request,
            config.request_timeout,
            "OpenSession",
        )
        .await?;
        response.header.check()?;
        let opened: OpenSessionResponse = response.decode()?;

        let state = SessionState::default();
        state.observe(&response.header);
        state.open.store(true, Ordering::Release);

        let session = Self {
            link: Arc::new(Link {
                partition: partition.clone(),
                session_id: opened.session_id,
                connector: connector.clone(),
                transport: RwLock::new(transport),
                reconnecting: tokio::sync::Mutex::new(()),
                config: config.clone(),
                state,
            }),
            streams: Arc::new(Mutex::new(HashMap::new())),
            next_stream: AtomicU64::new(1),
            keep_alive: Mutex::new(None),
        };
        session.start_keep_alive();

        info!(
            partition = partition.id.as_u32(),
            session_id = %opened.session_id,
            timeout_ms = millis(config.timeout),
            "Session opened"
        );
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Partition this session is bound to
    pub fn partition(&self) -> &Partition {
        &self.link.partition
    }

    /// Server-assigned session ID
    pub fn session_id(&self) -> SessionId {
        self.link.session_id
    }

    /// Last command sequence number handed out
    pub fn command_sequence(&self) -> u64 {
        self.link.state.command_sequence.load(Ordering::Acquire)
    }

    /// Whether the session is usable
    pub fn is_open(&self) -> bool {
        self.link.state.is_open()
    }

    /// Number of stream forwarding tasks still running
    pub fn active_streams(&self) -> usize {
        self.streams.lock().len()
    }

    /// Session settings
    pub fn config(&self) -> &SessionConfig {
        &self.link.config
    }

    // ------------------------------------------------------------------------
    // Commands and queries
    // ------------------------------------------------------------------------

    /// Run a state-machine command exactly once
    ///
    /// Cancelling the returned future (e.g. with a caller-side timeout)
    /// stops the wait, not the command: once numbered it is still sent.
    pub async fn command<O: Operation>(
        &self,
        primitive: &PrimitiveId,
        operation: O,
    ) -> Result<O::Output> {
        self.sequenced(RequestKind::Command, primitive, &operation)
            .await
    }

    /// Run a read against state at least as fresh as the last command
    pub async fn query<O: Operation>(
        &self,
        primitive: &PrimitiveId,
        operation: O,
    ) -> Result<O::Output> {
        self.ensure_open()?;
        let request = Request::new(
            RequestKind::Query,
            self.link.query_header(),
            Some(primitive.clone()),
            &operation,
        )?;
        debug!(
            partition = self.link.partition.id.as_u32(),
            session_id = %self.link.session_id,
            primitive = %primitive,
            method = O::METHOD,
            "Query"
        );
        let response = self.send(request).await?;
        self.link.state.observe(&response.header);
        response.decode()
    }

    /// Open a command stream (e.g. a watch)
    ///
    /// Registration is sequenced like any command. Returns once the
    /// partition has acknowledged the stream.
    pub async fn command_stream<O: Operation>(
        &self,
        primitive: &PrimitiveId,
        operation: O,
    ) -> Result<ResponseStream<O::Output>> {
        self.ensure_open()?;
        let request = Request::new(
            RequestKind::Command,
            RequestHeader::default(),
            Some(primitive.clone()),
            &operation,
        )?;
        debug!(
            partition = self.link.partition.id.as_u32(),
            session_id = %self.link.session_id,
            primitive = %primitive,
            method = O::METHOD,
            "Command stream"
        );
        let link = self.link.clone();
        let receiver = detached(async move {
            let mut request = request;
            let sequence = link.state.next_sequence();
            request.header = link.command_header(sequence);
            let (receiver, ack) = link.start_stream(request).await?;
            link.state.record_command(sequence, &ack);
            Ok(receiver)
        })
        .await?;
        Ok(self.forward(primitive, receiver))
    }

    /// Open a query stream (e.g. iterating elements)
    pub async fn query_stream<O: Operation>(
        &self,
        primitive: &PrimitiveId,
        operation: O,
    ) -> Result<ResponseStream<O::Output>> {
        self.ensure_open()?;
        let request = Request::new(
            RequestKind::Query,
            self.link.query_header(),
            Some(primitive.clone()),
            &operation,
        )?;
        let (receiver, ack) = self.link.start_stream(request).await?;
        self.link.state.observe(&ack);
        Ok(self.forward(primitive, receiver))
    }

    // ------------------------------------------------------------------------
    // Primitive and session lifecycle
    // ------------------------------------------------------------------------

    /// Release the primitive's resources held by this session.
    ///
    /// Ends this session's streams for the primitive and, on the partition,
    /// its watches, held locks and candidacies. The session stays open.
    pub async fn close_primitive(&self, primitive: &PrimitiveId) -> Result<()> {
        self.abort_streams(primitive);
        self.sequenced(RequestKind::ClosePrimitive, primitive, &ClosePrimitiveRequest {})
            .await?;
        Ok(())
    }

    /// Destroy the primitive's state on the partition
    pub async fn delete(&self, primitive: &PrimitiveId) -> Result<()> {
        self.abort_streams(primitive);
        self.sequenced(RequestKind::Delete, primitive, &DeleteRequest {})
            .await?;
        Ok(())
    }

    /// End the session.
    ///
    /// Idempotent: only the first call contacts the partition. Afterwards
    /// every operation fails with `SessionExpired`.
    pub async fn close(&self) -> Result<()> {
        if !self.link.state.shut() {
            return Ok(());
        }
        self.stop_tasks();

        let request = Request::new(
            RequestKind::CloseSession,
            self.link.query_header(),
            None,
            &CloseSessionRequest {},
        )?;
        let partition = self.link.partition.id.as_u32();
        let session_id = self.link.session_id;
        match self.send(request).await {
            Ok(_) => {
                info!(partition, session_id = %session_id, "Session closed");
                Ok(())
            }
            Err(e) => {
                warn!(partition, session_id = %session_id, error = %e, "Session close failed");
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_open(&self) -> Result<()> {
        if self.link.state.is_open() {
            Ok(())
        } else {
            Err(Error::SessionExpired {
                session_id: self.link.session_id.0,
            })
        }
    }

    async fn sequenced<O: Operation>(
        &self,
        kind: RequestKind,
        primitive: &PrimitiveId,
        operation: &O,
    ) -> Result<O::Output> {
        self.ensure_open()?;
        // Encode before taking a number so a bad payload never leaves a gap
        let request = Request::new(
            kind,
            RequestHeader::default(),
            Some(primitive.clone()),
            operation,
        )?;
        debug!(
            partition = self.link.partition.id.as_u32(),
            session_id = %self.link.session_id,
            primitive = %primitive,
            method = O::METHOD,
            "Sequencing command"
        );
        let link = self.link.clone();
        let (_, response) = detached(async move { link.command(request).await }).await?;
        response.decode()
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let link = self.link.clone();
        detached(async move { link.send(request).await }).await
    }

    /// Spawn the forwarding task that owns the stream's receive loop
    fn forward<T>(&self, primitive: &PrimitiveId, mut receiver: ResponseReceiver) -> ResponseStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.link.config.stream_buffer.max(1));
        let stream_id = self.next_stream.fetch_add(1, Ordering::Relaxed);
        let link = self.link.clone();
        let streams = self.streams.clone();

        // Held across spawn so the task cannot deregister before it is registered
        let mut registry = self.streams.lock();
        let handle = tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = tx.closed() => break,
                    item = receiver.recv() => item,
                };
                let result = match item {
                    None => break,
                    Some(Err(e)) => Err(e),
                    Some(Ok(response)) => response.header.check().and_then(|()| {
                        link.state.observe(&response.header);
                        response.decode::<T>()
                    }),
                };
                let failed = match &result {
                    Ok(_) => false,
                    Err(e) => {
                        if e.is_session_expired() {
                            link.state.shut();
                        }
                        true
                    }
                };
                if tx.send(result).await.is_err() || failed {
                    break;
                }
            }
            streams.lock().remove(&stream_id);
        });
        registry.insert(
            stream_id,
            ActiveStream {
                primitive: primitive.clone(),
                handle: handle.abort_handle(),
            },
        );
        drop(registry);

        ResponseStream::new(rx)
    }

    fn abort_streams(&self, primitive: &PrimitiveId) {
        self.streams.lock().retain(|_, stream| {
            if &stream.primitive == primitive {
                stream.handle.abort();
                false
            } else {
                true
            }
        });
    }

    fn stop_tasks(&self) {
        if let Some(handle) = self.keep_alive.lock().take() {
            handle.abort();
        }
        for (_, stream) in self.streams.lock().drain() {
            stream.handle.abort();
        }
    }

    fn start_keep_alive(&self) {
        let link = self.link.clone();
        let interval = self.link.config.keep_alive_interval();

        let handle = tokio::spawn(async move {
            let partition = link.partition.id.as_u32();
            let session_id = link.session_id;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !link.state.is_open() {
                    break;
                }
                let acknowledged = link.state.response_sequence.load(Ordering::Acquire);
                let request = match Request::new(
                    RequestKind::KeepAlive,
                    link.command_header(acknowledged),
                    None,
                    &KeepAliveRequest {
                        command_sequence: acknowledged,
                    },
                ) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!(partition, session_id = %session_id, error = %e, "Keep-alive encoding failed");
                        break;
                    }
                };
                let transport = link.transport();
                let result = call_unary(
                    transport.as_ref(),
                    request,
                    link.config.request_timeout,
                    "KeepAlive",
                )
                .await
                .and_then(|response| link.check(&response.header));
                match result {
                    Ok(()) => {}
                    Err(e) if e.is_session_expired() => {
                        warn!(partition, session_id = %session_id, "Session expired");
                        break;
                    }
                    Err(e) => {
                        warn!(partition, session_id = %session_id, error = %e, "Keep-alive failed");
                        if e.is_retryable() {
                            // The next tick goes out on a fresh connection
                            if let Err(e) = link.reconnect(&transport).await {
                                debug!(partition, session_id = %session_id, error = %e, "Reconnect failed");
                            }
                        }
                    }
                }
            }
        });
        *self.keep_alive.lock() = Some(handle);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

/// One transport round trip bounded by the request timeout
async fn call_unary(
    transport: &dyn Transport,
    request: Request,
    timeout: Duration,
    operation: &str,
) -> Result<Response> {
    tokio::time::timeout(timeout, transport.unary(request))
        .await
        .map_err(|_| Error::timeout(operation, timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::AtomicUsize;
    use strata_core::{Address, Name, PartitionId, PrimitiveType, ServerError};
    use strata_protocol::counter::{IncrementRequest, IncrementResponse};
    use strata_protocol::session::KeepAliveResponse;
    use strata_protocol::set::{EventRequest, EventResponse, EventType};

    /// Scripted transport recording every request it sees
    #[derive(Default)]
    struct ScriptedTransport {
        requests: Mutex<Vec<Request>>,
        /// Fail this many unary calls with a connection error first
        fail_next: AtomicUsize,
        /// Reply to keep-alives with UnknownSession
        forget_session: AtomicBool,
        /// Connection lost: every call fails and the transport is unhealthy
        broken: AtomicBool,
    }

    impl ScriptedTransport {
        fn header(request: &Request) -> ResponseHeader {
            ResponseHeader {
                session_id: SessionId(7),
                index: request.header.sequence_number,
                sequence_number: request.header.sequence_number,
                error: None,
            }
        }

        fn sequences(&self, kind: RequestKind) -> Vec<u64> {
            self.requests
                .lock()
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| r.header.sequence_number)
                .collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn unary(&self, request: Request) -> Result<Response> {
            self.requests.lock().push(request.clone());
            if self.broken.load(Ordering::SeqCst) {
                return Err(Error::connection("scripted", "reset"));
            }
            if self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::connection("scripted", "dropped"));
            }
            let mut header = Self::header(&request);
            match request.kind {
                RequestKind::OpenSession => Response::new(
                    header,
                    &OpenSessionResponse {
                        session_id: SessionId(7),
                    },
                ),
                RequestKind::KeepAlive => {
                    if self.forget_session.load(Ordering::SeqCst) {
                        header.error = Some(ServerError::UnknownSession);
                        Ok(Response::failure(header))
                    } else {
                        Response::new(header, &KeepAliveResponse {})
                    }
                }
                RequestKind::Command => Response::new(
                    header,
                    &IncrementResponse {
                        previous: 0,
                        next: 1,
                    },
                ),
                _ => Response::new(header, &()),
            }
        }

        async fn stream(&self, request: Request) -> Result<ResponseReceiver> {
            self.requests.lock().push(request.clone());
            let (tx, rx) = mpsc::channel(8);
            let header = Self::header(&request);
            tx.send(Ok(Response::stream_open(header.clone())))
                .await
                .unwrap();
            let event = EventResponse {
                r#type: EventType::Added,
                value: "a".to_string(),
            };
            tx.send(Response::new(header, &event)).await.unwrap();
            // Sender dropped here: the stream ends after one event
            Ok(rx)
        }

        fn is_healthy(&self) -> bool {
            !self.broken.load(Ordering::SeqCst)
        }
    }

    #[derive(Clone)]
    struct ScriptedConnector(Arc<ScriptedTransport>);

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self, _partition: &Partition) -> Result<Arc<dyn Transport>> {
            Ok(self.0.clone())
        }
    }

    /// Hands out a fresh transport on every connect
    #[derive(Clone, Default)]
    struct ReplacingConnector {
        issued: Arc<Mutex<Vec<Arc<ScriptedTransport>>>>,
    }

    #[async_trait]
    impl Connector for ReplacingConnector {
        async fn connect(&self, _partition: &Partition) -> Result<Arc<dyn Transport>> {
            let transport = Arc::new(ScriptedTransport::default());
            self.issued.lock().push(transport.clone());
            Ok(transport)
        }
    }

    fn partition() -> Partition {
        Partition::new(PartitionId::new(1).unwrap(), Address::from("scripted:1"))
    }

    fn counter_id() -> PrimitiveId {
        PrimitiveId::new(PrimitiveType::Counter, Name::new("ns", "db", "s", "c"))
    }

    fn fast_config() -> SessionConfig {
        SessionConfig::default()
            .with_request_timeout(Duration::from_millis(500))
            .with_retry(crate::RetryPolicy::new().with_base_delay_ms(1).with_max_delay_ms(2))
    }

    async fn open(transport: &Arc<ScriptedTransport>, config: SessionConfig) -> Session {
        Session::open(partition(), &ScriptedConnector(transport.clone()), config)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commands_take_increasing_sequence_numbers() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = open(&transport, fast_config()).await;
        assert_eq!(session.session_id(), SessionId(7));

        for _ in 0..5 {
            session
                .command(&counter_id(), IncrementRequest { delta: 1 })
                .await
                .unwrap();
        }
        assert_eq!(transport.sequences(RequestKind::Command), vec![1, 2, 3, 4, 5]);
        assert_eq!(session.command_sequence(), 5);
    }

    #[tokio::test]
    async fn test_resend_reuses_sequence_number() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = open(&transport, fast_config()).await;

        transport.fail_next.store(2, Ordering::SeqCst);
        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();
        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();
        assert_eq!(transport.sequences(RequestKind::Command), vec![1, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let transport = Arc::new(ScriptedTransport::default());
        let config = fast_config().with_retry(crate::RetryPolicy::no_retry());
        let session = open(&transport, config).await;

        transport.fail_next.store(1, Ordering::SeqCst);
        let err = session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[tokio::test]
    async fn test_query_carries_last_issued_sequence() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = open(&transport, fast_config()).await;
        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();
        let _ = session
            .query(&counter_id(), strata_protocol::counter::GetRequest {})
            .await;

        let requests = transport.requests.lock();
        let query = requests
            .iter()
            .find(|r| r.kind == RequestKind::Query)
            .unwrap();
        assert_eq!(query.header.sequence_number, 1);
        assert_eq!(query.header.index, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_expires_session() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = open(&transport, fast_config()).await;

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(!session.is_open());
        assert_eq!(transport.sequences(RequestKind::CloseSession).len(), 1);

        let err = session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap_err();
        assert!(err.is_session_expired());
    }

    #[tokio::test]
    async fn test_stream_forwards_items_then_closes() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = open(&transport, fast_config()).await;

        let stream = session
            .command_stream(&counter_id(), EventRequest { replay: false })
            .await
            .unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().value, "a");
        // Registration took a command sequence number
        assert_eq!(session.command_sequence(), 1);
    }

    #[tokio::test]
    async fn test_keep_alive_detects_unknown_session() {
        let transport = Arc::new(ScriptedTransport::default());
        let config = fast_config().with_timeout(Duration::from_millis(20));
        let session = open(&transport, config).await;

        transport.forget_session.store(true, Ordering::SeqCst);
        for _ in 0..100 {
            if !session.is_open() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!session.is_open());
        assert!(!transport.sequences(RequestKind::KeepAlive).is_empty());
    }

    #[tokio::test]
    async fn test_resend_after_reset_uses_new_connection() {
        let connector = ReplacingConnector::default();
        let session = Session::open(partition(), &connector, fast_config())
            .await
            .unwrap();
        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();

        let first = connector.issued.lock()[0].clone();
        first.broken.store(true, Ordering::SeqCst);
        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();

        let issued = connector.issued.lock().clone();
        assert_eq!(issued.len(), 2);
        assert_eq!(issued[0].sequences(RequestKind::Command), vec![1, 2]);
        // Same number on the new connection
        assert_eq!(issued[1].sequences(RequestKind::Command), vec![2]);
    }

    #[tokio::test]
    async fn test_healthy_transport_is_kept_on_resend() {
        let connector = ReplacingConnector::default();
        let session = Session::open(partition(), &connector, fast_config())
            .await
            .unwrap();

        connector.issued.lock()[0].fail_next.store(2, Ordering::SeqCst);
        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();
        assert_eq!(connector.issued.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_cancel_command() {
        let transport = Arc::new(ScriptedTransport::default());
        let config = fast_config().with_retry(
            crate::RetryPolicy::new()
                .with_base_delay_ms(100)
                .with_max_delay_ms(100),
        );
        let session = open(&transport, config).await;

        transport.fail_next.store(1, Ordering::SeqCst);
        let waited = tokio::time::timeout(
            Duration::from_millis(10),
            session.command(&counter_id(), IncrementRequest { delta: 1 }),
        )
        .await;
        assert!(waited.is_err());

        for _ in 0..100 {
            if transport.sequences(RequestKind::Command).len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(transport.sequences(RequestKind::Command), vec![1, 1]);

        session
            .command(&counter_id(), IncrementRequest { delta: 1 })
            .await
            .unwrap();
        assert_eq!(transport.sequences(RequestKind::Command), vec![1, 1, 2]);
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
