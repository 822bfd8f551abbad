//! TCP transport
//!
//! One multiplexed connection per partition. Callers push frames onto an
//! mpsc queue drained by a writer task; a reader task routes incoming frames
//! by correlation ID to the waiting caller, a oneshot for unary calls and an
//! unbounded hand-off for streams. The reader never waits on a consumer: each
//! stream has its own pump task draining the hand-off into the bounded
//! channel the session reads, so an idle watch cannot stall unary traffic on
//! the connection. When the connection drops, every waiter fails with a
//! `Connection` error and the transport reports itself unhealthy.

use crate::transport::{Connector, ResponseReceiver, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_core::{Address, Error, Partition, Result};
use strata_protocol::{Frame, FrameCodec, Request, Response};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outgoing frame queue capacity per connection (backpressure control)
const REQUEST_CHANNEL_BUFFER: usize = 256;

/// Default per-stream delivery buffer
const DEFAULT_STREAM_BUFFER: usize = 64;

/// Connects to partitions over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    stream_buffer: usize,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl TcpConnector {
    /// Create a connector with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound how long a connect may take
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Per-stream delivery buffer between the reader task and the session
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, partition: &Partition) -> Result<Arc<dyn Transport>> {
        let transport =
            TcpTransport::connect(&partition.address, self.connect_timeout, self.stream_buffer)
                .await?;
        Ok(Arc::new(transport))
    }
}

/// Caller waiting for frames with a given correlation ID
enum Waiter {
    Unary(oneshot::Sender<Result<Response>>),
    Stream(mpsc::UnboundedSender<Result<Response>>),
}

type PendingMap = DashMap<u64, Waiter>;

/// Removes a unary waiter if the caller gives up before the response
struct PendingGuard {
    pending: Arc<PendingMap>,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// Multiplexed TCP connection to one partition
pub struct TcpTransport {
    address: Address,
    next_id: AtomicU64,
    pending: Arc<PendingMap>,
    outgoing: mpsc::Sender<Frame>,
    healthy: Arc<AtomicBool>,
    stream_buffer: usize,
    writer_handle: JoinHandle<()>,
    reader_handle: JoinHandle<()>,
}

impl TcpTransport {
    /// Connect and spawn the writer and reader tasks
    pub async fn connect(
        address: &Address,
        timeout: Duration,
        stream_buffer: usize,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address.as_str()))
            .await
            .map_err(|_| Error::timeout(format!("connect to {}", address), timeout))?
            .map_err(|e| Error::connection(address.as_str(), e.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|e| Error::connection(address.as_str(), e.to_string()))?;

        let (read_half, write_half) = stream.into_split();
        let pending: Arc<PendingMap> = Arc::new(DashMap::new());
        let healthy = Arc::new(AtomicBool::new(true));
        let (outgoing, mut queue) = mpsc::channel::<Frame>(REQUEST_CHANNEL_BUFFER);

        let writer_handle = {
            let pending = pending.clone();
            let healthy = healthy.clone();
            let address = address.clone();
            tokio::spawn(async move {
                let mut sink = FramedWrite::new(write_half, FrameCodec::new());
                while let Some(frame) = queue.recv().await {
                    if let Err(e) = sink.send(frame).await {
                        debug!(address = %address, error = %e, "Writer task failed");
                        break;
                    }
                }
                healthy.store(false, Ordering::Release);
                fail_all(&pending, &address);
            })
        };

        let reader_handle = {
            let pending = pending.clone();
            let healthy = healthy.clone();
            let address = address.clone();
            tokio::spawn(async move {
                let mut source = FramedRead::new(read_half, FrameCodec::new());
                while let Some(frame) = source.next().await {
                    match frame {
                        Ok(frame) => route(&pending, frame),
                        Err(e) => {
                            debug!(address = %address, error = %e, "Reader task failed");
                            break;
                        }
                    }
                }
                healthy.store(false, Ordering::Release);
                fail_all(&pending, &address);
            })
        };

        debug!(address = %address, "Connected");
        Ok(Self {
            address: address.clone(),
            next_id: AtomicU64::new(1),
            pending,
            outgoing,
            healthy,
            stream_buffer: stream_buffer.max(1),
            writer_handle,
            reader_handle,
        })
    }

    /// Remote address
    pub fn address(&self) -> &Address {
        &self.address
    }

    fn closed_error(&self) -> Error {
        Error::connection(self.address.as_str(), "connection closed")
    }

    async fn submit(&self, id: u64, waiter: Waiter, frame: Frame) -> Result<()> {
        if !self.is_healthy() {
            return Err(self.closed_error());
        }
        self.pending.insert(id, waiter);
        // The reader may have failed the waiters between the check and the insert
        if !self.is_healthy() || self.outgoing.send(frame).await.is_err() {
            self.pending.remove(&id);
            return Err(self.closed_error());
        }
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.writer_handle.abort();
        self.reader_handle.abort();
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn unary(&self, request: Request) -> Result<Response> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let _guard = PendingGuard {
            pending: self.pending.clone(),
            id,
        };
        let frame = Frame::Request {
            id,
            stream: false,
            request,
        };
        self.submit(id, Waiter::Unary(tx), frame).await?;
        rx.await.map_err(|_| self.closed_error())?
    }

    async fn stream(&self, request: Request) -> Result<ResponseReceiver> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (handoff, mut incoming) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(self.stream_buffer);
        let frame = Frame::Request {
            id,
            stream: true,
            request,
        };
        self.submit(id, Waiter::Stream(handoff), frame).await?;

        // Ends when the stream ends or the consumer drops its receiver; the
        // reader then finds the hand-off closed and forgets the stream
        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = tx.closed() => break,
                    item = incoming.recv() => item,
                };
                match item {
                    Some(item) => {
                        if tx.send(item).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });
        Ok(rx)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }
}

/// Deliver an incoming frame to its waiter without waiting on it
fn route(pending: &PendingMap, frame: Frame) {
    match frame {
        Frame::Response { id, response } => match pending.remove(&id) {
            Some((_, Waiter::Unary(tx))) => {
                let _ = tx.send(Ok(response));
            }
            Some((_, Waiter::Stream(tx))) => {
                let _ = tx.send(Ok(response));
            }
            None => debug!(id, "Response for unknown request"),
        },
        Frame::StreamItem { id, response } => {
            let delivered = match pending.get(&id).as_deref() {
                Some(Waiter::Stream(tx)) => tx.send(Ok(response)).is_ok(),
                _ => return,
            };
            if !delivered {
                pending.remove(&id);
            }
        }
        Frame::StreamEnd { id } => {
            pending.remove(&id);
        }
        Frame::Failure { id, reason } => match pending.remove(&id) {
            Some((_, Waiter::Unary(tx))) => {
                let _ = tx.send(Err(Error::rpc(reason)));
            }
            Some((_, Waiter::Stream(tx))) => {
                let _ = tx.send(Err(Error::rpc(reason)));
            }
            None => {}
        },
        Frame::Request { id, .. } => warn!(id, "Ignoring request frame from server"),
    }
}

/// Fail every waiter after the connection is lost
fn fail_all(pending: &PendingMap, address: &Address) {
    let ids: Vec<u64> = pending.iter().map(|entry| *entry.key()).collect();
    for id in ids {
        let error = Error::connection(address.as_str(), "connection closed");
        match pending.remove(&id) {
            Some((_, Waiter::Unary(tx))) => {
                let _ = tx.send(Err(error));
            }
            Some((_, Waiter::Stream(tx))) => {
                let _ = tx.send(Err(error));
            }
            None => {}
        }
    }
}
