//! Transport seam between sessions and the network
//!
//! A [`Transport`] carries protocol requests to one partition and returns
//! its responses. It must tolerate concurrent use: every operation of a
//! session shares the same transport. A [`Connector`] produces transports
//! for partitions.

use async_trait::async_trait;
use std::sync::Arc;
use strata_core::{Partition, Result};
use strata_protocol::{Request, Response};
use tokio::sync::mpsc;

/// Receiving side of a server stream
///
/// The first item of a healthy stream is a `StreamOpen` acknowledgement.
/// The channel closes when the server ends the stream; a transport failure
/// is delivered as a final `Err` item.
pub type ResponseReceiver = mpsc::Receiver<Result<Response>>;

/// Request/response carrier for one partition
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a request and wait for its single response
    async fn unary(&self, request: Request) -> Result<Response>;

    /// Send a request and receive its responses as a stream
    async fn stream(&self, request: Request) -> Result<ResponseReceiver>;

    /// Whether the transport can still carry requests
    ///
    /// A session replaces an unhealthy transport before resending.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Factory of transports
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a transport to the partition's address
    async fn connect(&self, partition: &Partition) -> Result<Arc<dyn Transport>>;
}
