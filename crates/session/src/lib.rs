//! Partition sessions for the Strata client
//!
//! A [`Session`] turns unreliable point-to-point RPCs against one partition
//! into exactly-once commands, read-your-writes queries and server-push
//! streams. Sessions talk to partitions through the [`Transport`] seam;
//! [`TcpConnector`] provides the network implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod retry;
pub mod session;
pub mod stream;
pub mod tcp;
pub mod transport;

pub use config::SessionConfig;
pub use retry::RetryPolicy;
pub use session::Session;
pub use stream::ResponseStream;
pub use tcp::{TcpConnector, TcpTransport};
pub use transport::{Connector, ResponseReceiver, Transport};
