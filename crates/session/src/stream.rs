//! Lazily consumed response streams
//!
//! Every stream is fed by exactly one forwarding task, the only writer of
//! its channel. The task forwards at most one error and then closes the
//! channel, so a consumer sees items, optionally one `Err`, then the end.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use strata_core::Result;
use tokio::sync::mpsc;

/// Decoded items of a server stream
#[derive(Debug)]
pub struct ResponseStream<T> {
    receiver: mpsc::Receiver<Result<T>>,
}

impl<T> ResponseStream<T> {
    /// Wrap the receiving side of a forwarding task's channel
    pub fn new(receiver: mpsc::Receiver<Result<T>>) -> Self {
        Self { receiver }
    }

    /// Next item, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<Result<T>> {
        self.receiver.recv().await
    }

    /// Drain the stream, stopping at the first error
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.recv().await {
            items.push(item?);
        }
        Ok(items)
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
