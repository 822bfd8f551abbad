//! TCP front end for a replica
//!
//! Each accepted connection gets a writer task fed by an mpsc queue; every
//! request frame is served on its own task so slow calls (waiting commands,
//! lock waits, open watches) never block the connection.

use crate::replica::Replica;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use strata_protocol::{Frame, FrameCodec, Request};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

const RESPONSE_CHANNEL_BUFFER: usize = 256;

/// Serve a replica on a listener until the returned task is aborted
pub fn serve_tcp(listener: TcpListener, replica: Arc<Replica>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, peer)) => {
                    debug!(peer = %peer, "Accepted connection");
                    tokio::spawn(serve_connection(socket, Arc::clone(&replica)));
                }
                Err(e) => {
                    debug!(error = %e, "Accept failed");
                    break;
                }
            }
        }
    })
}

async fn serve_connection(socket: TcpStream, replica: Arc<Replica>) {
    let (read_half, write_half) = socket.into_split();
    let (outgoing, mut queue) = mpsc::channel::<Frame>(RESPONSE_CHANNEL_BUFFER);

    let writer = tokio::spawn(async move {
        let mut sink = FramedWrite::new(write_half, FrameCodec::new());
        while let Some(frame) = queue.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut source = FramedRead::new(read_half, FrameCodec::new());
    let mut calls = Vec::new();
    while let Some(Ok(frame)) = source.next().await {
        match frame {
            Frame::Request {
                id,
                stream,
                request,
            } => {
                let replica = Arc::clone(&replica);
                let outgoing = outgoing.clone();
                calls.push(tokio::spawn(async move {
                    if stream {
                        serve_stream(&replica, id, request, &outgoing).await;
                    } else {
                        serve_unary(&replica, id, request, &outgoing).await;
                    }
                }));
            }
            other => debug!(id = other.id(), "Ignoring non-request frame"),
        }
        calls.retain(|call| !call.is_finished());
    }

    // Client went away: stop its calls so their watches unregister
    for call in calls {
        call.abort();
    }
    drop(outgoing);
    let _ = writer.await;
}

async fn serve_unary(replica: &Arc<Replica>, id: u64, request: Request, out: &mpsc::Sender<Frame>) {
    let frame = match replica.unary(request).await {
        Ok(response) => Frame::Response { id, response },
        Err(e) => Frame::Failure {
            id,
            reason: e.to_string(),
        },
    };
    let _ = out.send(frame).await;
}

async fn serve_stream(replica: &Arc<Replica>, id: u64, request: Request, out: &mpsc::Sender<Frame>) {
    let mut receiver = match replica.stream(request).await {
        Ok(receiver) => receiver,
        Err(e) => {
            let _ = out
                .send(Frame::Failure {
                    id,
                    reason: e.to_string(),
                })
                .await;
            return;
        }
    };
    while let Some(item) = receiver.recv().await {
        let frame = match item {
            Ok(response) => Frame::StreamItem { id, response },
            Err(e) => Frame::Failure {
                id,
                reason: e.to_string(),
            },
        };
        if out.send(frame).await.is_err() {
            return;
        }
    }
    let _ = out.send(Frame::StreamEnd { id }).await;
}
