//! Wire protocol for partition sessions
//!
//! This crate is the RPC surface shared by the client and any partition
//! server:
//! - [`message`]: the request/response envelope and transport frames
//! - [`codec`]: MessagePack payload encoding and length-delimited framing
//! - [`operation`]: the typed [`Operation`] trait binding a request type to
//!   its response type and method name
//! - [`session`]: session management messages
//! - one module per primitive with its request, response and event schemas

#![warn(clippy::all)]

pub mod codec;
pub mod message;
pub mod operation;
pub mod session;

pub mod counter;
pub mod election;
pub mod indexed_map;
pub mod leader;
pub mod list;
pub mod lock;
pub mod log;
pub mod map;
pub mod set;
pub mod value;

pub use codec::{decode, encode, FrameCodec, MAX_FRAME_SIZE};
pub use message::{Frame, Request, RequestKind, Response, ResponseKind};
pub use operation::{Operation, Replayable};
