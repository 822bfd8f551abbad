//! Request/response envelope and transport frames
//!
//! A [`Request`] names what kind of call it is, carries the session header
//! and the target primitive, and holds the operation payload encoded with
//! [`crate::codec::encode`]. A [`Frame`] adds the transport correlation ID.
//!
//! Server streams answer one request with many responses: the first is a
//! [`ResponseKind::StreamOpen`] acknowledgement, followed by items and a
//! final [`Frame::StreamEnd`].

use crate::codec;
use crate::operation::Operation;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strata_core::{PrimitiveId, RequestHeader, ResponseHeader, Result};

/// What a request asks the partition to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Register a new session
    OpenSession,
    /// Keep a session alive
    KeepAlive,
    /// End a session
    CloseSession,
    /// Release a primitive's resources held by the session
    ClosePrimitive,
    /// Destroy a primitive's state
    Delete,
    /// Sequenced, deduplicated state-machine command
    Command,
    /// Read against the state machine
    Query,
}

/// A protocol request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request kind
    pub kind: RequestKind,
    /// Session metadata
    pub header: RequestHeader,
    /// Target primitive (absent for session management)
    pub primitive: Option<PrimitiveId>,
    /// Operation name
    pub method: String,
    /// Encoded operation
    pub payload: Bytes,
}

impl Request {
    /// Build a request carrying a typed operation
    pub fn new<O: Operation>(
        kind: RequestKind,
        header: RequestHeader,
        primitive: Option<PrimitiveId>,
        operation: &O,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            header,
            primitive,
            method: O::METHOD.to_string(),
            payload: codec::encode(operation)?,
        })
    }

    /// Decode the operation payload
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode(&self.payload)
    }
}

/// What a response carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// An operation result
    Response,
    /// Acknowledges that a stream has been registered
    StreamOpen,
}

/// A protocol response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Session metadata
    pub header: ResponseHeader,
    /// Response kind
    pub kind: ResponseKind,
    /// Encoded operation output (empty for `StreamOpen`)
    pub payload: Bytes,
}

impl Response {
    /// Build a response carrying a typed output
    pub fn new<T: Serialize>(header: ResponseHeader, output: &T) -> Result<Self> {
        Ok(Self {
            header,
            kind: ResponseKind::Response,
            payload: codec::encode(output)?,
        })
    }

    /// Header-only stream acknowledgement
    pub fn stream_open(header: ResponseHeader) -> Self {
        Self {
            header,
            kind: ResponseKind::StreamOpen,
            payload: Bytes::new(),
        }
    }

    /// Header-only failure response
    pub fn failure(header: ResponseHeader) -> Self {
        Self {
            header,
            kind: ResponseKind::Response,
            payload: Bytes::new(),
        }
    }

    /// Decode the payload
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode(&self.payload)
    }
}

/// Transport frame with correlation ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Client request; `stream` selects server-streaming semantics
    Request {
        /// Correlation ID
        id: u64,
        /// Whether many responses are expected
        stream: bool,
        /// The request
        request: Request,
    },
    /// Single response to a unary request
    Response {
        /// Correlation ID
        id: u64,
        /// The response
        response: Response,
    },
    /// One response of a server stream
    StreamItem {
        /// Correlation ID
        id: u64,
        /// The response
        response: Response,
    },
    /// Server closed the stream
    StreamEnd {
        /// Correlation ID
        id: u64,
    },
    /// The call failed before producing a response
    Failure {
        /// Correlation ID
        id: u64,
        /// Failure detail
        reason: String,
    },
}

impl Frame {
    /// Correlation ID of the frame
    pub fn id(&self) -> u64 {
        match self {
            Frame::Request { id, .. }
            | Frame::Response { id, .. }
            | Frame::StreamItem { id, .. }
            | Frame::StreamEnd { id }
            | Frame::Failure { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::{AddRequest, AddResponse};
    use strata_core::{Name, PrimitiveType, ResponseStatus, SessionId};

    #[test]
    fn test_request_carries_method_and_payload() {
        let id = PrimitiveId::new(PrimitiveType::Set, Name::new("ns", "db", "s", "set"));
        let header = RequestHeader {
            partition: 1,
            session_id: SessionId(3),
            sequence_number: 5,
            index: 0,
        };
        let request = Request::new(
            RequestKind::Command,
            header,
            Some(id),
            &AddRequest {
                value: "a".to_string(),
            },
        )
        .unwrap();

        assert_eq!(request.method, "Add");
        let decoded: AddRequest = request.decode().unwrap();
        assert_eq!(decoded.value, "a");
    }

    #[test]
    fn test_stream_open_has_empty_payload() {
        let response = Response::stream_open(ResponseHeader::default());
        assert_eq!(response.kind, ResponseKind::StreamOpen);
        assert!(response.payload.is_empty());
    }

    #[test]
    fn test_response_decode() {
        let response = Response::new(
            ResponseHeader::default(),
            &AddResponse {
                status: ResponseStatus::WriteLock,
                added: false,
            },
        )
        .unwrap();
        let decoded: AddResponse = response.decode().unwrap();
        assert_eq!(decoded.status, ResponseStatus::WriteLock);
    }

    #[test]
    fn test_frame_id() {
        assert_eq!(Frame::StreamEnd { id: 42 }.id(), 42);
        assert_eq!(
            Frame::Failure {
                id: 7,
                reason: "x".into()
            }
            .id(),
            7
        );
    }
}
