//! Session management messages

use crate::operation::operation;
use serde::{Deserialize, Serialize};
use strata_core::SessionId;

/// Register a new session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    /// Session timeout requested by the client, in milliseconds
    pub timeout_ms: u64,
}

/// Session registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionResponse {
    /// Server-assigned session ID
    pub session_id: SessionId,
}

/// Keep a session alive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAliveRequest {
    /// Highest command sequence the client has received a response for
    pub command_sequence: u64,
}

/// Keep-alive acknowledged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAliveResponse {}

/// End a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSessionRequest {}

/// Session ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSessionResponse {}

/// Release a primitive's resources held by the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePrimitiveRequest {}

/// Primitive released
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePrimitiveResponse {}

/// Destroy a primitive's state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {}

/// Primitive destroyed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {}

operation!(OpenSessionRequest => OpenSessionResponse, "OpenSession");
operation!(KeepAliveRequest => KeepAliveResponse, "KeepAlive");
operation!(CloseSessionRequest => CloseSessionResponse, "CloseSession");
operation!(ClosePrimitiveRequest => ClosePrimitiveResponse, "ClosePrimitive");
operation!(DeleteRequest => DeleteResponse, "Delete");
