//! Typed operations
//!
//! An [`Operation`] is a request message that knows its wire method name and
//! the concrete response type it produces. Dispatch code is generic over
//! `O: Operation` and hands back `O::Output` directly, so no caller ever
//! inspects an untyped response to recover its type.

use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_core::ResponseStatus;

/// A request message with a statically known response type
pub trait Operation: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Method name on the wire
    const METHOD: &'static str;

    /// Response message type
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Structured outcome carried by the output (`Ok` when the output has none)
    fn status(_output: &Self::Output) -> ResponseStatus {
        ResponseStatus::Ok
    }
}

/// Watch requests that can ask the server to replay current state first
pub trait Replayable {
    /// Set the replay flag
    fn set_replay(&mut self, replay: bool);
}

/// Bind a request type to its response type and method name.
///
/// The `status` form also reads the output's `status` field.
macro_rules! operation {
    ($request:ty => $response:ty, $method:literal) => {
        impl $crate::operation::Operation for $request {
            const METHOD: &'static str = $method;
            type Output = $response;
        }
    };
    ($request:ty => $response:ty, $method:literal, status) => {
        impl $crate::operation::Operation for $request {
            const METHOD: &'static str = $method;
            type Output = $response;

            fn status(output: &$response) -> ::strata_core::ResponseStatus {
                output.status
            }
        }
    };
}

/// Implement [`Replayable`] for an event request with a `replay` field.
macro_rules! replayable {
    ($request:ty) => {
        impl $crate::operation::Replayable for $request {
            fn set_replay(&mut self, replay: bool) {
                self.replay = replay;
            }
        }
    };
}

pub(crate) use operation;
pub(crate) use replayable;
