//! Value: a single versioned byte value

use crate::options::{decorate_request, SetOption, WatchOption};
use crate::primitive::{primitive_client, EventStream, Primitive};
use strata_core::Result;
use strata_protocol::value::{
    EventRequest, EventResponse, EventType, GetRequest, SetRequest, SetResponse,
};

/// A change to a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEvent {
    /// Whether the value changed (`false` for a no-op event)
    pub updated: bool,
    /// New value
    pub value: Vec<u8>,
    /// Version of the new value
    pub version: u64,
}

impl From<EventResponse> for ValueEvent {
    fn from(response: EventResponse) -> Self {
        Self {
            updated: response.r#type == EventType::Updated,
            value: response.value,
            version: response.version,
        }
    }
}

/// Client of a distributed value
#[derive(Debug, Clone)]
pub struct Value {
    primitive: Primitive,
}

primitive_client!(Value);

impl Value {
    /// Current value and version (version 0 when never set)
    pub async fn get(&self) -> Result<(Vec<u8>, u64)> {
        let response = self.primitive.query(GetRequest {}).await?;
        Ok((response.value, response.version))
    }

    /// Replace the value; returns the new version
    ///
    /// With [`SetOption::Version`] the write only happens if the current
    /// version matches, otherwise it fails with `PreconditionFailed`.
    pub async fn set(&self, value: impl Into<Vec<u8>>, options: &[SetOption]) -> Result<u64> {
        let request = SetRequest {
            value: value.into(),
            expect_version: 0,
        };
        let request = decorate_request::<_, SetResponse, _>(options, request);
        Ok(self.primitive.command(request).await?.version)
    }

    /// Watch for changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<ValueEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, ValueEvent::from)
            .await
    }
}
