//! LeaderLatch: the first participant to latch leads until it leaves
//!
//! The participant ID is the ID of the session serving the latch; closing
//! the client (or its session) releases the latch to the next participant.

use crate::options::{decorate_request, WatchOption};
use crate::primitive::{primitive_client, EventStream, Primitive};
use strata_core::Result;
use strata_protocol::leader::{EventRequest, EventResponse, EventType, GetRequest, LatchRequest};

pub use strata_protocol::leader::Latch;

/// A change of latch holder or participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatchEvent {
    /// Whether anything changed (`false` for a no-op event)
    pub changed: bool,
    /// Latch state after the change
    pub latch: Latch,
}

impl From<EventResponse> for LatchEvent {
    fn from(response: EventResponse) -> Self {
        Self {
            changed: response.r#type == EventType::Changed,
            latch: response.latch,
        }
    }
}

/// Client of a leader latch
#[derive(Debug, Clone)]
pub struct LeaderLatch {
    primitive: Primitive,
}

primitive_client!(LeaderLatch);

impl LeaderLatch {
    /// This client's participant ID
    pub fn id(&self) -> String {
        self.primitive.session().session_id().to_string()
    }

    /// Join the latch; returns its state
    pub async fn latch(&self) -> Result<Latch> {
        let request = LatchRequest {
            participant: self.id(),
        };
        Ok(self.primitive.command(request).await?.latch)
    }

    /// Current latch state
    pub async fn get(&self) -> Result<Latch> {
        Ok(self.primitive.query(GetRequest {}).await?.latch)
    }

    /// Whether this client holds the latch
    pub async fn is_leader(&self) -> Result<bool> {
        let latch = self.get().await?;
        Ok(latch.leader.as_deref() == Some(self.id().as_str()))
    }

    /// Watch for changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<LatchEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, LatchEvent::from)
            .await
    }
}
