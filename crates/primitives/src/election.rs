//! Election: leader election among sessions
//!
//! A client's candidate ID is the ID of the session serving the election,
//! so closing the client (or its session) withdraws the candidacy. The
//! first candidate in the queue leads; the term advances whenever the
//! leader changes.

use crate::options::{decorate_request, WatchOption};
use crate::primitive::{primitive_client, EventStream, Primitive};
use strata_core::Result;
use strata_protocol::election::{
    AnointRequest, EnterRequest, EventRequest, EventResponse, EventType, EvictRequest,
    GetTermRequest, LeaveRequest, PromoteRequest,
};

pub use strata_protocol::election::Term;

/// A change of term or candidate queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionEvent {
    /// Whether anything changed (`false` for a no-op event)
    pub changed: bool,
    /// Term after the change
    pub term: Term,
}

impl From<EventResponse> for ElectionEvent {
    fn from(response: EventResponse) -> Self {
        Self {
            changed: response.r#type == EventType::Changed,
            term: response.term,
        }
    }
}

/// Client of an election
#[derive(Debug, Clone)]
pub struct Election {
    primitive: Primitive,
}

primitive_client!(Election);

impl Election {
    /// This client's candidate ID
    pub fn id(&self) -> String {
        self.primitive.session().session_id().to_string()
    }

    /// Join the candidate queue
    pub async fn enter(&self) -> Result<Term> {
        let request = EnterRequest { candidate: self.id() };
        Ok(self.primitive.command(request).await?.term)
    }

    /// Leave the candidate queue
    pub async fn leave(&self) -> Result<Term> {
        let request = LeaveRequest { candidate: self.id() };
        Ok(self.primitive.command(request).await?.term)
    }

    /// Make `candidate` the leader; returns whether the queue changed
    pub async fn anoint(&self, candidate: impl Into<String>) -> Result<bool> {
        let request = AnointRequest {
            candidate: candidate.into(),
        };
        Ok(self.primitive.command(request).await?.applied)
    }

    /// Move `candidate` one place up the queue; returns whether it moved
    pub async fn promote(&self, candidate: impl Into<String>) -> Result<bool> {
        let request = PromoteRequest {
            candidate: candidate.into(),
        };
        Ok(self.primitive.command(request).await?.applied)
    }

    /// Remove `candidate` from the queue; returns whether it was queued
    pub async fn evict(&self, candidate: impl Into<String>) -> Result<bool> {
        let request = EvictRequest {
            candidate: candidate.into(),
        };
        Ok(self.primitive.command(request).await?.applied)
    }

    /// Current term
    pub async fn get_term(&self) -> Result<Term> {
        Ok(self.primitive.query(GetTermRequest {}).await?.term)
    }

    /// Watch for term changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<ElectionEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, ElectionEvent::from)
            .await
    }
}
