//! Set: a distributed set of strings
//!
//! The worked example of the primitive pattern every other client repeats:
//!
//! | Call | Session operation |
//! |------|-------------------|
//! | `add`, `remove`, `clear` | command |
//! | `contains`, `len`, `is_empty` | query |
//! | `elements` | query stream |
//! | `watch` | command stream (registering a watch is session state) |
//!
//! Mutations rejected for write contention fail with `Error::WriteLock`.

use crate::options::{decorate_request, WatchOption};
use crate::primitive::{primitive_client, EventStream, ItemStream, Primitive};
use strata_core::Result;
use strata_protocol::set::{
    AddRequest, ClearRequest, ContainsRequest, EventRequest, EventResponse, EventType,
    IterateRequest, RemoveRequest, SizeRequest,
};

/// Kind of set change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetEventKind {
    /// No change (heartbeat or unknown type)
    None,
    /// A value was added
    Added,
    /// A value was removed
    Removed,
}

/// A change to a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEvent {
    /// What happened
    pub kind: SetEventKind,
    /// The value concerned
    pub value: String,
}

impl From<EventResponse> for SetEvent {
    fn from(response: EventResponse) -> Self {
        let kind = match response.r#type {
            EventType::None => SetEventKind::None,
            EventType::Added => SetEventKind::Added,
            EventType::Removed => SetEventKind::Removed,
        };
        Self {
            kind,
            value: response.value,
        }
    }
}

/// Client of a distributed set
#[derive(Debug, Clone)]
pub struct Set {
    primitive: Primitive,
}

primitive_client!(Set);

impl Set {
    /// Add a value; returns whether it was not already present
    pub async fn add(&self, value: impl Into<String>) -> Result<bool> {
        let response = self
            .primitive
            .command(AddRequest {
                value: value.into(),
            })
            .await?;
        Ok(response.added)
    }

    /// Remove a value; returns whether it was present
    pub async fn remove(&self, value: impl Into<String>) -> Result<bool> {
        let response = self
            .primitive
            .command(RemoveRequest {
                value: value.into(),
            })
            .await?;
        Ok(response.removed)
    }

    /// Whether the set holds `value`
    pub async fn contains(&self, value: impl Into<String>) -> Result<bool> {
        let response = self
            .primitive
            .query(ContainsRequest {
                value: value.into(),
            })
            .await?;
        Ok(response.contains)
    }

    /// Number of elements
    pub async fn len(&self) -> Result<u64> {
        Ok(self.primitive.query(SizeRequest {}).await?.size)
    }

    /// Whether the set has no elements
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every element
    pub async fn clear(&self) -> Result<()> {
        self.primitive.command(ClearRequest {}).await?;
        Ok(())
    }

    /// Stream the elements in the order the partition emits them
    ///
    /// The stream ends after the last element.
    pub async fn elements(&self) -> Result<ItemStream<String>> {
        self.primitive
            .query_stream(IterateRequest {}, |item| item.value)
            .await
    }

    /// Watch for changes
    ///
    /// With [`WatchOption::Replay`] the current elements arrive first as
    /// `Added` events. Changes made after this call returns are observed.
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<SetEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, SetEvent::from)
            .await
    }
}
