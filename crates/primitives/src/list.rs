//! List: a distributed ordered list of byte values
//!
//! Index arguments outside the list fail with `Error::InvalidArgument`.

use crate::options::{decorate_request, WatchOption};
use crate::primitive::{primitive_client, EventStream, ItemStream, Primitive};
use strata_core::Result;
use strata_protocol::list::{
    AppendRequest, ClearRequest, EventRequest, EventResponse, EventType, GetRequest,
    InsertRequest, IterateRequest, RemoveRequest, SetRequest, SizeRequest,
};

/// Kind of list change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEventKind {
    /// No change
    None,
    /// An item was appended or inserted
    Added,
    /// An item was overwritten
    Updated,
    /// An item was removed
    Removed,
}

/// A change to a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEvent {
    /// What happened
    pub kind: ListEventKind,
    /// Position of the item
    pub index: u64,
    /// The item
    pub value: Vec<u8>,
}

impl From<EventResponse> for ListEvent {
    fn from(response: EventResponse) -> Self {
        let kind = match response.r#type {
            EventType::None => ListEventKind::None,
            EventType::Added => ListEventKind::Added,
            EventType::Updated => ListEventKind::Updated,
            EventType::Removed => ListEventKind::Removed,
        };
        Self {
            kind,
            index: response.index,
            value: response.value,
        }
    }
}

/// Client of a distributed list
#[derive(Debug, Clone)]
pub struct List {
    primitive: Primitive,
}

primitive_client!(List);

impl List {
    /// Add an item at the end
    pub async fn append(&self, value: impl Into<Vec<u8>>) -> Result<()> {
        self.primitive
            .command(AppendRequest {
                value: value.into(),
            })
            .await?;
        Ok(())
    }

    /// Insert an item before `index` (`index == len` appends)
    pub async fn insert(&self, index: u64, value: impl Into<Vec<u8>>) -> Result<()> {
        self.primitive
            .command(InsertRequest {
                index,
                value: value.into(),
            })
            .await?;
        Ok(())
    }

    /// Item at `index`
    pub async fn get(&self, index: u64) -> Result<Vec<u8>> {
        Ok(self.primitive.query(GetRequest { index }).await?.value)
    }

    /// Overwrite the item at `index`; returns the previous item
    pub async fn set(&self, index: u64, value: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        let response = self
            .primitive
            .command(SetRequest {
                index,
                value: value.into(),
            })
            .await?;
        Ok(response.previous)
    }

    /// Remove the item at `index`; returns it
    pub async fn remove(&self, index: u64) -> Result<Vec<u8>> {
        Ok(self.primitive.command(RemoveRequest { index }).await?.value)
    }

    /// Number of items
    pub async fn len(&self) -> Result<u64> {
        Ok(self.primitive.query(SizeRequest {}).await?.size)
    }

    /// Whether the list has no items
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every item
    pub async fn clear(&self) -> Result<()> {
        self.primitive.command(ClearRequest {}).await?;
        Ok(())
    }

    /// Stream the items in order
    pub async fn items(&self) -> Result<ItemStream<Vec<u8>>> {
        self.primitive
            .query_stream(IterateRequest {}, |item| item.value)
            .await
    }

    /// Watch for changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<ListEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, ListEvent::from)
            .await
    }
}
