//! IndexedMap: a map whose entries also have a stable insertion index

use crate::options::{decorate_request, PutOption, RemoveOption, WatchOption};
use crate::primitive::{primitive_client, EventStream, ItemStream, Primitive};
use strata_core::Result;
use strata_protocol::indexed_map::{
    ClearRequest, EntriesRequest, EventRequest, EventResponse, EventType, FirstEntryRequest,
    GetIndexRequest, GetRequest, LastEntryRequest, PutRequest, PutResponse, RemoveRequest,
    RemoveResponse, SizeRequest,
};

pub use strata_protocol::indexed_map::Entry as IndexedEntry;

/// Kind of indexed-map change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedMapEventKind {
    /// No change
    None,
    /// A new key was written
    Inserted,
    /// An existing key was overwritten
    Updated,
    /// A key was removed
    Removed,
}

/// A change to an indexed map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedMapEvent {
    /// What happened
    pub kind: IndexedMapEventKind,
    /// The entry concerned
    pub entry: IndexedEntry,
}

impl From<EventResponse> for IndexedMapEvent {
    fn from(response: EventResponse) -> Self {
        let kind = match response.r#type {
            EventType::None => IndexedMapEventKind::None,
            EventType::Inserted => IndexedMapEventKind::Inserted,
            EventType::Updated => IndexedMapEventKind::Updated,
            EventType::Removed => IndexedMapEventKind::Removed,
        };
        Self {
            kind,
            entry: response.entry,
        }
    }
}

/// Client of a distributed indexed map
#[derive(Debug, Clone)]
pub struct IndexedMap {
    primitive: Primitive,
}

primitive_client!(IndexedMap);

impl IndexedMap {
    /// Write a key; returns the entry with its index and version
    pub async fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        options: &[PutOption],
    ) -> Result<IndexedEntry> {
        let request = PutRequest {
            key: key.into(),
            value: value.into(),
            version: 0,
        };
        let request = decorate_request::<_, PutResponse, _>(options, request);
        Ok(self.primitive.command(request).await?.entry)
    }

    /// Entry for `key`
    pub async fn get(&self, key: impl Into<String>) -> Result<Option<IndexedEntry>> {
        let request = GetRequest { key: key.into() };
        Ok(self.primitive.query(request).await?.entry)
    }

    /// Entry at insertion `index`
    pub async fn get_index(&self, index: u64) -> Result<Option<IndexedEntry>> {
        Ok(self.primitive.query(GetIndexRequest { index }).await?.entry)
    }

    /// Entry with the lowest index
    pub async fn first_entry(&self) -> Result<Option<IndexedEntry>> {
        Ok(self.primitive.query(FirstEntryRequest {}).await?.entry)
    }

    /// Entry with the highest index
    pub async fn last_entry(&self) -> Result<Option<IndexedEntry>> {
        Ok(self.primitive.query(LastEntryRequest {}).await?.entry)
    }

    /// Remove a key; returns the removed entry, if any
    pub async fn remove(
        &self,
        key: impl Into<String>,
        options: &[RemoveOption],
    ) -> Result<Option<IndexedEntry>> {
        let request = RemoveRequest {
            key: key.into(),
            version: 0,
        };
        let request = decorate_request::<_, RemoveResponse, _>(options, request);
        Ok(self.primitive.command(request).await?.entry)
    }

    /// Number of entries
    pub async fn len(&self) -> Result<u64> {
        Ok(self.primitive.query(SizeRequest {}).await?.size)
    }

    /// Whether the map has no entries
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every entry
    pub async fn clear(&self) -> Result<()> {
        self.primitive.command(ClearRequest {}).await?;
        Ok(())
    }

    /// Stream every entry in index order
    pub async fn entries(&self) -> Result<ItemStream<IndexedEntry>> {
        self.primitive
            .query_stream(EntriesRequest {}, |item| item.entry)
            .await
    }

    /// Watch for changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<IndexedMapEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, IndexedMapEvent::from)
            .await
    }
}
