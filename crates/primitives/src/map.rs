//! Map: a distributed map of string keys to byte values
//!
//! Every entry carries the index at which it was last written as its
//! version. Version-conditioned writes go through [`PutOption`] and
//! [`RemoveOption`]; a mismatch fails with `Error::PreconditionFailed`.

use crate::options::{
    decorate_request, decorate_response, GetOption, PutOption, RemoveOption, WatchOption,
};
use crate::primitive::{primitive_client, EventStream, ItemStream, Primitive};
use strata_core::Result;
use strata_protocol::map::{
    ClearRequest, EntriesRequest, EventRequest, EventResponse, EventType, GetRequest,
    GetResponse, PutRequest, PutResponse, RemoveRequest, RemoveResponse, SizeRequest,
};

pub use strata_protocol::map::Entry as MapEntry;

/// Kind of map change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEventKind {
    /// No change
    None,
    /// A new key was written
    Inserted,
    /// An existing key was overwritten
    Updated,
    /// A key was removed
    Removed,
}

/// A change to a map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEvent {
    /// What happened
    pub kind: MapEventKind,
    /// The entry after the change (before it, for removals)
    pub entry: MapEntry,
}

impl From<EventResponse> for MapEvent {
    fn from(response: EventResponse) -> Self {
        let kind = match response.r#type {
            EventType::None => MapEventKind::None,
            EventType::Inserted => MapEventKind::Inserted,
            EventType::Updated => MapEventKind::Updated,
            EventType::Removed => MapEventKind::Removed,
        };
        Self {
            kind,
            entry: response.entry,
        }
    }
}

/// Client of a distributed map
#[derive(Debug, Clone)]
pub struct Map {
    primitive: Primitive,
}

primitive_client!(Map);

impl Map {
    /// Write a key; returns the new entry
    pub async fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        options: &[PutOption],
    ) -> Result<MapEntry> {
        let request = PutRequest {
            key: key.into(),
            value: value.into(),
            version: 0,
        };
        let request = decorate_request::<_, PutResponse, _>(options, request);
        let response = self.primitive.command(request).await?;
        Ok(decorate_response::<PutRequest, _, _>(options, response).entry)
    }

    /// Read a key
    ///
    /// Returns `None` when the key is absent, unless a
    /// [`GetOption::Default`] supplies a value (reported at version 0).
    pub async fn get(&self, key: impl Into<String>, options: &[GetOption]) -> Result<Option<MapEntry>> {
        let key = key.into();
        let request = decorate_request::<_, GetResponse, _>(options, GetRequest { key: key.clone() });
        let response = self.primitive.query(request).await?;
        let response = decorate_response::<GetRequest, _, _>(options, response);
        let defaulted = options.iter().any(|o| matches!(o, GetOption::Default(_)));
        if response.version == 0 && !defaulted {
            return Ok(None);
        }
        Ok(Some(MapEntry {
            key,
            value: response.value,
            version: response.version,
        }))
    }

    /// Remove a key; returns the removed entry, if any
    pub async fn remove(
        &self,
        key: impl Into<String>,
        options: &[RemoveOption],
    ) -> Result<Option<MapEntry>> {
        let request = RemoveRequest {
            key: key.into(),
            version: 0,
        };
        let request = decorate_request::<_, RemoveResponse, _>(options, request);
        let response = self.primitive.command(request).await?;
        Ok(decorate_response::<RemoveRequest, _, _>(options, response).previous)
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

    /// Stream every entry
    pub async fn entries(&self) -> Result<ItemStream<MapEntry>> {
        self.primitive
            .query_stream(EntriesRequest {}, |item| item.entry)
            .await
    }

    /// Watch for changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<MapEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, MapEvent::from)
            .await
    }
}
