//! Log: a distributed append-only log of byte values

use crate::options::{decorate_request, WatchOption};
use crate::primitive::{primitive_client, EventStream, ItemStream, Primitive};
use strata_core::Result;
use strata_protocol::log::{
    AppendRequest, ClearRequest, EntriesRequest, EventRequest, EventResponse, EventType,
    FirstEntryRequest, GetRequest, LastEntryRequest, RemoveRequest, SizeRequest,
};

pub use strata_protocol::log::Entry as LogEntry;

/// Kind of log change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEventKind {
    /// No change
    None,
    /// An entry was appended
    Appended,
    /// An entry was removed
    Removed,
}

/// A change to a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// What happened
    pub kind: LogEventKind,
    /// The entry concerned
    pub entry: LogEntry,
}

impl From<EventResponse> for LogEvent {
    fn from(response: EventResponse) -> Self {
        let kind = match response.r#type {
            EventType::None => LogEventKind::None,
            EventType::Appended => LogEventKind::Appended,
            EventType::Removed => LogEventKind::Removed,
        };
        Self {
            kind,
            entry: response.entry,
        }
    }
}

/// Client of a distributed log
#[derive(Debug, Clone)]
pub struct Log {
    primitive: Primitive,
}

primitive_client!(Log);

impl Log {
    /// Append an entry; returns its index
    pub async fn append(&self, value: impl Into<Vec<u8>>) -> Result<u64> {
        let response = self
            .primitive
            .command(AppendRequest {
                value: value.into(),
            })
            .await?;
        Ok(response.index)
    }

    /// Entry at `index`
    pub async fn get(&self, index: u64) -> Result<Option<LogEntry>> {
        Ok(self.primitive.query(GetRequest { index }).await?.entry)
    }

    /// Oldest entry
    pub async fn first_entry(&self) -> Result<Option<LogEntry>> {
        Ok(self.primitive.query(FirstEntryRequest {}).await?.entry)
    }

    /// Newest entry
    pub async fn last_entry(&self) -> Result<Option<LogEntry>> {
        Ok(self.primitive.query(LastEntryRequest {}).await?.entry)
    }

    /// Remove the entry at `index`; returns it
    pub async fn remove(&self, index: u64) -> Result<Option<LogEntry>> {
        Ok(self.primitive.command(RemoveRequest { index }).await?.entry)
    }

    /// Number of entries
    pub async fn len(&self) -> Result<u64> {
        Ok(self.primitive.query(SizeRequest {}).await?.size)
    }

    /// Whether the log has no entries
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every entry
    pub async fn clear(&self) -> Result<()> {
        self.primitive.command(ClearRequest {}).await?;
        Ok(())
    }

    /// Stream every entry in index order
    pub async fn entries(&self) -> Result<ItemStream<LogEntry>> {
        self.primitive
            .query_stream(EntriesRequest {}, |item| item.entry)
            .await
    }

    /// Watch for changes
    pub async fn watch(&self, options: &[WatchOption]) -> Result<EventStream<LogEvent>> {
        let request = decorate_request::<_, EventResponse, _>(options, EventRequest::default());
        self.primitive
            .command_stream(request, LogEvent::from)
            .await
    }
}
