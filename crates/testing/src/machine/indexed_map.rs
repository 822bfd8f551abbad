use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use strata_core::{ResponseStatus, Result};
use strata_protocol::indexed_map::*;
use strata_protocol::{encode, Operation, Request};

#[derive(Debug, Default)]
pub(crate) struct IndexedMapMachine {
    entries: BTreeMap<u64, Entry>,
    keys: HashMap<String, u64>,
    last_index: u64,
}

impl IndexedMapMachine {
    fn by_key(&self, key: &str) -> Option<&Entry> {
        self.keys.get(key).and_then(|index| self.entries.get(index))
    }

    fn version_matches(&self, key: &str, version: u64) -> bool {
        version == 0 || self.by_key(key).map(|e| e.version) == Some(version)
    }
}

fn event(r#type: EventType, entry: Entry) -> EventResponse {
    EventResponse { r#type, entry }
}

impl StateMachine for IndexedMapMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            PutRequest::METHOD => handle(request, |op: PutRequest| {
                let status = if ctx.write_locked {
                    ResponseStatus::WriteLock
                } else if !self.version_matches(&op.key, op.version) {
                    ResponseStatus::PreconditionFailed
                } else {
                    ResponseStatus::Ok
                };
                if status != ResponseStatus::Ok {
                    return Ok(PutResponse {
                        status,
                        entry: self.by_key(&op.key).cloned().unwrap_or_default(),
                    });
                }
                let (index, kind) = match self.keys.get(&op.key) {
                    Some(index) => (*index, EventType::Updated),
                    None => {
                        self.last_index += 1;
                        (self.last_index, EventType::Inserted)
                    }
                };
                let entry = Entry {
                    index,
                    key: op.key.clone(),
                    value: op.value,
                    version: ctx.index,
                };
                self.keys.insert(op.key, index);
                self.entries.insert(index, entry.clone());
                ctx.emit(&event(kind, entry.clone()))?;
                Ok(PutResponse { status, entry })
            }),
            RemoveRequest::METHOD => handle(request, |op: RemoveRequest| {
                let status = if ctx.write_locked {
                    ResponseStatus::WriteLock
                } else if !self.version_matches(&op.key, op.version) {
                    ResponseStatus::PreconditionFailed
                } else {
                    ResponseStatus::Ok
                };
                if status != ResponseStatus::Ok {
                    return Ok(RemoveResponse {
                        status,
                        entry: None,
                    });
                }
                let entry = self
                    .keys
                    .remove(&op.key)
                    .and_then(|index| self.entries.remove(&index));
                if let Some(entry) = &entry {
                    ctx.emit(&event(EventType::Removed, entry.clone()))?;
                }
                Ok(RemoveResponse { status, entry })
            }),
            ClearRequest::METHOD => handle(request, |_: ClearRequest| {
                self.keys.clear();
                for (_, entry) in std::mem::take(&mut self.entries) {
                    ctx.emit(&event(EventType::Removed, entry))?;
                }
                Ok(ClearResponse {})
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        let found = |entry: Option<&Entry>| EntryResponse {
            entry: entry.cloned(),
        };
        match request.method.as_str() {
            GetRequest::METHOD => {
                handle(request, |op: GetRequest| Ok(found(self.by_key(&op.key))))
            }
            GetIndexRequest::METHOD => handle(request, |op: GetIndexRequest| {
                Ok(found(self.entries.get(&op.index)))
            }),
            FirstEntryRequest::METHOD => handle(request, |_: FirstEntryRequest| {
                Ok(found(self.entries.values().next()))
            }),
            LastEntryRequest::METHOD => handle(request, |_: LastEntryRequest| {
                Ok(found(self.entries.values().next_back()))
            }),
            SizeRequest::METHOD => handle(request, |_: SizeRequest| {
                Ok(SizeResponse {
                    size: self.entries.len() as u64,
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn iterate(&self, request: &Request) -> Result<Vec<Bytes>> {
        match request.method.as_str() {
            EntriesRequest::METHOD => self
                .entries
                .values()
                .map(|entry| {
                    encode(&EntriesResponse {
                        entry: entry.clone(),
                    })
                })
                .collect(),
            _ => Err(unknown_method(request)),
        }
    }

    fn replay(&self) -> Result<Vec<Bytes>> {
        self.entries
            .values()
            .map(|entry| encode(&event(EventType::Inserted, entry.clone())))
            .collect()
    }
}
