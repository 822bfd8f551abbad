use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use std::collections::BTreeMap;
use strata_core::{ResponseStatus, Result};
use strata_protocol::map::*;
use strata_protocol::{encode, Operation, Request};

#[derive(Debug, Default)]
pub(crate) struct MapMachine {
    entries: BTreeMap<String, Entry>,
}

impl MapMachine {
    /// Whether a write expecting `version` may proceed
    fn version_matches(&self, key: &str, version: u64) -> bool {
        version == 0 || self.entries.get(key).map(|e| e.version) == Some(version)
    }
}

fn event(r#type: EventType, entry: Entry) -> EventResponse {
    EventResponse { r#type, entry }
}

impl StateMachine for MapMachine {
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
                        entry: self.entries.get(&op.key).cloned().unwrap_or_default(),
                        previous: None,
                    });
                }
                let entry = Entry {
                    key: op.key.clone(),
                    value: op.value,
                    version: ctx.index,
                };
                let previous = self.entries.insert(op.key, entry.clone());
                let kind = if previous.is_some() {
                    EventType::Updated
                } else {
                    EventType::Inserted
                };
                ctx.emit(&event(kind, entry.clone()))?;
                Ok(PutResponse {
                    status,
                    entry,
                    previous,
                })
            }),
            RemoveRequest::METHOD => handle(request, |op: RemoveRequest| {
                if ctx.write_locked {
                    return Ok(RemoveResponse {
                        status: ResponseStatus::WriteLock,
                        previous: None,
                    });
                }
                if !self.version_matches(&op.key, op.version) {
                    return Ok(RemoveResponse {
                        status: ResponseStatus::PreconditionFailed,
                        previous: None,
                    });
                }
                let previous = self.entries.remove(&op.key);
                if let Some(entry) = &previous {
                    ctx.emit(&event(EventType::Removed, entry.clone()))?;
                }
                Ok(RemoveResponse {
                    status: ResponseStatus::Ok,
                    previous,
                })
            }),
            ClearRequest::METHOD => handle(request, |_: ClearRequest| {
                for (_, entry) in std::mem::take(&mut self.entries) {
                    ctx.emit(&event(EventType::Removed, entry))?;
                }
                Ok(ClearResponse {})
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            GetRequest::METHOD => handle(request, |op: GetRequest| {
                Ok(match self.entries.get(&op.key) {
                    Some(entry) => GetResponse {
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                        version: entry.version,
                    },
                    None => GetResponse {
                        key: op.key,
                        ..Default::default()
                    },
                })
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
