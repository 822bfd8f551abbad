use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use std::collections::BTreeMap;
use strata_core::Result;
use strata_protocol::log::*;
use strata_protocol::{encode, Operation, Request};

#[derive(Debug, Default)]
pub(crate) struct LogMachine {
    entries: BTreeMap<u64, Vec<u8>>,
    last_index: u64,
}

impl LogMachine {
    fn entry(index: u64, value: &[u8]) -> Entry {
        Entry {
            index,
            value: value.to_vec(),
        }
    }
}

impl StateMachine for LogMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            AppendRequest::METHOD => handle(request, |op: AppendRequest| {
                self.last_index += 1;
                let index = self.last_index;
                ctx.emit(&EventResponse {
                    r#type: EventType::Appended,
                    entry: Self::entry(index, &op.value),
                })?;
                self.entries.insert(index, op.value);
                Ok(AppendResponse { index })
            }),
            RemoveRequest::METHOD => handle(request, |op: RemoveRequest| {
                let entry = self
                    .entries
                    .remove(&op.index)
                    .map(|value| Self::entry(op.index, &value));
                if let Some(entry) = &entry {
                    ctx.emit(&EventResponse {
                        r#type: EventType::Removed,
                        entry: entry.clone(),
                    })?;
                }
                Ok(EntryResponse { entry })
            }),
            ClearRequest::METHOD => handle(request, |_: ClearRequest| {
                for (index, value) in std::mem::take(&mut self.entries) {
                    ctx.emit(&EventResponse {
                        r#type: EventType::Removed,
                        entry: Self::entry(index, &value),
                    })?;
                }
                Ok(ClearResponse {})
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        let found = |pair: Option<(&u64, &Vec<u8>)>| EntryResponse {
            entry: pair.map(|(index, value)| Self::entry(*index, value)),
        };
        match request.method.as_str() {
            GetRequest::METHOD => handle(request, |op: GetRequest| {
                Ok(found(self.entries.get_key_value(&op.index)))
            }),
            FirstEntryRequest::METHOD => {
                handle(request, |_: FirstEntryRequest| Ok(found(self.entries.iter().next())))
            }
            LastEntryRequest::METHOD => handle(request, |_: LastEntryRequest| {
                Ok(found(self.entries.iter().next_back()))
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
                .iter()
                .map(|(index, value)| {
                    encode(&EntriesResponse {
                        entry: Self::entry(*index, value),
                    })
                })
                .collect(),
            _ => Err(unknown_method(request)),
        }
    }

    fn replay(&self) -> Result<Vec<Bytes>> {
        self.entries
            .iter()
            .map(|(index, value)| {
                encode(&EventResponse {
                    r#type: EventType::Appended,
                    entry: Self::entry(*index, value),
                })
            })
            .collect()
    }
}
