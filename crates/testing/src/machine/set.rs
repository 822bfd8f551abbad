use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use std::collections::BTreeSet;
use strata_core::{ResponseStatus, Result};
use strata_protocol::set::*;
use strata_protocol::{encode, Operation, Request};

/// Elements are kept ordered so iteration and replay are deterministic
#[derive(Debug, Default)]
pub(crate) struct SetMachine {
    elements: BTreeSet<String>,
}

fn event(r#type: EventType, value: &str) -> EventResponse {
    EventResponse {
        r#type,
        value: value.to_string(),
    }
}

impl StateMachine for SetMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            AddRequest::METHOD => handle(request, |op: AddRequest| {
                if ctx.write_locked {
                    return Ok(AddResponse {
                        status: ResponseStatus::WriteLock,
                        added: false,
                    });
                }
                let added = self.elements.insert(op.value.clone());
                if added {
                    ctx.emit(&event(EventType::Added, &op.value))?;
                }
                Ok(AddResponse {
                    status: ResponseStatus::Ok,
                    added,
                })
            }),
            RemoveRequest::METHOD => handle(request, |op: RemoveRequest| {
                if ctx.write_locked {
                    return Ok(RemoveResponse {
                        status: ResponseStatus::WriteLock,
                        removed: false,
                    });
                }
                let removed = self.elements.remove(&op.value);
                if removed {
                    ctx.emit(&event(EventType::Removed, &op.value))?;
                }
                Ok(RemoveResponse {
                    status: ResponseStatus::Ok,
                    removed,
                })
            }),
            ClearRequest::METHOD => handle(request, |_: ClearRequest| {
                for value in std::mem::take(&mut self.elements) {
                    ctx.emit(&event(EventType::Removed, &value))?;
                }
                Ok(ClearResponse {})
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            ContainsRequest::METHOD => handle(request, |op: ContainsRequest| {
                Ok(ContainsResponse {
                    contains: self.elements.contains(&op.value),
                })
            }),
            SizeRequest::METHOD => handle(request, |_: SizeRequest| {
                Ok(SizeResponse {
                    size: self.elements.len() as u64,
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn iterate(&self, request: &Request) -> Result<Vec<Bytes>> {
        match request.method.as_str() {
            IterateRequest::METHOD => self
                .elements
                .iter()
                .map(|value| {
                    encode(&IterateResponse {
                        value: value.clone(),
                    })
                })
                .collect(),
            _ => Err(unknown_method(request)),
        }
    }

    fn replay(&self) -> Result<Vec<Bytes>> {
        self.elements
            .iter()
            .map(|value| encode(&event(EventType::Added, value)))
            .collect()
    }
}
