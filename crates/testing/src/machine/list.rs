use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use strata_core::{ResponseStatus, Result};
use strata_protocol::list::*;
use strata_protocol::{encode, Operation, Request};

#[derive(Debug, Default)]
pub(crate) struct ListMachine {
    items: Vec<Vec<u8>>,
}

fn event(r#type: EventType, index: usize, value: &[u8]) -> EventResponse {
    EventResponse {
        r#type,
        index: index as u64,
        value: value.to_vec(),
    }
}

impl StateMachine for ListMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        let locked = ctx.write_locked;
        match request.method.as_str() {
            AppendRequest::METHOD => handle(request, |op: AppendRequest| {
                if locked {
                    return Ok(AppendResponse {
                        status: ResponseStatus::WriteLock,
                    });
                }
                ctx.emit(&event(EventType::Added, self.items.len(), &op.value))?;
                self.items.push(op.value);
                Ok(AppendResponse {
                    status: ResponseStatus::Ok,
                })
            }),
            InsertRequest::METHOD => handle(request, |op: InsertRequest| {
                let index = op.index as usize;
                let status = if locked {
                    ResponseStatus::WriteLock
                } else if index > self.items.len() {
                    ResponseStatus::OutOfBounds
                } else {
                    ctx.emit(&event(EventType::Added, index, &op.value))?;
                    self.items.insert(index, op.value);
                    ResponseStatus::Ok
                };
                Ok(InsertResponse { status })
            }),
            SetRequest::METHOD => handle(request, |op: SetRequest| {
                let index = op.index as usize;
                if locked {
                    return Ok(SetResponse {
                        status: ResponseStatus::WriteLock,
                        previous: Vec::new(),
                    });
                }
                match self.items.get_mut(index) {
                    Some(slot) => {
                        let previous = std::mem::replace(slot, op.value);
                        ctx.emit(&event(EventType::Updated, index, slot))?;
                        Ok(SetResponse {
                            status: ResponseStatus::Ok,
                            previous,
                        })
                    }
                    None => Ok(SetResponse {
                        status: ResponseStatus::OutOfBounds,
                        previous: Vec::new(),
                    }),
                }
            }),
            RemoveRequest::METHOD => handle(request, |op: RemoveRequest| {
                let index = op.index as usize;
                if locked || index >= self.items.len() {
                    return Ok(RemoveResponse {
                        status: if locked {
                            ResponseStatus::WriteLock
                        } else {
                            ResponseStatus::OutOfBounds
                        },
                        value: Vec::new(),
                    });
                }
                let value = self.items.remove(index);
                ctx.emit(&event(EventType::Removed, index, &value))?;
                Ok(RemoveResponse {
                    status: ResponseStatus::Ok,
                    value,
                })
            }),
            ClearRequest::METHOD => handle(request, |_: ClearRequest| {
                for (index, value) in std::mem::take(&mut self.items).iter().enumerate().rev() {
                    ctx.emit(&event(EventType::Removed, index, value))?;
                }
                Ok(ClearResponse {})
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            GetRequest::METHOD => handle(request, |op: GetRequest| {
                Ok(match self.items.get(op.index as usize) {
                    Some(value) => GetResponse {
                        status: ResponseStatus::Ok,
                        value: value.clone(),
                    },
                    None => GetResponse {
                        status: ResponseStatus::OutOfBounds,
                        value: Vec::new(),
                    },
                })
            }),
            SizeRequest::METHOD => handle(request, |_: SizeRequest| {
                Ok(SizeResponse {
                    size: self.items.len() as u64,
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn iterate(&self, request: &Request) -> Result<Vec<Bytes>> {
        match request.method.as_str() {
            IterateRequest::METHOD => self
                .items
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
        self.items
            .iter()
            .enumerate()
            .map(|(index, value)| encode(&event(EventType::Added, index, value)))
            .collect()
    }
}
