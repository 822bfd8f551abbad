use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use strata_core::{ResponseStatus, Result};
use strata_protocol::value::*;
use strata_protocol::{encode, Operation, Request};

#[derive(Debug, Default)]
pub(crate) struct ValueMachine {
    value: Vec<u8>,
    version: u64,
}

impl StateMachine for ValueMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            SetRequest::METHOD => handle(request, |op: SetRequest| {
                let status = if ctx.write_locked {
                    ResponseStatus::WriteLock
                } else if op.expect_version != 0 && op.expect_version != self.version {
                    ResponseStatus::PreconditionFailed
                } else {
                    ResponseStatus::Ok
                };
                if status != ResponseStatus::Ok {
                    return Ok(SetResponse {
                        status,
                        version: self.version,
                        previous_value: self.value.clone(),
                        previous_version: self.version,
                    });
                }
                let previous_value = std::mem::replace(&mut self.value, op.value);
                let previous_version = std::mem::replace(&mut self.version, ctx.index);
                ctx.emit(&EventResponse {
                    r#type: EventType::Updated,
                    value: self.value.clone(),
                    version: self.version,
                })?;
                Ok(SetResponse {
                    status,
                    version: self.version,
                    previous_value,
                    previous_version,
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            GetRequest::METHOD => handle(request, |_: GetRequest| {
                Ok(GetResponse {
                    value: self.value.clone(),
                    version: self.version,
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn replay(&self) -> Result<Vec<Bytes>> {
        if self.version == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![encode(&EventResponse {
            r#type: EventType::Updated,
            value: self.value.clone(),
            version: self.version,
        })?])
    }
}
