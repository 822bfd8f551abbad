use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use strata_core::Result;
use strata_protocol::counter::*;
use strata_protocol::{Operation, Request};

#[derive(Debug, Default)]
pub(crate) struct CounterMachine {
    value: i64,
}

impl StateMachine for CounterMachine {
    fn command(&mut self, _ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            SetRequest::METHOD => handle(request, |op: SetRequest| {
                let previous = std::mem::replace(&mut self.value, op.value);
                Ok(SetResponse { previous })
            }),
            IncrementRequest::METHOD => handle(request, |op: IncrementRequest| {
                let previous = self.value;
                self.value = self.value.wrapping_add(op.delta);
                Ok(IncrementResponse {
                    previous,
                    next: self.value,
                })
            }),
            DecrementRequest::METHOD => handle(request, |op: DecrementRequest| {
                let previous = self.value;
                self.value = self.value.wrapping_sub(op.delta);
                Ok(DecrementResponse {
                    previous,
                    next: self.value,
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            GetRequest::METHOD => handle(request, |_: GetRequest| {
                Ok(GetResponse { value: self.value })
            }),
            _ => Err(unknown_method(request)),
        }
    }
}
