use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use strata_core::Result;
use strata_protocol::leader::*;
use strata_protocol::{encode, Operation, Request};

/// Participants in arrival order; the first holds the latch
#[derive(Debug, Default)]
pub(crate) struct LeaderMachine {
    id: u64,
    participants: Vec<String>,
}

impl LeaderMachine {
    fn snapshot(&self) -> Latch {
        Latch {
            id: self.id,
            leader: self.participants.first().cloned(),
            participants: self.participants.clone(),
        }
    }

    fn changed(&mut self, ctx: &mut Context, leader: Option<String>) -> Result<()> {
        if self.participants.first() != leader.as_ref() && !self.participants.is_empty() {
            self.id += 1;
        }
        ctx.emit(&EventResponse {
            r#type: EventType::Changed,
            latch: self.snapshot(),
        })
    }
}

impl StateMachine for LeaderMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            LatchRequest::METHOD => handle(request, |op: LatchRequest| {
                if !self.participants.contains(&op.participant) {
                    let leader = self.participants.first().cloned();
                    self.participants.push(op.participant);
                    self.changed(ctx, leader)?;
                }
                Ok(LatchResponse {
                    latch: self.snapshot(),
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            GetRequest::METHOD => handle(request, |_: GetRequest| {
                Ok(GetResponse {
                    latch: self.snapshot(),
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn replay(&self) -> Result<Vec<Bytes>> {
        Ok(vec![encode(&EventResponse {
            r#type: EventType::Changed,
            latch: self.snapshot(),
        })?])
    }

    fn release(&mut self, ctx: &mut Context) -> Result<()> {
        let id = ctx.member_id();
        if self.participants.contains(&id) {
            let leader = self.participants.first().cloned();
            self.participants.retain(|p| *p != id);
            self.changed(ctx, leader)?;
        }
        Ok(())
    }
}
