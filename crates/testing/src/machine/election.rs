use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use strata_core::Result;
use strata_protocol::election::*;
use strata_protocol::{encode, Operation, Request};

/// Candidates in priority order; the first is the leader
#[derive(Debug, Default)]
pub(crate) struct ElectionMachine {
    term: u64,
    candidates: Vec<String>,
}

impl ElectionMachine {
    fn snapshot(&self) -> Term {
        Term {
            term: self.term,
            leader: self.candidates.first().cloned(),
            candidates: self.candidates.clone(),
        }
    }

    /// Apply a change to the queue, starting a new term if the leader moved
    fn update(
        &mut self,
        ctx: &mut Context,
        change: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> Result<TermResponse> {
        let leader = self.candidates.first().cloned();
        let applied = change(&mut self.candidates);
        if applied {
            if self.candidates.first() != leader.as_ref() && !self.candidates.is_empty() {
                self.term += 1;
            }
            ctx.emit(&EventResponse {
                r#type: EventType::Changed,
                term: self.snapshot(),
            })?;
        }
        Ok(TermResponse {
            term: self.snapshot(),
            applied,
        })
    }
}

fn remove(candidates: &mut Vec<String>, id: &str) -> bool {
    let before = candidates.len();
    candidates.retain(|c| c != id);
    candidates.len() != before
}

impl StateMachine for ElectionMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            EnterRequest::METHOD => handle(request, |op: EnterRequest| {
                self.update(ctx, |candidates| {
                    if candidates.contains(&op.candidate) {
                        false
                    } else {
                        candidates.push(op.candidate);
                        true
                    }
                })
            }),
            LeaveRequest::METHOD => handle(request, |op: LeaveRequest| {
                self.update(ctx, |candidates| remove(candidates, &op.candidate))
            }),
            EvictRequest::METHOD => handle(request, |op: EvictRequest| {
                self.update(ctx, |candidates| remove(candidates, &op.candidate))
            }),
            AnointRequest::METHOD => handle(request, |op: AnointRequest| {
                self.update(ctx, |candidates| {
                    match candidates.iter().position(|c| *c == op.candidate) {
                        Some(0) | None => false,
                        Some(position) => {
                            let candidate = candidates.remove(position);
                            candidates.insert(0, candidate);
                            true
                        }
                    }
                })
            }),
            PromoteRequest::METHOD => handle(request, |op: PromoteRequest| {
                self.update(ctx, |candidates| {
                    match candidates.iter().position(|c| *c == op.candidate) {
                        Some(0) | None => false,
                        Some(position) => {
                            candidates.swap(position, position - 1);
                            true
                        }
                    }
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            GetTermRequest::METHOD => handle(request, |_: GetTermRequest| {
                Ok(GetTermResponse {
                    term: self.snapshot(),
                })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn replay(&self) -> Result<Vec<Bytes>> {
        Ok(vec![encode(&EventResponse {
            r#type: EventType::Changed,
            term: self.snapshot(),
        })?])
    }

    fn release(&mut self, ctx: &mut Context) -> Result<()> {
        let id = ctx.member_id();
        self.update(ctx, |candidates| remove(candidates, &id))?;
        Ok(())
    }
}
