use super::{handle, unknown_method, Context, StateMachine};
use bytes::Bytes;
use std::collections::VecDeque;
use std::time::Duration;
use strata_core::{Result, SessionId};
use strata_protocol::lock::*;
use strata_protocol::{encode, Operation, Request};
use tokio::sync::oneshot;

struct Holder {
    session: SessionId,
    version: u64,
}

struct Waiter {
    id: u64,
    session: SessionId,
    reply: oneshot::Sender<Bytes>,
}

/// A lock with a FIFO queue of waiting sessions
#[derive(Default)]
pub(crate) struct LockMachine {
    holder: Option<Holder>,
    waiters: VecDeque<Waiter>,
    next_waiter: u64,
}

fn granted(version: u64) -> LockResponse {
    LockResponse {
        acquired: true,
        version,
    }
}

impl LockMachine {
    /// Hand the lock to the first waiter still listening
    fn grant_next(&mut self, index: u64) {
        while let Some(waiter) = self.waiters.pop_front() {
            let reply = match encode(&granted(index)) {
                Ok(reply) => reply,
                Err(_) => continue,
            };
            if waiter.reply.send(reply).is_ok() {
                self.holder = Some(Holder {
                    session: waiter.session,
                    version: index,
                });
                return;
            }
        }
    }

    /// Give up on a waiter whose timeout elapsed
    pub(crate) fn expire(&mut self, waiter_id: u64) {
        if let Some(position) = self.waiters.iter().position(|w| w.id == waiter_id) {
            if let Some(waiter) = self.waiters.remove(position) {
                let timed_out = LockResponse {
                    acquired: false,
                    version: 0,
                };
                if let Ok(reply) = encode(&timed_out) {
                    let _ = waiter.reply.send(reply);
                }
            }
        }
    }
}

impl StateMachine for LockMachine {
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            LockRequest::METHOD => {
                let op: LockRequest = request.decode()?;
                if self.holder.is_none() {
                    self.holder = Some(Holder {
                        session: ctx.session,
                        version: ctx.index,
                    });
                    return encode(&granted(ctx.index));
                }
                if op.timeout_ms == Some(0) {
                    return encode(&LockResponse {
                        acquired: false,
                        version: 0,
                    });
                }
                self.next_waiter += 1;
                let (reply, deferred) = oneshot::channel();
                self.waiters.push_back(Waiter {
                    id: self.next_waiter,
                    session: ctx.session,
                    reply,
                });
                ctx.deferred = Some(deferred);
                if let Some(timeout_ms) = op.timeout_ms {
                    ctx.timers
                        .push((self.next_waiter, Duration::from_millis(timeout_ms)));
                }
                // Placeholder; the deferred reply replaces it
                Ok(Bytes::new())
            }
            UnlockRequest::METHOD => handle(request, |op: UnlockRequest| {
                let unlocked = match &self.holder {
                    Some(holder) => {
                        holder.session == ctx.session
                            && (op.version == 0 || op.version == holder.version)
                    }
                    None => false,
                };
                if unlocked {
                    self.holder = None;
                    self.grant_next(ctx.index);
                }
                Ok(UnlockResponse { unlocked })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn query(&self, request: &Request) -> Result<Bytes> {
        match request.method.as_str() {
            IsLockedRequest::METHOD => handle(request, |op: IsLockedRequest| {
                let locked = match &self.holder {
                    Some(holder) => op.version == 0 || op.version == holder.version,
                    None => false,
                };
                Ok(IsLockedResponse { locked })
            }),
            _ => Err(unknown_method(request)),
        }
    }

    fn release(&mut self, ctx: &mut Context) -> Result<()> {
        let session = ctx.session;
        self.waiters.retain(|w| w.session != session);
        if self.holder.as_ref().map(|h| h.session) == Some(session) {
            self.holder = None;
            self.grant_next(ctx.index);
        }
        Ok(())
    }
}
