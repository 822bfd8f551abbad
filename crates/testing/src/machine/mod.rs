//! In-memory state machines for every primitive type
//!
//! Each machine applies decoded commands, answers queries and produces the
//! event payloads its watchers receive. Machines are pure: sessions,
//! sequencing and delivery live in the replica.

mod counter;
mod election;
mod indexed_map;
mod leader;
mod list;
mod lock;
mod log;
mod map;
mod set;
mod value;

use bytes::Bytes;
use std::time::Duration;
use strata_core::{Error, PrimitiveType, Result, SessionId};
use strata_protocol::{encode, Operation, Request};
use tokio::sync::oneshot;

/// Per-command inputs and side effects
pub(crate) struct Context {
    /// Session issuing the command
    pub session: SessionId,
    /// Index the command is applied at
    pub index: u64,
    /// Reject writes with `WriteLock`
    pub write_locked: bool,
    /// Encoded events for the primitive's watchers
    pub events: Vec<Bytes>,
    /// Reply that completes later (lock waits)
    pub deferred: Option<oneshot::Receiver<Bytes>>,
    /// Waiter timeouts to arm: (waiter ID, delay)
    pub timers: Vec<(u64, Duration)>,
}

impl Context {
    pub(crate) fn new(session: SessionId, index: u64) -> Self {
        Self {
            session,
            index,
            write_locked: false,
            events: Vec::new(),
            deferred: None,
            timers: Vec::new(),
        }
    }

    /// Queue an event for watchers
    pub(crate) fn emit<T: serde::Serialize>(&mut self, event: &T) -> Result<()> {
        self.events.push(encode(event)?);
        Ok(())
    }

    /// Candidate or participant ID of the issuing session
    pub(crate) fn member_id(&self) -> String {
        self.session.to_string()
    }
}

/// Decode a typed operation, run it, and encode its output
pub(crate) fn handle<O, F>(request: &Request, f: F) -> Result<Bytes>
where
    O: Operation,
    F: FnOnce(O) -> Result<O::Output>,
{
    let operation: O = request.decode()?;
    encode(&f(operation)?)
}

pub(crate) fn unknown_method(request: &Request) -> Error {
    Error::rpc(format!("unknown method {}", request.method))
}

/// Behavior shared by all machines
pub(crate) trait StateMachine: Send {
    /// Apply a mutating operation
    fn command(&mut self, ctx: &mut Context, request: &Request) -> Result<Bytes>;

    /// Answer a read
    fn query(&self, request: &Request) -> Result<Bytes>;

    /// Items of a query stream
    fn iterate(&self, request: &Request) -> Result<Vec<Bytes>> {
        Err(unknown_method(request))
    }

    /// Events describing the current state, sent first to replaying watchers
    fn replay(&self) -> Result<Vec<Bytes>> {
        Ok(Vec::new())
    }

    /// Drop state held on behalf of the issuing session
    fn release(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

/// A machine of any primitive type
pub(crate) enum Machine {
    Counter(counter::CounterMachine),
    Election(election::ElectionMachine),
    IndexedMap(indexed_map::IndexedMapMachine),
    LeaderLatch(leader::LeaderMachine),
    List(list::ListMachine),
    Lock(lock::LockMachine),
    Log(log::LogMachine),
    Map(map::MapMachine),
    Set(set::SetMachine),
    Value(value::ValueMachine),
}

impl Machine {
    pub(crate) fn new(primitive_type: PrimitiveType) -> Self {
        match primitive_type {
            PrimitiveType::Counter => Machine::Counter(Default::default()),
            PrimitiveType::Election => Machine::Election(Default::default()),
            PrimitiveType::IndexedMap => Machine::IndexedMap(Default::default()),
            PrimitiveType::LeaderLatch => Machine::LeaderLatch(Default::default()),
            PrimitiveType::List => Machine::List(Default::default()),
            PrimitiveType::Lock => Machine::Lock(Default::default()),
            PrimitiveType::Log => Machine::Log(Default::default()),
            PrimitiveType::Map => Machine::Map(Default::default()),
            PrimitiveType::Set => Machine::Set(Default::default()),
            PrimitiveType::Value => Machine::Value(Default::default()),
        }
    }

    pub(crate) fn get(&self) -> &dyn StateMachine {
        match self {
            Machine::Counter(m) => m,
            Machine::Election(m) => m,
            Machine::IndexedMap(m) => m,
            Machine::LeaderLatch(m) => m,
            Machine::List(m) => m,
            Machine::Lock(m) => m,
            Machine::Log(m) => m,
            Machine::Map(m) => m,
            Machine::Set(m) => m,
            Machine::Value(m) => m,
        }
    }

    pub(crate) fn get_mut(&mut self) -> &mut dyn StateMachine {
        match self {
            Machine::Counter(m) => m,
            Machine::Election(m) => m,
            Machine::IndexedMap(m) => m,
            Machine::LeaderLatch(m) => m,
            Machine::List(m) => m,
            Machine::Lock(m) => m,
            Machine::Log(m) => m,
            Machine::Map(m) => m,
            Machine::Set(m) => m,
            Machine::Value(m) => m,
        }
    }
}
