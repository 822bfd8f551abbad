//! Primitive clients
//!
//! Each distributed primitive is a thin client over a [`Primitive`], the
//! shared scaffold that binds a primitive name to its database's sessions,
//! routes every call to one partition, and checks structured response
//! statuses:
//! - **Counter**, **Value**: single-cell state
//! - **Map**, **IndexedMap**, **Set**, **List**, **Log**: collections with
//!   streaming reads and watches
//! - **Lock**, **Election**, **LeaderLatch**: coordination tied to the
//!   session that holds them
//!
//! Per-call behavior is tuned with option decorators (see [`options`]).
//!
//! ## Ownership
//!
//! Clients hold shared references to sessions owned by the database. A
//! client's `close()` only releases the state its session holds for that
//! primitive; sessions are closed by the database.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod counter;
pub mod election;
pub mod indexed_map;
pub mod leader;
pub mod list;
pub mod lock;
pub mod log;
pub mod map;
pub mod options;
pub mod primitive;
pub mod set;
pub mod value;

pub use counter::Counter;
pub use election::{Election, ElectionEvent, Term};
pub use indexed_map::{IndexedEntry, IndexedMap, IndexedMapEvent, IndexedMapEventKind};
pub use leader::{Latch, LatchEvent, LeaderLatch};
pub use list::{List, ListEvent, ListEventKind};
pub use lock::Lock;
pub use log::{Log, LogEntry, LogEvent, LogEventKind};
pub use map::{Map, MapEntry, MapEvent, MapEventKind};
pub use options::{
    decorate_request, decorate_response, with_default, with_replay, with_version, Decorator,
    GetOption, PutOption, RemoveOption, SetOption, Version, WatchOption,
};
pub use primitive::{route, EventStream, ItemStream, Primitive};
pub use set::{Set, SetEvent, SetEventKind};
pub use value::{Value, ValueEvent};
