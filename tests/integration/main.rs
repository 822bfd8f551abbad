//! End-to-end suites through the public facade

#[path = "../common/mod.rs"]
mod common;

mod database;
mod primitives;
mod sessions;
mod tcp;
