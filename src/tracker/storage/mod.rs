//! Durable history of tracked projects.
//!  - [entities] holds the serialized shapes: time entries and per-project reports.
//!  - [project::Project] is the in-memory model a session is tracked against.
//!  - [history_store::JsonHistoryStore] keeps one JSON document mapping project names to their
//!    reports and merges closed sessions into it.

pub mod entities;
pub mod error;
pub mod history_store;
pub mod project;
