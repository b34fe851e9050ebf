//! Storage is organized around a single SQLite table, `track`.
//! The basic idea is:
//!   - A row exists per canonical title per local calendar day.
//!   - The sampling loop is the only writer; every successful tick adds one second to a row.
//!   - Reporting opens its own read-only connection. The database runs in WAL mode, so readers
//!     only ever see fully committed upserts.

pub mod entities;
pub mod queries;
pub mod schema;
pub mod usage_store;
