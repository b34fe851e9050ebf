//! Tracks how long each application holds focus, aggregates it per day in SQLite and enforces
//! daily budgets and blocklists by terminating the offending process.
//!
//! The daemon samples the focused window once per second, see [daemon::start_daemon]. The cli
//! reads the same database for reports and exports.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod utils;
pub mod window_api;
