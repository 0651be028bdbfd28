//! tm - Task minutes library
//!
//! Core of the tm time tracker: tasks are started and stopped by name, and
//! every successful command is appended to a plain-text log. On startup the
//! log is replayed in file order to rebuild task state.
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.tm.toml`
//! - `error`: Error types, exit codes and result aliases
//! - `lock`: Single-writer file locking for the log
//! - `output`: Human and JSON output
//! - `record`: Log record model, parsing and formatting
//! - `replay`: Rebuilds task state from the log
//! - `storage`: Reading and appending the log file
//! - `task`: Task state machine and the in-memory task store
//!
//! Concurrent invocations against the same log are not supported. Writers
//! take an exclusive lock so that a second writer fails instead of
//! interleaving records.

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod record;
pub mod replay;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
