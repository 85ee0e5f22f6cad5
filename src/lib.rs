//! studytrack - study task tracker core
//!
//! Task management for language learners: categorized, prioritized study
//! tasks with due dates, a pausable study timer that books time against a
//! task, and progress statistics. The presentation layer is abstract; the
//! bundled CLI is one implementation of it.
//!
//! # Module Organization
//!
//! - `storage`: key/value persistence backends and the task list adapter
//! - `task`: task model and the task store
//! - `filter`: search/category/priority/status filtering and ordering
//! - `stats`: totals, completion rate and histograms
//! - `timer`: study timer state machine
//! - `ticker`: cancelable one-second tick source
//! - `theme`: persisted light/dark preference
//! - `session`: presenter trait, intents and the event loop
//! - `config`: `studytrack.toml` loading
//! - `lock`: file locking and atomic writes
//! - `output`: human and JSON command output
//! - `cli`: command-line interface using clap

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod lock;
pub mod output;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;
pub mod theme;
pub mod ticker;
pub mod timer;

pub use error::{Error, Result};
