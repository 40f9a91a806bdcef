//! profiled library - project-namespaced instance profiles with layered config
//! resolution.
//!
//! This library exposes the core functionality of the `profiled` CLI for use in
//! tests and other applications.
//!
//! # Modules
//!
//! - `db`: SQLite database handle, schema and transactions
//! - `project`: Projects and the per-project profiles feature
//! - `profile`: Profile store, expansion, usage scan and pruning
//! - `instance`: Instances that apply profiles
//! - `config`: Settings and declarative definition files
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod instance;
pub mod logging;
pub mod profile;
pub mod project;

pub use db::Database;
pub use error::{Error, Result};
