//! wrk-core library.
//!
//! File-backed coordination for WRK work items: the metadata document
//! format, schemas for the canonical state ledgers, status reconciliation,
//! session snapshots, process gate verification, and the queue audit.
//!
//! # Conventions
//!
//! - **Errors**: one `thiserror` enum per module, each exposing `code()` for
//!   the stable [`error::ErrorCode`]. Nothing here panics or exits.
//! - **Logging**: `tracing` macros. `debug!` for per-item decisions, `info!`
//!   for writes, `warn!` for degraded parses and skipped files.
//! - **Mutation**: single-item writes run under [`lock::ItemLock`] and land via
//!   [`lock::write_atomic`].

#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod config;
pub mod dates;
pub mod document;
pub mod error;
pub mod gates;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod queue;
pub mod scan;
pub mod schema;
pub mod session;

pub use document::Document;
pub use error::ErrorCode;
pub use model::{Location, Status, WorkItemId};
pub use queue::Queue;
