//! Run orchestration for the `mergelog` binary.
//!
//! Fetches every repository of an organisation, streams each one's closed pull
//! requests through [`mergelog_core::ingest::Ingestion`], and fans the
//! accepted records out to a CSV report and the SQLite record store.

pub mod cli;
pub mod error;
pub mod logging;
pub mod report;
pub mod run;
pub mod settings;

pub use error::RunError;
