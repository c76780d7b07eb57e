//! Core types and trait definitions for the mergelog ingestion pipeline.
//!
//! No HTTP or database dependencies live here. The GitHub client and the
//! SQLite store plug in through the
//! [`source::PullRequestSource`] and [`store::RecordStore`] traits.

pub mod error;
pub mod filter;
pub mod ingest;
pub mod pull_request;
pub mod session;
pub mod source;
pub mod store;

pub use error::{Error, Result};
