//! Run-level error taxonomy and process exit codes.

use mergelog_core::error::BoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
  /// Missing or malformed run parameters. Nothing has been touched yet.
  #[error("usage error: {0}")]
  Usage(String),

  /// Missing or rejected credential. No ingestion was attempted.
  #[error("authentication error: {0}")]
  Authentication(String),

  /// Fetching from the pull-request source failed. Rows already committed
  /// stay in the store.
  #[error("pull-request source error: {0}")]
  Source(#[source] BoxError),

  #[error("record store error: {0}")]
  Store(#[source] BoxError),

  #[error("report output error: {0}")]
  Report(#[from] csv::Error),
}

impl RunError {
  pub fn exit_code(&self) -> u8 {
    match self {
      Self::Usage(_) => 2,
      Self::Authentication(_) => 3,
      Self::Source(_) => 4,
      Self::Store(_) => 5,
      Self::Report(_) => 6,
    }
  }
}

impl From<mergelog_core::Error> for RunError {
  fn from(e: mergelog_core::Error) -> Self {
    use mergelog_core::Error as Core;
    match e {
      Core::Store(inner) => Self::Store(inner),
      Core::Source(inner) => Self::Source(inner),
      // Both mean the source handed us inconsistent data.
      other @ (Core::EmptyRepository | Core::NotMerged(_)) => Self::Source(Box::new(other)),
    }
  }
}

impl From<mergelog_github::Error> for RunError {
  fn from(e: mergelog_github::Error) -> Self {
    if e.is_authentication() {
      Self::Authentication(e.to_string())
    } else {
      Self::Source(Box::new(e))
    }
  }
}

impl From<mergelog_store_sqlite::Error> for RunError {
  fn from(e: mergelog_store_sqlite::Error) -> Self { Self::Store(Box::new(e)) }
}

impl From<std::io::Error> for RunError {
  fn from(e: std::io::Error) -> Self { Self::Report(e.into()) }
}
