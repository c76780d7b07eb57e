//! Error types for `mergelog-core`.

use thiserror::Error;

/// Boxed error carried across the source and store trait boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("repository name must not be empty")]
  EmptyRepository,

  /// A pull request reached normalisation without merge information.
  #[error("pull request #{0} has no merge information")]
  NotMerged(u64),

  #[error("pull-request source error: {0}")]
  Source(#[source] BoxError),

  #[error("record store error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  pub fn source_fault(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Source(Box::new(e))
  }

  pub fn store_fault(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
