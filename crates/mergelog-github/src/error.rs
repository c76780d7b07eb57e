//! Error type for `mergelog-github`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no GitHub token configured")]
  MissingToken,

  #[error("GitHub rejected the credential")]
  Unauthorized,

  #[error("GitHub rate limit exhausted (resets at {reset_at:?})")]
  RateLimited { reset_at: Option<i64> },

  #[error("GitHub API error {status} for {url}: {body}")]
  Status { status: u16, url: String, body: String },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("unexpected response body from {url}: {source}")]
  Decode {
    url:    String,
    #[source]
    source: serde_json::Error,
  },
}

impl Error {
  /// Whether this error means the credential is missing or invalid.
  pub fn is_authentication(&self) -> bool {
    matches!(self, Self::MissingToken | Self::Unauthorized)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
