//! Layered runtime settings: defaults, then an optional TOML file, then
//! `MERGELOG_*` environment variables. CLI flags are applied on top by the
//! binary.

use std::path::{Path, PathBuf};

use mergelog_github::DEFAULT_API_URL;
use serde::Deserialize;

use crate::RunError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub database_path:        PathBuf,
  pub output_path:          PathBuf,
  pub log_dir:              PathBuf,
  pub api_url:              String,
  /// Repositories ingested at once. `1` keeps the organisation's order.
  pub concurrency:          usize,
  /// Records buffered between the ingestion workers and the report sink.
  pub channel_capacity:     usize,
  pub request_timeout_secs: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database_path:        PathBuf::from("./gh.db"),
      output_path:          PathBuf::from("./pull_requests_results.csv"),
      log_dir:              PathBuf::from("./logs"),
      api_url:              DEFAULT_API_URL.to_owned(),
      concurrency:          1,
      channel_capacity:     256,
      request_timeout_secs: 30,
    }
  }
}

impl Settings {
  /// Load settings; a missing file is not an error.
  pub fn load(path: &Path) -> Result<Self, RunError> {
    config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("MERGELOG"))
      .build()
      .and_then(|c| c.try_deserialize())
      .map_err(|e| RunError::Usage(format!("invalid configuration: {e}")))
  }
}
