//! Tracing setup: INFO (or `RUST_LOG`) on the console, DEBUG in a per-session
//! log file.

use std::{
  fs::{self, File},
  path::{Path, PathBuf},
  sync::Mutex,
};

use anyhow::Context as _;
use mergelog_core::session::SessionContext;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Noisy dependencies are kept at INFO even in the debug log file.
const FILE_DIRECTIVES: &str = "debug,hyper=info,hyper_util=info,reqwest=info,rustls=info,h2=info";

/// Install the global subscriber. Returns the path of this session's log
/// file, `{log_dir}/{session_id}.log`.
pub fn init(log_dir: &Path, session: &SessionContext) -> anyhow::Result<PathBuf> {
  fs::create_dir_all(log_dir)
    .with_context(|| format!("creating log directory {}", log_dir.display()))?;
  let path = log_dir.join(format!("{}.log", session.id()));
  let file = File::create(&path)
    .with_context(|| format!("creating log file {}", path.display()))?;

  let console = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    );

  let file_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_writer(Mutex::new(file))
    .with_filter(EnvFilter::new(FILE_DIRECTIVES));

  tracing_subscriber::registry()
    .with(console)
    .with(file_layer)
    .try_init()
    .context("installing tracing subscriber")?;

  Ok(path)
}

/// Console-only logging for commands that do not start a session.
pub fn init_console() {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();
}
