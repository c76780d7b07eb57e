//! Command-line arguments.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "mergelog", version, about = "Ingest recently merged pull requests of a GitHub organisation")]
pub struct Cli {
  /// Path to a TOML configuration file.
  #[arg(short, long, global = true, default_value = "mergelog.toml")]
  pub config: PathBuf,

  /// SQLite database file (overrides the configuration).
  #[arg(long, global = true, value_name = "FILE")]
  pub database: Option<PathBuf>,

  /// Directory for per-session log files (overrides the configuration).
  #[arg(long, global = true, value_name = "DIR")]
  pub log_dir: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Fetch merged pull requests and write the CSV report and database rows.
  Ingest(IngestArgs),
  /// Print previously stored pull requests as CSV.
  Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct IngestArgs {
  /// Earliest merge date to include: `YYYY-MM-DD` (UTC midnight) or RFC 3339.
  #[arg(value_parser = parse_cutoff)]
  pub from_date: DateTime<Utc>,

  /// GitHub organisation login.
  pub organization: String,

  /// Also consider closed pull requests that were never merged.
  #[arg(long)]
  pub include_not_merged: bool,

  /// Skip dedup and database writes; only produce the CSV report.
  #[arg(long)]
  pub dry_run: bool,

  /// Repositories to ingest concurrently.
  #[arg(long)]
  pub concurrency: Option<usize>,

  /// CSV output file (overrides the configuration).
  #[arg(short, long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// GitHub token.
  #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
  pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
  #[arg(long)]
  pub repo: Option<String>,

  #[arg(long)]
  pub merged_by: Option<String>,

  /// Only rows merged on or after this date.
  #[arg(long, value_parser = parse_cutoff)]
  pub since: Option<DateTime<Utc>>,

  #[arg(long)]
  pub session: Option<Uuid>,

  #[arg(long)]
  pub limit: Option<usize>,
}

impl Cli {
  /// Apply flag overrides on top of file/env settings.
  pub fn apply(&self, mut settings: Settings) -> Settings {
    if let Some(db) = &self.database {
      settings.database_path = db.clone();
    }
    if let Some(dir) = &self.log_dir {
      settings.log_dir = dir.clone();
    }
    if let Command::Ingest(args) = &self.command {
      if let Some(out) = &args.output {
        settings.output_path = out.clone();
      }
      if let Some(n) = args.concurrency {
        settings.concurrency = n;
      }
    }
    settings
  }
}

/// Parse `YYYY-MM-DD` as midnight UTC, or a full RFC 3339 timestamp.
pub fn parse_cutoff(s: &str) -> Result<DateTime<Utc>, String> {
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
  }
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got {s:?}"))
}
