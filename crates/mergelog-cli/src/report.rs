//! Report sink: fans each accepted record out to the record store and the CSV
//! report.

use std::{fs::File, io, path::Path};

use chrono::{DateTime, SecondsFormat, Utc};
use mergelog_core::{
  pull_request::PullRequestRecord,
  session::SessionContext,
  store::{AppendOutcome, RecordStore},
};
use mergelog_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::warn;

use crate::RunError;

/// CSV header, in column order.
pub const HEADER: [&str; 8] = [
  "repo", "user", "pr_number", "state", "created_at", "merged_at", "assignee", "merged_by",
];

/// Counters for one sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
  pub rows:           usize,
  pub inserted:       usize,
  /// Appends that hit an existing key; these produce no CSV row.
  pub already_stored: usize,
}

#[derive(Serialize)]
struct CsvRow<'r> {
  repo:       &'r str,
  user:       &'r str,
  pr_number:  u64,
  state:      &'r str,
  created_at: String,
  merged_at:  String,
  assignee:   String,
  merged_by:  &'r str,
}

fn timestamp(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Secs, true) }

impl<'r> From<&'r PullRequestRecord> for CsvRow<'r> {
  fn from(r: &'r PullRequestRecord) -> Self {
    Self {
      repo:       &r.repository,
      user:       &r.user,
      pr_number:  r.pr_number,
      state:      &r.state,
      created_at: timestamp(r.created_at),
      merged_at:  timestamp(r.merged_at),
      assignee:   r.assignees.to_string(),
      merged_by:  &r.merged_by,
    }
  }
}

/// Writes one CSV row per record and, when persisting, appends it to the
/// store first. A record the store already holds gets no CSV row, so the
/// report matches what this session stored.
pub struct ReportSink<'a, S, W: io::Write> {
  writer:  csv::Writer<W>,
  persist: Option<(&'a S, &'a SessionContext)>,
  summary: ReportSummary,
}

impl<'a, S: RecordStore> ReportSink<'a, S, File> {
  /// Create (or truncate) the report file at `path`.
  pub fn create(path: &Path) -> Result<Self, RunError> { Self::new(File::create(path)?) }
}

impl<'a, S: RecordStore, W: io::Write> ReportSink<'a, S, W> {
  pub fn new(writer: W) -> Result<Self, RunError> {
    let mut writer = csv::WriterBuilder::new()
      .has_headers(false)
      .from_writer(writer);
    writer.write_record(HEADER)?;
    Ok(Self { writer, persist: None, summary: ReportSummary::default() })
  }

  /// Append every record to `store`, stamped with `session`.
  pub fn persist_to(mut self, store: &'a S, session: &'a SessionContext) -> Self {
    self.persist = Some((store, session));
    self
  }

  pub async fn write(&mut self, record: &PullRequestRecord) -> Result<(), RunError> {
    if let Some((store, session)) = self.persist {
      let outcome = store
        .append(record, session)
        .await
        .map_err(|e| RunError::Store(Box::new(e)))?;
      match outcome {
        AppendOutcome::Inserted => self.summary.inserted += 1,
        AppendOutcome::AlreadyStored => {
          warn!(
            repository = %record.repository,
            pr = record.pr_number,
            "already stored by another writer; not reported"
          );
          self.summary.already_stored += 1;
          return Ok(());
        }
      }
    }

    self.writer.serialize(CsvRow::from(record))?;
    self.summary.rows += 1;
    Ok(())
  }

  /// Flush the report and return the counters.
  pub fn finish(mut self) -> Result<ReportSummary, RunError> {
    self.writer.flush()?;
    Ok(self.summary)
  }
}

/// Open an existing database for the `report` command. A missing file is a
/// usage error and is not created.
pub async fn open_existing(path: &Path) -> Result<SqliteStore, RunError> {
  if !path.is_file() {
    return Err(RunError::Usage(format!("no database at {}", path.display())));
  }
  Ok(SqliteStore::open(path).await?)
}
