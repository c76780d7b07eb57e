//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 strings (microseconds, `Z` suffix) so
//! they sort lexically. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use mergelog_core::pull_request::{Assignees, PullRequestRecord, StoredPullRequest};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Raw row ──────────────────────────────────────────────────────────────────

/// A `pull_requests` row as read from SQLite, before decoding.
pub struct RawStoredPullRequest {
  pub session_id:    String,
  pub source:        String,
  pub repo:          String,
  pub user:          String,
  pub pr_number:     i64,
  pub state:         String,
  pub created_at:    String,
  pub merged_at:     String,
  pub assignee:      String,
  pub merged_by:     String,
  pub created_at_ts: String,
  pub updated_at_ts: String,
}

impl RawStoredPullRequest {
  /// Column list matching the field order read by [`Self::from_row`].
  pub const COLUMNS: &'static str = "session_id, source, repo, user, pr_number, state, \
     created_at, merged_at, assignee, merged_by, created_at_ts, updated_at_ts";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:    row.get(0)?,
      source:        row.get(1)?,
      repo:          row.get(2)?,
      user:          row.get(3)?,
      pr_number:     row.get(4)?,
      state:         row.get(5)?,
      created_at:    row.get(6)?,
      merged_at:     row.get(7)?,
      assignee:      row.get(8)?,
      merged_by:     row.get(9)?,
      created_at_ts: row.get(10)?,
      updated_at_ts: row.get(11)?,
    })
  }

  pub fn into_stored(self) -> Result<StoredPullRequest> {
    let pr_number =
      u64::try_from(self.pr_number).map_err(|_| Error::PrNumber(self.pr_number))?;

    Ok(StoredPullRequest {
      record:      PullRequestRecord {
        repository: self.repo,
        user: self.user,
        pr_number,
        state: self.state,
        created_at: decode_dt(&self.created_at)?,
        merged_at: decode_dt(&self.merged_at)?,
        assignees: Assignees::from_joined(&self.assignee),
        merged_by: self.merged_by,
      },
      session_id:  decode_uuid(&self.session_id)?,
      source:      self.source,
      inserted_at: decode_dt(&self.created_at_ts)?,
      updated_at:  decode_dt(&self.updated_at_ts)?,
    })
  }
}
