//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `mergelog-store-sqlite`). The pipeline and the binary depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  pull_request::{PullRequestRecord, StoredPullRequest},
  session::SessionContext,
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What [`RecordStore::append`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
  Inserted,
  /// A row with the same `(repository, pr_number)` already existed; nothing
  /// was written.
  AlreadyStored,
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RecordStore::list`]. Every filter is optional.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub repository:   Option<String>,
  pub merged_by:    Option<String>,
  pub merged_after: Option<DateTime<Utc>>,
  pub session_id:   Option<Uuid>,
  pub limit:        Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable, append-only table of ingested pull requests keyed by
/// `(repository, pr_number)`.
///
/// Rows are never updated or deleted. Each `append` commits on its own.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether a row for `(repository, pr_number)` is already present.
  fn exists<'a>(
    &'a self,
    repository: &'a str,
    pr_number: u64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Write `record` stamped with the session id, the provenance tag and the
  /// current time. Never overwrites an existing row.
  fn append<'a>(
    &'a self,
    record: &'a PullRequestRecord,
    session: &'a SessionContext,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + 'a;

  /// Read stored rows matching `query`, ordered by merge time.
  fn list<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<StoredPullRequest>, Self::Error>> + Send + 'a;
}
