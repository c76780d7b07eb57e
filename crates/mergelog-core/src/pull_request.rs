//! Pull-request types: the raw item a source yields, the canonical record the
//! pipeline produces, and the stored row the record store keeps.
//!
//! Records are immutable once produced. A stored row is written exactly once
//! and never updated.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provenance tag stamped on every row this pipeline writes.
pub const PROVENANCE_TAG: &str = "script";

/// Textual form of [`Assignees::NoneAssigned`] in reports and storage.
///
/// The column format has no escape, so a sole assignee whose login is exactly
/// `NF` is written identically and reads back as
/// [`Assignees::NoneAssigned`]. Other spellings (`nf`) and multi-assignee
/// lists containing `NF` are unaffected.
pub const NONE_ASSIGNED: &str = "NF";

// ─── Raw ─────────────────────────────────────────────────────────────────────

/// A closed pull request as yielded by a [`crate::source::PullRequestSource`].
///
/// Fields that the source may not know yet (`merged_by` on list endpoints) are
/// optional; see [`crate::source::PullRequestSource::hydrate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
  pub number:     u64,
  pub author:     String,
  pub state:      String,
  pub created_at: DateTime<Utc>,
  pub merged_at:  Option<DateTime<Utc>>,
  /// `None` when the source omitted the list altogether.
  pub assignees:  Option<Vec<String>>,
  pub merged_by:  Option<String>,
  pub merged:     bool,
}

impl PullRequest {
  pub fn is_merged(&self) -> bool { self.merged }
}

// ─── Assignees ───────────────────────────────────────────────────────────────

/// Ordered assignee handles, or the explicit "none assigned" sentinel.
///
/// An empty handle list never exists; it is always [`Self::NoneAssigned`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "handles", rename_all = "snake_case")]
pub enum Assignees {
  NoneAssigned,
  Users(Vec<String>),
}

impl Assignees {
  pub fn from_handles(handles: Option<Vec<String>>) -> Self {
    match handles {
      Some(h) if !h.is_empty() => Self::Users(h),
      _ => Self::NoneAssigned,
    }
  }

  /// Parse the joined column form written by [`fmt::Display`].
  ///
  /// Lossy for a lone `NF` login; see [`NONE_ASSIGNED`].
  pub fn from_joined(s: &str) -> Self {
    if s == NONE_ASSIGNED || s.is_empty() {
      return Self::NoneAssigned;
    }
    Self::Users(s.split(',').map(str::to_owned).collect())
  }

  pub fn handles(&self) -> &[String] {
    match self {
      Self::NoneAssigned => &[],
      Self::Users(h) => h,
    }
  }
}

impl fmt::Display for Assignees {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NoneAssigned => f.write_str(NONE_ASSIGNED),
      Self::Users(h) => f.write_str(&h.join(",")),
    }
  }
}

// ─── Canonical record ────────────────────────────────────────────────────────

/// The canonical shape of an ingested, merged pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
  pub repository: String,
  pub user:       String,
  pub pr_number:  u64,
  pub state:      String,
  pub created_at: DateTime<Utc>,
  pub merged_at:  DateTime<Utc>,
  pub assignees:  Assignees,
  pub merged_by:  String,
}

// ─── Stored row ──────────────────────────────────────────────────────────────

/// A [`PullRequestRecord`] together with the audit columns the store adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPullRequest {
  pub record:      PullRequestRecord,
  pub session_id:  Uuid,
  pub source:      String,
  /// Store-assigned; never changes after insertion.
  pub inserted_at: DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}
