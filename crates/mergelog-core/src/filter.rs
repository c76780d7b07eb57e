//! Inclusion predicate and projection into [`PullRequestRecord`].

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  pull_request::{Assignees, PullRequest, PullRequestRecord},
};

/// Decide whether `pr` belongs in this run's output.
///
/// A missing merge timestamp is not comparable with the cutoff and excludes
/// the pull request, even when `include_not_merged` is set.
pub fn should_include(
  pr: &PullRequest,
  cutoff: DateTime<Utc>,
  include_not_merged: bool,
) -> bool {
  if !include_not_merged && !pr.is_merged() {
    return false;
  }
  match pr.merged_at {
    Some(merged_at) => merged_at >= cutoff,
    None => false,
  }
}

/// Project a raw pull request into the canonical record shape.
///
/// Merge fields are read unconditionally; callers filter with
/// [`should_include`] first, so [`Error::NotMerged`] signals inconsistent
/// source data.
pub fn normalize(repository: &str, pr: PullRequest) -> Result<PullRequestRecord> {
  if repository.is_empty() {
    return Err(Error::EmptyRepository);
  }
  let (Some(merged_at), Some(merged_by)) = (pr.merged_at, pr.merged_by) else {
    return Err(Error::NotMerged(pr.number));
  };

  Ok(PullRequestRecord {
    repository: repository.to_owned(),
    user: pr.author,
    pr_number: pr.number,
    state: pr.state,
    created_at: pr.created_at,
    merged_at,
    assignees: Assignees::from_handles(pr.assignees),
    merged_by,
  })
}
