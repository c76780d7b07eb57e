//! JSON shapes returned by the GitHub REST API, and their conversion into
//! `mergelog-core` types. Only the fields this crate reads are declared.

use chrono::{DateTime, Utc};
use mergelog_core::pull_request::PullRequest;
use serde::{Deserialize, Serialize};

/// Login used by GitHub for deleted accounts.
const GHOST_LOGIN: &str = "ghost";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUser {
  pub login: String,
}

/// A pull request from `GET /repos/{owner}/{repo}/pulls[/{number}]`.
///
/// The list endpoint omits `merged` and `merged_by`; the detail endpoint
/// includes both.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WirePullRequest {
  pub number:     u64,
  pub state:      String,
  pub user:       Option<WireUser>,
  pub created_at: DateTime<Utc>,
  pub merged_at:  Option<DateTime<Utc>>,
  #[serde(default)]
  pub assignees:  Option<Vec<WireUser>>,
  #[serde(default)]
  pub merged_by:  Option<WireUser>,
  #[serde(default)]
  pub merged:     Option<bool>,
}

impl From<WirePullRequest> for PullRequest {
  fn from(w: WirePullRequest) -> Self {
    Self {
      number:     w.number,
      author:     w.user.map_or_else(|| GHOST_LOGIN.to_owned(), |u| u.login),
      state:      w.state,
      created_at: w.created_at,
      merged_at:  w.merged_at,
      assignees:  w
        .assignees
        .map(|a| a.into_iter().map(|u| u.login).collect()),
      merged_by:  w.merged_by.map(|u| u.login),
      merged:     w.merged.unwrap_or(w.merged_at.is_some()),
    }
  }
}

/// A repository from `GET /orgs/{org}/repos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
  pub name:      String,
  /// `owner/name`; used as the repository identity in records.
  pub full_name: String,
}

/// An organisation from `GET /orgs/{org}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub login:        String,
  pub name:         Option<String>,
  #[serde(default)]
  pub public_repos: Option<u64>,
}

impl Organization {
  pub fn display_name(&self) -> &str { self.name.as_deref().unwrap_or(&self.login) }
}
