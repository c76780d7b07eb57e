//! Paginated closed-PR source for one repository.

use mergelog_core::{pull_request::PullRequest, source::PullRequestSource};
use tracing::debug;

use crate::{Error, GithubClient, wire::WirePullRequest};

/// Lazily walks `Link: rel="next"` pages of a repository's closed pull
/// requests. Single-pass.
pub struct PullRequestPages {
  client:    GithubClient,
  full_name: String,
  next_url:  Option<String>,
}

impl PullRequestPages {
  pub(crate) fn new(client: GithubClient, full_name: &str, first: String) -> Self {
    Self { client, full_name: full_name.to_owned(), next_url: Some(first) }
  }

  pub fn repository(&self) -> &str { &self.full_name }
}

impl PullRequestSource for PullRequestPages {
  type Error = Error;

  async fn next_page(&mut self) -> Result<Option<Vec<PullRequest>>, Error> {
    let Some(url) = self.next_url.take() else {
      return Ok(None);
    };
    let (page, next): (Vec<WirePullRequest>, _) = self.client.get_page(&url).await?;
    self.next_url = next;
    Ok(Some(page.into_iter().map(PullRequest::from).collect()))
  }

  /// The list endpoint never includes the merging user; fetch the detail for
  /// merged pull requests that lack it.
  async fn hydrate(&mut self, pr: PullRequest) -> Result<PullRequest, Error> {
    if !pr.merged || pr.merged_by.is_some() {
      return Ok(pr);
    }
    debug!(repository = %self.full_name, pr = pr.number, "fetching merge details");
    let detail = PullRequest::from(self.client.pull_request(&self.full_name, pr.number).await?);
    Ok(PullRequest {
      merged_by: detail.merged_by,
      merged: detail.merged,
      merged_at: detail.merged_at.or(pr.merged_at),
      ..pr
    })
  }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
pub(crate) fn next_link(header: &str) -> Option<String> { link_rel(header, "next") }

/// Extract the target of relation `rel` from an RFC 8288 `Link` header.
pub(crate) fn link_rel(header: &str, rel: &str) -> Option<String> {
  header.split(',').find_map(|part| {
    let (target, params) = part.split_once(';')?;
    let matches_rel = params.split(';').any(|p| {
      p.trim()
        .strip_prefix("rel=")
        .is_some_and(|v| v.trim_matches('"') == rel)
    });
    matches_rel.then(|| {
      target
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_owned()
    })
  })
}

/// The `page` query parameter of a pagination URL.
pub(crate) fn page_number(url: &str) -> Option<u64> {
  let (_, query) = url.split_once('?')?;
  query
    .split('&')
    .find_map(|kv| kv.strip_prefix("page="))
    .and_then(|n| n.parse().ok())
}
