//! Async HTTP client wrapping the GitHub REST API.

use std::time::Duration;

use reqwest::{
  Client, Response, StatusCode,
  header::{ACCEPT, HeaderMap, LINK},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
  Error, Result,
  pages::{PullRequestPages, link_rel, next_link, page_number},
  wire::{Organization, Repository, WirePullRequest},
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Items requested per page; GitHub's maximum.
pub(crate) const PER_PAGE: u32 = 100;

/// Connection settings for the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubConfig {
  pub api_url:    String,
  pub token:      String,
  pub user_agent: String,
  pub timeout:    Duration,
}

impl GithubConfig {
  pub fn new(token: impl Into<String>) -> Self {
    Self {
      api_url:    DEFAULT_API_URL.to_owned(),
      token:      token.into(),
      user_agent: concat!("mergelog/", env!("CARGO_PKG_VERSION")).to_owned(),
      timeout:    Duration::from_secs(30),
    }
  }
}

/// Async client for the GitHub REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct GithubClient {
  client: Client,
  config: GithubConfig,
}

impl GithubClient {
  /// Build a client. Fails with [`Error::MissingToken`] when the token is
  /// empty, before any request is made.
  pub fn new(config: GithubConfig) -> Result<Self> {
    if config.token.trim().is_empty() {
      return Err(Error::MissingToken);
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(config.user_agent.clone())
      .build()?;
    Ok(Self { client, config })
  }

  pub(crate) fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
  }

  async fn send(&self, url: &str) -> Result<Response> {
    let resp = self
      .client
      .get(url)
      .bearer_auth(&self.config.token)
      .header(ACCEPT, "application/vnd.github+json")
      .send()
      .await?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let rate_limited = rate_limit_exhausted(status, resp.headers());
    let reset_at = resp
      .headers()
      .get("x-ratelimit-reset")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.parse().ok());
    let body = resp.text().await.unwrap_or_default();

    Err(match status {
      StatusCode::UNAUTHORIZED => Error::Unauthorized,
      _ if rate_limited => Error::RateLimited { reset_at },
      _ => Error::Status { status: status.as_u16(), url: url.to_owned(), body },
    })
  }

  /// `GET url`, decoding the body and returning the `rel="next"` link.
  pub(crate) async fn get_page<T: DeserializeOwned>(
    &self,
    url: &str,
  ) -> Result<(T, Option<String>)> {
    let resp = self.send(url).await?;
    let next = resp
      .headers()
      .get(LINK)
      .and_then(|v| v.to_str().ok())
      .and_then(next_link);
    let bytes = resp.bytes().await?;
    let body = serde_json::from_slice(&bytes)
      .map_err(|source| Error::Decode { url: url.to_owned(), source })?;
    debug!(url, has_next = next.is_some(), "fetched");
    Ok((body, next))
  }

  async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
    Ok(self.get_page(url).await?.0)
  }

  /// `GET /user`; verifies the credential before any ingestion.
  pub async fn authenticate(&self) -> Result<String> {
    #[derive(serde::Deserialize)]
    struct Me {
      login: String,
    }
    let me: Me = self.get(&self.url("/user")).await?;
    Ok(me.login)
  }

  /// `GET /orgs/{org}`
  pub async fn organization(&self, org: &str) -> Result<Organization> {
    self.get(&self.url(&format!("/orgs/{org}"))).await
  }

  /// Number of members of `org`, read from the `rel="last"` link of a
  /// one-per-page `GET /orgs/{org}/members` rather than walking every page.
  pub async fn member_count(&self, org: &str) -> Result<u64> {
    let url = self.url(&format!("/orgs/{org}/members?per_page=1"));
    let resp = self.send(&url).await?;
    let last_page = resp
      .headers()
      .get(LINK)
      .and_then(|v| v.to_str().ok())
      .and_then(|h| link_rel(h, "last"))
      .and_then(|last| page_number(&last));
    if let Some(count) = last_page {
      return Ok(count);
    }

    // Single page: zero or one member.
    let bytes = resp.bytes().await?;
    let members: Vec<serde_json::Value> = serde_json::from_slice(&bytes)
      .map_err(|source| Error::Decode { url: url.clone(), source })?;
    Ok(members.len() as u64)
  }

  /// `GET /orgs/{org}/repos`, most recently updated first, all pages.
  pub async fn repositories(&self, org: &str) -> Result<Vec<Repository>> {
    let mut next = Some(self.url(&format!(
      "/orgs/{org}/repos?type=member&sort=updated&direction=desc&per_page={PER_PAGE}"
    )));
    let mut repos = Vec::new();
    while let Some(url) = next.take() {
      let (page, link): (Vec<Repository>, _) = self.get_page(&url).await?;
      repos.extend(page);
      next = link;
    }
    Ok(repos)
  }

  /// Closed pull requests of `full_name`, most recently updated first.
  /// Nothing is fetched until the first page is requested.
  pub fn closed_pulls(&self, full_name: &str) -> PullRequestPages {
    let first = self.url(&format!(
      "/repos/{full_name}/pulls?state=closed&sort=updated&direction=desc&per_page={PER_PAGE}"
    ));
    PullRequestPages::new(self.clone(), full_name, first)
  }

  /// `GET /repos/{full_name}/pulls/{number}`
  pub(crate) async fn pull_request(
    &self,
    full_name: &str,
    number: u64,
  ) -> Result<WirePullRequest> {
    self
      .get(&self.url(&format!("/repos/{full_name}/pulls/{number}")))
      .await
  }
}

fn rate_limit_exhausted(status: StatusCode, headers: &HeaderMap) -> bool {
  if status == StatusCode::TOO_MANY_REQUESTS {
    return true;
  }
  status == StatusCode::FORBIDDEN
    && headers
      .get("x-ratelimit-remaining")
      .and_then(|v| v.to_str().ok())
      == Some("0")
}
