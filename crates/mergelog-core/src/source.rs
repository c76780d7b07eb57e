//! The `PullRequestSource` trait: a paginated, lazily fetched stream of closed
//! pull requests for one repository.

use std::{collections::VecDeque, convert::Infallible, future::Future};

use crate::pull_request::PullRequest;

/// A paginated source of closed pull requests, consumed in its native order.
///
/// Each call to [`Self::next_page`] may block on network I/O. Faults are not
/// retried by the pipeline.
pub trait PullRequestSource: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the next page, or `None` once the source is exhausted.
  fn next_page(
    &mut self,
  ) -> impl Future<Output = Result<Option<Vec<PullRequest>>, Self::Error>> + Send + '_;

  /// Complete fields the listing left out (e.g. the merging user). Called
  /// only for pull requests that will be yielded.
  fn hydrate(
    &mut self,
    pr: PullRequest,
  ) -> impl Future<Output = Result<PullRequest, Self::Error>> + Send + '_ {
    async move { Ok(pr) }
  }
}

/// An in-memory source that serves pre-built pages in order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
  pages: VecDeque<Vec<PullRequest>>,
}

impl MemorySource {
  pub fn new(pages: impl IntoIterator<Item = Vec<PullRequest>>) -> Self {
    Self { pages: pages.into_iter().collect() }
  }

  /// Split `items` into pages of `page_size`.
  pub fn paged(items: Vec<PullRequest>, page_size: usize) -> Self {
    let size = page_size.max(1);
    Self::new(items.chunks(size).map(<[PullRequest]>::to_vec))
  }
}

impl PullRequestSource for MemorySource {
  type Error = Infallible;

  async fn next_page(&mut self) -> Result<Option<Vec<PullRequest>>, Infallible> {
    Ok(self.pages.pop_front())
  }
}
