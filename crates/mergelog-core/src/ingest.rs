//! The ingestion pipeline: source → filter → dedup → normalize.
//!
//! [`Ingestion`] is a single-pass async pull iterator. It buffers at most one
//! page from the source, so an organisation's history is never materialised
//! in memory. Dedup consults live store state on every candidate, which is why
//! the sequence cannot be restarted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::{
  Error, Result,
  filter::{normalize, should_include},
  pull_request::{PullRequest, PullRequestRecord},
  source::PullRequestSource,
  store::RecordStore,
};

/// Running counters for one repository's ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
  pub seen:       usize,
  pub filtered:   usize,
  pub duplicates: usize,
  pub yielded:    usize,
}

impl std::ops::AddAssign for IngestStats {
  fn add_assign(&mut self, rhs: Self) {
    self.seen += rhs.seen;
    self.filtered += rhs.filtered;
    self.duplicates += rhs.duplicates;
    self.yielded += rhs.yielded;
  }
}

/// Lazy ingestion of one repository's closed pull requests.
pub struct Ingestion<'a, Src, St> {
  repository:         String,
  source:             Src,
  /// Without a store, dedup is skipped and every filtered record is yielded.
  store:              Option<&'a St>,
  cutoff:             DateTime<Utc>,
  include_not_merged: bool,
  buffer:             VecDeque<PullRequest>,
  exhausted:          bool,
  stats:              IngestStats,
}

impl<'a, Src, St> Ingestion<'a, Src, St>
where
  Src: PullRequestSource,
  St: RecordStore,
{
  pub fn new(
    repository: impl Into<String>,
    source: Src,
    cutoff: DateTime<Utc>,
    include_not_merged: bool,
  ) -> Self {
    Self {
      repository: repository.into(),
      source,
      store: None,
      cutoff,
      include_not_merged,
      buffer: VecDeque::new(),
      exhausted: false,
      stats: IngestStats::default(),
    }
  }

  /// Skip pull requests already present in `store`.
  pub fn dedup_against(mut self, store: &'a St) -> Self {
    self.store = Some(store);
    self
  }

  pub fn repository(&self) -> &str { &self.repository }

  pub fn stats(&self) -> IngestStats { self.stats }

  /// Produce the next accepted record, or `None` when the source is drained.
  pub async fn next(&mut self) -> Result<Option<PullRequestRecord>> {
    while let Some(pr) = self.next_candidate().await? {
      self.stats.seen += 1;

      if !should_include(&pr, self.cutoff, self.include_not_merged) {
        debug!(repository = %self.repository, pr = pr.number, "filtered out");
        self.stats.filtered += 1;
        continue;
      }

      if let Some(store) = self.store
        && store
          .exists(&self.repository, pr.number)
          .await
          .map_err(Error::store_fault)?
      {
        debug!(
          repository = %self.repository,
          pr = pr.number,
          "skipping pull request already stored in database"
        );
        self.stats.duplicates += 1;
        continue;
      }

      let pr = self.source.hydrate(pr).await.map_err(Error::source_fault)?;
      let record = normalize(&self.repository, pr)?;
      self.stats.yielded += 1;
      return Ok(Some(record));
    }
    Ok(None)
  }

  async fn next_candidate(&mut self) -> Result<Option<PullRequest>> {
    loop {
      if let Some(pr) = self.buffer.pop_front() {
        return Ok(Some(pr));
      }
      if self.exhausted {
        return Ok(None);
      }
      match self.source.next_page().await.map_err(Error::source_fault)? {
        Some(page) => {
          trace!(repository = %self.repository, items = page.len(), "fetched page");
          self.buffer.extend(page);
        }
        None => self.exhausted = true,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{convert::Infallible, sync::Mutex};

  use chrono::TimeZone;

  use super::*;
  use crate::{
    pull_request::{PROVENANCE_TAG, StoredPullRequest},
    session::SessionContext,
    source::MemorySource,
    store::{AppendOutcome, RecordQuery},
  };

  // ─── Fixtures ──────────────────────────────────────────────────────────────

  #[derive(Default)]
  struct MemoryStore {
    rows: Mutex<Vec<StoredPullRequest>>,
  }

  impl MemoryStore {
    fn len(&self) -> usize { self.rows.lock().unwrap().len() }
  }

  impl RecordStore for MemoryStore {
    type Error = Infallible;

    async fn exists(&self, repository: &str, pr_number: u64) -> Result<bool, Infallible> {
      Ok(self.rows.lock().unwrap().iter().any(|r| {
        r.record.repository == repository && r.record.pr_number == pr_number
      }))
    }

    async fn append(
      &self,
      record: &PullRequestRecord,
      session: &SessionContext,
    ) -> Result<AppendOutcome, Infallible> {
      if self.exists(&record.repository, record.pr_number).await? {
        return Ok(AppendOutcome::AlreadyStored);
      }
      let now = Utc::now();
      self.rows.lock().unwrap().push(StoredPullRequest {
        record:      record.clone(),
        session_id:  session.id(),
        source:      PROVENANCE_TAG.to_owned(),
        inserted_at: now,
        updated_at:  now,
      });
      Ok(AppendOutcome::Inserted)
    }

    async fn list(&self, _query: &RecordQuery) -> Result<Vec<StoredPullRequest>, Infallible> {
      Ok(self.rows.lock().unwrap().clone())
    }
  }

  #[derive(Debug, thiserror::Error)]
  #[error("network unreachable")]
  struct Unreachable;

  /// Serves one page, then fails.
  struct FlakySource {
    first: Option<Vec<PullRequest>>,
  }

  impl PullRequestSource for FlakySource {
    type Error = Unreachable;

    async fn next_page(&mut self) -> Result<Option<Vec<PullRequest>>, Unreachable> {
      self.first.take().map(Some).ok_or(Unreachable)
    }
  }

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
  }

  fn merged(number: u64, merged_at: DateTime<Utc>) -> PullRequest {
    PullRequest {
      number,
      author:     "octocat".into(),
      state:      "closed".into(),
      created_at: merged_at - chrono::Duration::days(1),
      merged_at:  Some(merged_at),
      assignees:  None,
      merged_by:  Some("monalisa".into()),
      merged:     true,
    }
  }

  fn closed_unmerged(number: u64) -> PullRequest {
    PullRequest {
      merged_at: None,
      merged_by: None,
      merged: false,
      ..merged(number, at(2024, 6, 1))
    }
  }

  async fn drain<Src: PullRequestSource>(
    mut ingestion: Ingestion<'_, Src, MemoryStore>,
  ) -> (Vec<PullRequestRecord>, IngestStats) {
    let mut out = Vec::new();
    while let Some(r) = ingestion.next().await.unwrap() {
      out.push(r);
    }
    (out, ingestion.stats())
  }

  async fn run_once(
    store: &MemoryStore,
    session: &SessionContext,
    repository: &str,
    items: Vec<PullRequest>,
  ) -> usize {
    let ingestion = Ingestion::new(
      repository,
      MemorySource::paged(items, 2),
      session.cutoff(),
      false,
    )
    .dedup_against(store);
    let (records, _) = drain(ingestion).await;
    let mut inserted = 0;
    for r in &records {
      if store.append(r, session).await.unwrap() == AppendOutcome::Inserted {
        inserted += 1;
      }
    }
    inserted
  }

  // ─── Properties ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn widgets_scenario() {
    let store = MemoryStore::default();
    let session = SessionContext::new(Some(at(2024, 1, 1)));

    // #43 was stored by an earlier run.
    let earlier = SessionContext::new(Some(at(2024, 1, 1)));
    let pr43 = normalize("acme/widgets", merged(43, at(2024, 2, 1))).unwrap();
    store.append(&pr43, &earlier).await.unwrap();

    let ingestion = Ingestion::new(
      "acme/widgets",
      MemorySource::new([vec![
        merged(43, at(2024, 2, 1)),
        merged(42, at(2024, 1, 15)),
        merged(41, at(2023, 12, 1)),
      ]]),
      session.cutoff(),
      false,
    )
    .dedup_against(&store);

    let (records, stats) = drain(ingestion).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pr_number, 42);
    assert_eq!(records[0].repository, "acme/widgets");
    assert_eq!(
      stats,
      IngestStats { seen: 3, filtered: 1, duplicates: 1, yielded: 1 }
    );
  }

  #[tokio::test]
  async fn second_run_stores_nothing_new() {
    let store = MemoryStore::default();
    let items = vec![
      merged(1, at(2024, 5, 1)),
      merged(2, at(2024, 5, 2)),
      merged(3, at(2024, 5, 3)),
    ];

    let first = SessionContext::new(Some(at(2024, 1, 1)));
    assert_eq!(run_once(&store, &first, "acme/widgets", items.clone()).await, 3);

    let second = SessionContext::new(Some(at(2024, 1, 1)));
    assert_eq!(run_once(&store, &second, "acme/widgets", items).await, 0);
    assert_eq!(store.len(), 3);
  }

  #[tokio::test]
  async fn dedup_is_scoped_to_repository() {
    let store = MemoryStore::default();
    let session = SessionContext::new(Some(at(2024, 1, 1)));

    assert_eq!(
      run_once(&store, &session, "acme/a", vec![merged(7, at(2024, 3, 1))]).await,
      1
    );
    assert_eq!(
      run_once(&store, &session, "acme/b", vec![merged(7, at(2024, 3, 1))]).await,
      1
    );
    assert_eq!(store.len(), 2);
  }

  #[tokio::test]
  async fn unmerged_never_appears() {
    let store = MemoryStore::default();
    let ingestion = Ingestion::new(
      "acme/widgets",
      MemorySource::new([vec![closed_unmerged(1), merged(2, at(2024, 3, 1))]]),
      at(2024, 1, 1),
      false,
    )
    .dedup_against(&store);

    let (records, stats) = drain(ingestion).await;
    assert_eq!(records.iter().map(|r| r.pr_number).collect::<Vec<_>>(), [2]);
    assert_eq!(stats.filtered, 1);
  }

  #[tokio::test]
  async fn without_store_dedup_is_skipped() {
    let store = MemoryStore::default();
    let session = SessionContext::new(Some(at(2024, 1, 1)));
    let pr = normalize("acme/widgets", merged(9, at(2024, 4, 1))).unwrap();
    store.append(&pr, &session).await.unwrap();

    let ingestion: Ingestion<'_, _, MemoryStore> = Ingestion::new(
      "acme/widgets",
      MemorySource::new([vec![merged(9, at(2024, 4, 1))]]),
      session.cutoff(),
      false,
    );
    let (records, stats) = drain(ingestion).await;
    assert_eq!(records.len(), 1);
    assert_eq!(stats.duplicates, 0);
  }

  #[tokio::test]
  async fn native_order_is_kept_across_pages() {
    let items = (1..=5).rev().map(|n| merged(n, at(2024, 2, n as u32))).collect();
    let ingestion: Ingestion<'_, _, MemoryStore> =
      Ingestion::new("acme/widgets", MemorySource::paged(items, 2), at(2024, 1, 1), false);

    let (records, _) = drain(ingestion).await;
    let numbers: Vec<_> = records.iter().map(|r| r.pr_number).collect();
    assert_eq!(numbers, [5, 4, 3, 2, 1]);
  }

  #[tokio::test]
  async fn source_fault_aborts_after_buffered_page() {
    let mut ingestion: Ingestion<'_, _, MemoryStore> = Ingestion::new(
      "acme/widgets",
      FlakySource { first: Some(vec![merged(1, at(2024, 2, 1))]) },
      at(2024, 1, 1),
      false,
    );

    assert_eq!(ingestion.next().await.unwrap().map(|r| r.pr_number), Some(1));
    let err = ingestion.next().await.unwrap_err();
    assert!(matches!(err, Error::Source(_)));
  }
}
