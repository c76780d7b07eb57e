//! Run orchestration: ingest every repository of an organisation and feed the
//! accepted records through one report sink.
//!
//! Repositories are taken from a shared queue by `concurrency` workers. Each
//! worker drives one [`Ingestion`] at a time and sends its records into a
//! bounded channel; the sink drains the channel on the calling task, so store
//! appends and CSV writes are serialised. With one worker, records arrive in
//! the organisation's repository order and each repository's native order.

use std::{
  collections::VecDeque,
  future::Future,
  io,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use mergelog_core::{
  ingest::{IngestStats, Ingestion},
  pull_request::PullRequestRecord,
  session::SessionContext,
  source::PullRequestSource,
  store::RecordStore,
};
use mergelog_github::{GithubClient, GithubConfig, PullRequestPages};
use tokio::{
  sync::{Mutex, mpsc},
  task::JoinSet,
};
use tracing::{Instrument as _, debug, info, info_span, warn};

use crate::{
  RunError,
  report::{ReportSink, ReportSummary},
  settings::Settings,
};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Where repositories and their pull-request sources come from.
pub trait Catalog: Clone + Send + Sync + 'static {
  type Source: PullRequestSource + 'static;

  /// Repository identities of `organization`, in the order to ingest them.
  fn list_repositories<'a>(
    &'a self,
    organization: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, RunError>> + Send + 'a;

  /// A fresh, unstarted source for `repository`.
  fn open(&self, repository: &str) -> Self::Source;
}

impl Catalog for GithubClient {
  type Source = PullRequestPages;

  async fn list_repositories(&self, organization: &str) -> Result<Vec<String>, RunError> {
    let repos = self.repositories(organization).await?;
    Ok(repos.into_iter().map(|r| r.full_name).collect())
  }

  fn open(&self, repository: &str) -> PullRequestPages { self.closed_pulls(repository) }
}

/// Build the GitHub client from the credential and settings. A missing or
/// blank token is an authentication error; nothing is contacted or created.
pub fn github_client(token: Option<&str>, settings: &Settings) -> Result<GithubClient, RunError> {
  let token = token
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| RunError::Authentication("GH_TOKEN is not set".into()))?;
  let client = GithubClient::new(GithubConfig {
    api_url: settings.api_url.clone(),
    timeout: Duration::from_secs(settings.request_timeout_secs),
    ..GithubConfig::new(token)
  })?;
  Ok(client)
}

// ─── Run ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunOptions {
  pub organization:       String,
  pub include_not_merged: bool,
  pub concurrency:        usize,
  pub channel_capacity:   usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub repositories: usize,
  pub ingest:       IngestStats,
  pub report:       ReportSummary,
}

/// Ingest every repository `catalog` lists for the organisation.
///
/// With a store, candidates already stored are skipped and every reported
/// record is appended under `session`. Without one, dedup is skipped and only
/// the report is written.
///
/// The first fault stops the run. Rows appended before it stay in the store;
/// the report is left as written so far.
pub async fn run<C, S, W>(
  catalog: C,
  store: Option<&S>,
  session: &SessionContext,
  options: &RunOptions,
  writer: W,
) -> Result<RunSummary, RunError>
where
  C: Catalog,
  S: RecordStore + Clone + 'static,
  W: io::Write,
{
  let repositories = catalog.list_repositories(&options.organization).await?;
  info!(
    organization = %options.organization,
    count = repositories.len(),
    "listed repositories"
  );
  let repository_count = repositories.len();

  let mut sink = ReportSink::new(writer)?;
  if let Some(store) = store {
    sink = sink.persist_to(store, session);
  }

  let (tx, mut rx) = mpsc::channel(options.channel_capacity.max(1));
  let queue = Arc::new(Mutex::new(VecDeque::from(repositories)));
  let stop = Arc::new(AtomicBool::new(false));

  let mut workers = JoinSet::new();
  for _ in 0..options.concurrency.max(1) {
    let worker = Worker {
      catalog:            catalog.clone(),
      store:              store.cloned(),
      queue:              queue.clone(),
      stop:               stop.clone(),
      tx:                 tx.clone(),
      cutoff:             session.cutoff(),
      include_not_merged: options.include_not_merged,
    };
    workers.spawn(worker.run().in_current_span());
  }
  drop(tx);

  let sunk = async {
    while let Some(record) = rx.recv().await {
      sink.write(&record).await?;
    }
    Ok::<_, RunError>(())
  }
  .await;

  if sunk.is_err() {
    stop.store(true, Ordering::Relaxed);
  }
  // Workers blocked on a full channel see it closed and stop.
  drop(rx);

  let mut ingest = IngestStats::default();
  let mut produced = Ok(());
  while let Some(joined) = workers.join_next().await {
    match joined {
      Ok(Ok(stats)) => ingest += stats,
      Ok(Err(e)) => {
        if produced.is_ok() {
          produced = Err(e);
        }
      }
      Err(e) => match e.try_into_panic() {
        Ok(payload) => std::panic::resume_unwind(payload),
        // Workers are never aborted.
        Err(e) => warn!(error = %e, "ingestion worker cancelled"),
      },
    }
  }

  sunk?;
  produced?;
  let report = sink.finish()?;

  info!(
    repositories = repository_count,
    seen = ingest.seen,
    duplicates = ingest.duplicates,
    rows = report.rows,
    inserted = report.inserted,
    "run finished"
  );
  Ok(RunSummary { repositories: repository_count, ingest, report })
}

struct Worker<C, S> {
  catalog:            C,
  store:              Option<S>,
  queue:              Arc<Mutex<VecDeque<String>>>,
  stop:               Arc<AtomicBool>,
  tx:                 mpsc::Sender<PullRequestRecord>,
  cutoff:             DateTime<Utc>,
  include_not_merged: bool,
}

impl<C, S> Worker<C, S>
where
  C: Catalog,
  S: RecordStore + 'static,
{
  async fn run(self) -> Result<IngestStats, RunError> {
    let mut total = IngestStats::default();
    while !self.stop.load(Ordering::Relaxed) {
      let Some(repository) = self.queue.lock().await.pop_front() else {
        break;
      };

      let span = info_span!("repository", name = %repository);
      let result = self.ingest(repository).instrument(span).await;
      match result {
        Ok(Some(stats)) => total += stats,
        Ok(None) => break,
        Err(e) => {
          self.stop.store(true, Ordering::Relaxed);
          return Err(e);
        }
      }
    }
    Ok(total)
  }

  /// Returns `None` when the sink went away mid-repository.
  async fn ingest(&self, repository: String) -> Result<Option<IngestStats>, RunError> {
    let source = self.catalog.open(&repository);
    let mut ingestion =
      Ingestion::new(repository, source, self.cutoff, self.include_not_merged);
    if let Some(store) = &self.store {
      ingestion = ingestion.dedup_against(store);
    }

    while let Some(record) = ingestion.next().await? {
      if self.tx.send(record).await.is_err() {
        warn!("report sink closed; abandoning repository");
        return Ok(None);
      }
    }

    let stats = ingestion.stats();
    if stats.seen == 0 {
      debug!("no pull requests found");
    } else {
      info!(
        seen = stats.seen,
        filtered = stats.filtered,
        duplicates = stats.duplicates,
        accepted = stats.yielded,
        "repository ingested"
      );
    }
    Ok(Some(stats))
  }
}
