//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use mergelog_core::{
  pull_request::{PROVENANCE_TAG, PullRequestRecord, StoredPullRequest},
  session::SessionContext,
  store::{AppendOutcome, RecordQuery, RecordStore},
};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;

use crate::{
  Result,
  encode::{RawStoredPullRequest, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted, so every
/// clone shares one handle for existence checks and appends.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!("database initialized");
    Ok(())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  async fn exists(&self, repository: &str, pr_number: u64) -> Result<bool> {
    let repo = repository.to_owned();
    let number = pr_number as i64;

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM pull_requests WHERE repo = ?1 AND pr_number = ?2",
              rusqlite::params![repo, number],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(found)
  }

  async fn append(
    &self,
    record: &PullRequestRecord,
    session: &SessionContext,
  ) -> Result<AppendOutcome> {
    let now            = encode_dt(Utc::now());
    let session_id_str = encode_uuid(session.id());
    let repo           = record.repository.clone();
    let user           = record.user.clone();
    let number         = record.pr_number as i64;
    let state          = record.state.clone();
    let created_at_str = encode_dt(record.created_at);
    let merged_at_str  = encode_dt(record.merged_at);
    let assignee       = record.assignees.to_string();
    let merged_by      = record.merged_by.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO pull_requests (
             session_id, source, repo, user, pr_number, state,
             created_at, merged_at, assignee, merged_by,
             created_at_ts, updated_at_ts
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
           ON CONFLICT (repo, pr_number) DO NOTHING",
          rusqlite::params![
            session_id_str,
            PROVENANCE_TAG,
            repo,
            user,
            number,
            state,
            created_at_str,
            merged_at_str,
            assignee,
            merged_by,
            now,
          ],
        )?)
      })
      .await?;

    Ok(if changed == 0 {
      AppendOutcome::AlreadyStored
    } else {
      AppendOutcome::Inserted
    })
  }

  async fn list(&self, query: &RecordQuery) -> Result<Vec<StoredPullRequest>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut values: Vec<Value> = vec![];

    if let Some(repo) = &query.repository {
      conds.push("repo = ?");
      values.push(Value::Text(repo.clone()));
    }
    if let Some(user) = &query.merged_by {
      conds.push("merged_by = ?");
      values.push(Value::Text(user.clone()));
    }
    if let Some(after) = query.merged_after {
      conds.push("merged_at >= ?");
      values.push(Value::Text(encode_dt(after)));
    }
    if let Some(session_id) = query.session_id {
      conds.push("session_id = ?");
      values.push(Value::Text(encode_uuid(session_id)));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.limit.map_or(-1, |l| l as i64);
    values.push(Value::Integer(limit));

    let sql = format!(
      "SELECT {} FROM pull_requests {where_clause}
       ORDER BY merged_at, repo, pr_number
       LIMIT ?",
      RawStoredPullRequest::COLUMNS,
    );

    let raws: Vec<RawStoredPullRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(values.iter()),
            RawStoredPullRequest::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStoredPullRequest::into_stored).collect()
  }
}
