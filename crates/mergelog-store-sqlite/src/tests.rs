//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use mergelog_core::{
  pull_request::{Assignees, PROVENANCE_TAG, PullRequestRecord},
  session::SessionContext,
  store::{AppendOutcome, RecordQuery, RecordStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn record(repository: &str, pr_number: u64, merged_at: DateTime<Utc>) -> PullRequestRecord {
  PullRequestRecord {
    repository: repository.into(),
    user:       "octocat".into(),
    pr_number,
    state:      "closed".into(),
    created_at: merged_at - chrono::Duration::days(3),
    merged_at,
    assignees:  Assignees::NoneAssigned,
    merged_by:  "monalisa".into(),
  }
}

fn session() -> SessionContext { SessionContext::new(Some(at(2024, 1, 1))) }

// ─── Existence and append ────────────────────────────────────────────────────

#[tokio::test]
async fn exists_is_false_on_empty_store() {
  let s = store().await;
  assert!(!s.exists("acme/widgets", 42).await.unwrap());
}

#[tokio::test]
async fn append_then_exists() {
  let s = store().await;
  let outcome = s
    .append(&record("acme/widgets", 42, at(2024, 1, 15)), &session())
    .await
    .unwrap();

  assert_eq!(outcome, AppendOutcome::Inserted);
  assert!(s.exists("acme/widgets", 42).await.unwrap());
  assert!(!s.exists("acme/widgets", 43).await.unwrap());
}

#[tokio::test]
async fn existence_is_scoped_to_repository() {
  let s = store().await;
  s.append(&record("acme/a", 7, at(2024, 2, 1)), &session())
    .await
    .unwrap();

  assert!(s.exists("acme/a", 7).await.unwrap());
  assert!(!s.exists("acme/b", 7).await.unwrap());

  let outcome = s
    .append(&record("acme/b", 7, at(2024, 2, 1)), &session())
    .await
    .unwrap();
  assert_eq!(outcome, AppendOutcome::Inserted);
}

#[tokio::test]
async fn duplicate_append_is_a_no_op() {
  let s = store().await;
  let first = session();
  let original = record("acme/widgets", 42, at(2024, 1, 15));
  s.append(&original, &first).await.unwrap();

  let mut changed = original.clone();
  changed.merged_by = "someone-else".into();
  let outcome = s.append(&changed, &session()).await.unwrap();
  assert_eq!(outcome, AppendOutcome::AlreadyStored);

  let rows = s.list(&RecordQuery::default()).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].record, original);
  assert_eq!(rows[0].session_id, first.id());
}

#[tokio::test]
async fn stored_row_carries_audit_columns() {
  let s = store().await;
  let sess = session();
  let before = Utc::now();

  let mut input = record("acme/widgets", 42, at(2024, 1, 15));
  input.assignees = Assignees::Users(vec!["hubot".into(), "octocat".into()]);
  s.append(&input, &sess).await.unwrap();

  let rows = s.list(&RecordQuery::default()).await.unwrap();
  let row = &rows[0];
  assert_eq!(row.record, input);
  assert_eq!(row.source, PROVENANCE_TAG);
  assert_eq!(row.session_id, sess.id());
  assert_eq!(row.inserted_at, row.updated_at);
  assert!(row.inserted_at >= before - chrono::Duration::seconds(1));
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

async fn seeded() -> (SqliteStore, SessionContext) {
  let s = store().await;
  let sess = session();
  let mut by_hubot = record("acme/gears", 3, at(2024, 3, 1));
  by_hubot.merged_by = "hubot".into();

  for r in [
    record("acme/widgets", 2, at(2024, 2, 1)),
    record("acme/widgets", 1, at(2024, 1, 10)),
    by_hubot,
  ] {
    s.append(&r, &sess).await.unwrap();
  }
  (s, sess)
}

#[tokio::test]
async fn list_orders_by_merge_time() {
  let (s, _) = seeded().await;
  let rows = s.list(&RecordQuery::default()).await.unwrap();
  let keys: Vec<_> = rows
    .iter()
    .map(|r| (r.record.repository.as_str(), r.record.pr_number))
    .collect();
  assert_eq!(keys, [("acme/widgets", 1), ("acme/widgets", 2), ("acme/gears", 3)]);
}

#[tokio::test]
async fn list_filters_by_repository_and_merger() {
  let (s, _) = seeded().await;

  let widgets = s
    .list(&RecordQuery {
      repository: Some("acme/widgets".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(widgets.len(), 2);

  let hubot = s
    .list(&RecordQuery {
      merged_by: Some("hubot".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hubot.len(), 1);
  assert_eq!(hubot[0].record.repository, "acme/gears");
}

#[tokio::test]
async fn list_filters_by_merge_time_session_and_limit() {
  let (s, sess) = seeded().await;

  let recent = s
    .list(&RecordQuery {
      merged_after: Some(at(2024, 2, 1)),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(recent.len(), 2);

  let other = s
    .list(&RecordQuery {
      session_id: Some(session().id()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(other.is_empty());

  let mine = s
    .list(&RecordQuery {
      session_id: Some(sess.id()),
      limit: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].record.pr_number, 1);
}

#[tokio::test]
async fn reopening_a_file_keeps_rows() {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("gh.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.append(&record("acme/widgets", 42, at(2024, 1, 15)), &session())
      .await
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.exists("acme/widgets", 42).await.unwrap());
}

// ─── Pre-existing tables ─────────────────────────────────────────────────────

/// The table as an earlier writer created it: loosely typed, no key.
const UNKEYED_TABLE: &str = "
CREATE TABLE pull_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT,
    source TEXT,
    repo TEXT,
    user TEXT,
    pr_number INTEGER,
    state TEXT,
    created_at DATETIME,
    merged_at DATETIME,
    assignee TEXT,
    merged_by TEXT,
    created_at_ts DATETIME,
    updated_at_ts DATETIME
);
";

#[tokio::test]
async fn append_works_on_a_table_created_without_the_key() {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("gh.db");
  rusqlite::Connection::open(&path)
    .and_then(|conn| conn.execute_batch(UNKEYED_TABLE))
    .expect("create unkeyed table");

  let s = SqliteStore::open(&path).await.unwrap();
  let r = record("acme/widgets", 42, at(2024, 1, 15));

  assert_eq!(s.append(&r, &session()).await.unwrap(), AppendOutcome::Inserted);
  assert_eq!(s.append(&r, &session()).await.unwrap(), AppendOutcome::AlreadyStored);
  assert!(s.exists("acme/widgets", 42).await.unwrap());
  assert_eq!(s.list(&RecordQuery::default()).await.unwrap().len(), 1);
}
