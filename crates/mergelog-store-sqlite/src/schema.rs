//! SQL schema for the mergelog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS pull_requests (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id    TEXT    NOT NULL,
    source        TEXT    NOT NULL,
    repo          TEXT    NOT NULL,
    user          TEXT    NOT NULL,
    pr_number     INTEGER NOT NULL,
    state         TEXT    NOT NULL,
    created_at    TEXT    NOT NULL,   -- RFC 3339 UTC
    merged_at     TEXT    NOT NULL,   -- RFC 3339 UTC
    assignee      TEXT    NOT NULL,   -- comma-joined handles or 'NF'
    merged_by     TEXT    NOT NULL,
    created_at_ts TEXT    NOT NULL,   -- store-assigned
    updated_at_ts TEXT    NOT NULL    -- store-assigned
);

-- An index rather than a table constraint, so a table created by an older
-- writer without the key still gets it.
CREATE UNIQUE INDEX IF NOT EXISTS pull_requests_repo_pr_number ON pull_requests(repo, pr_number);

CREATE INDEX IF NOT EXISTS pull_requests_session_id ON pull_requests(session_id);
CREATE INDEX IF NOT EXISTS pull_requests_repo       ON pull_requests(repo);
CREATE INDEX IF NOT EXISTS pull_requests_merged_by  ON pull_requests(merged_by);
CREATE INDEX IF NOT EXISTS pull_requests_merged_at  ON pull_requests(merged_at);

PRAGMA user_version = 1;
";
