pub(crate) const SCHEMA: &str = "
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA busy_timeout=5000;

CREATE TABLE IF NOT EXISTS raw_events (
    identity    TEXT PRIMARY KEY,
    source      TEXT NOT NULL,
    account_id  TEXT,
    payload     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_raw_events_created_at ON raw_events(created_at);
CREATE INDEX IF NOT EXISTS idx_raw_events_account_id ON raw_events(account_id);

CREATE TABLE IF NOT EXISTS quota_snapshots (
    account_id     TEXT PRIMARY KEY,
    provider_id    TEXT NOT NULL,
    snapshot_json  TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS spool_entries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    source       TEXT NOT NULL,
    account_id   TEXT,
    identity     TEXT NOT NULL,
    payload      TEXT NOT NULL,
    enqueued_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spool_enqueued_at ON spool_entries(enqueued_at);
";
