use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params_from_iter;
use telemetry_core::{IngestRequest, IngestTally, ReadModelRequest, UsageSnapshot};
use tokio_rusqlite::Connection;
use tracing::warn;

use crate::error::StoreError;
use crate::schema::SCHEMA;
use crate::store::Store;

/// `rusqlite` (bundled SQLite) + `tokio_rusqlite` backed `Store`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    fn ingest_one(conn: &rusqlite::Connection, event: &IngestRequest) -> rusqlite::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let payload = event.payload.to_string();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO raw_events (identity, source, account_id, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![event.identity, event.source, event.account_id, payload, now],
        )?;
        Ok(changed > 0)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn ingest_events(&self, events: &[IngestRequest]) -> Result<IngestTally, StoreError> {
        let events = events.to_vec();
        let tally = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut tally = IngestTally::default();
                for event in &events {
                    tally.processed += 1;
                    match SqliteStore::ingest_one(&tx, event) {
                        Ok(true) => tally.ingested += 1,
                        Ok(false) => tally.deduped += 1,
                        Err(_) => tally.failed += 1,
                    }
                }
                tx.commit()?;
                Ok(tally)
            })
            .await?;
        Ok(tally)
    }

    async fn ingest_quota_snapshots(
        &self,
        snapshots: HashMap<String, UsageSnapshot>,
    ) -> Result<(), StoreError> {
        let rows: Vec<(String, String, String, String)> = snapshots
            .into_iter()
            .map(|(account_id, snap)| {
                let json = serde_json::to_string(&snap).unwrap_or_default();
                (account_id, snap.provider_id.clone(), json, Utc::now().to_rfc3339())
            })
            .collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (account_id, provider_id, json, updated_at) in &rows {
                    tx.execute(
                        "INSERT INTO quota_snapshots (account_id, provider_id, snapshot_json, updated_at)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(account_id) DO UPDATE SET
                            provider_id = excluded.provider_id,
                            snapshot_json = excluded.snapshot_json,
                            updated_at = excluded.updated_at",
                        rusqlite::params![account_id, provider_id, json, updated_at],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn compute_read_model(
        &self,
        req: &ReadModelRequest,
    ) -> Result<HashMap<String, UsageSnapshot>, StoreError> {
        let ids: Vec<String> = req.accounts.iter().map(|e| e.account_id.clone()).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<String> = self
            .conn
            .call(move |conn| {
                let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let sql = format!(
                    "SELECT snapshot_json FROM quota_snapshots WHERE account_id IN ({placeholders})"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(ids.iter()), |row| row.get::<_, String>(0))?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(rows)
            })
            .await?;

        let mut out = HashMap::new();
        for json in rows {
            match serde_json::from_str::<UsageSnapshot>(&json) {
                Ok(snap) => {
                    out.insert(snap.account_id.clone(), snap);
                }
                Err(e) => warn!(error = %e, "dropping corrupt quota snapshot row"),
            }
        }
        Ok(out)
    }

    async fn spool_enqueue(&self, events: &[IngestRequest]) -> Result<(), StoreError> {
        let events = events.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let now = Utc::now().to_rfc3339();
                for event in &events {
                    let payload = event.payload.to_string();
                    tx.execute(
                        "INSERT INTO spool_entries (source, account_id, identity, payload, enqueued_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![event.source, event.account_id, event.identity, payload, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn spool_flush(&self, batch_size: u64) -> Result<IngestTally, StoreError> {
        let batch: Vec<(i64, IngestRequest)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, source, account_id, identity, payload FROM spool_entries
                     ORDER BY id ASC LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![batch_size as i64], |row| {
                        let id: i64 = row.get(0)?;
                        let source: String = row.get(1)?;
                        let account_id: Option<String> = row.get(2)?;
                        let identity: String = row.get(3)?;
                        let payload: String = row.get(4)?;
                        Ok((id, source, account_id, identity, payload))
                    })?
                    .filter_map(|r| r.ok())
                    .map(|(id, source, account_id, identity, payload)| {
                        let value = serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null);
                        (
                            id,
                            IngestRequest {
                                source,
                                account_id,
                                identity,
                                payload: value,
                            },
                        )
                    })
                    .collect();
                Ok(rows)
            })
            .await?;

        if batch.is_empty() {
            return Ok(IngestTally::default());
        }

        let events: Vec<IngestRequest> = batch.iter().map(|(_, e)| e.clone()).collect();
        let tally = self.ingest_events(&events).await?;

        let ids: Vec<i64> = batch.iter().map(|(id, _)| *id).collect();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &ids {
                    tx.execute("DELETE FROM spool_entries WHERE id = ?1", rusqlite::params![id])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(tally)
    }

    async fn prune_old_events(&self, retention_days: u32) -> Result<u64, StoreError> {
        let cutoff = (Utc::now() - chrono::Duration::days(retention_days as i64)).to_rfc3339();
        let removed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM raw_events WHERE created_at < ?1",
                    rusqlite::params![cutoff],
                )?;
                Ok(n as u64)
            })
            .await?;
        Ok(removed)
    }

    async fn prune_orphan_raw_events(&self, limit: u64) -> Result<u64, StoreError> {
        let removed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM raw_events WHERE identity IN (
                        SELECT identity FROM raw_events WHERE account_id IS NULL
                        ORDER BY created_at ASC LIMIT ?1
                     )",
                    rusqlite::params![limit as i64],
                )?;
                Ok(n as u64)
            })
            .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(identity: &str, account_id: Option<&str>) -> IngestRequest {
        IngestRequest {
            source: "opencode".into(),
            account_id: account_id.map(|s| s.to_string()),
            identity: identity.to_string(),
            payload: json!({"k": "v"}),
        }
    }

    #[tokio::test]
    async fn ingest_dedups_on_identity() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let e = event("id-1", Some("acct-1"));
        let first = store.ingest_events(&[e.clone()]).await.unwrap();
        assert_eq!(first.ingested, 1);
        assert_eq!(first.deduped, 0);

        let second = store.ingest_events(&[e]).await.unwrap();
        assert_eq!(second.ingested, 0);
        assert_eq!(second.deduped, 1);
    }

    #[tokio::test]
    async fn spool_roundtrip_flushes_and_drains() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let e = event("id-spool-1", Some("acct-1"));
        store.spool_enqueue(&[e]).await.unwrap();

        let tally = store.spool_flush(10).await.unwrap();
        assert_eq!(tally.ingested, 1);

        let empty = store.spool_flush(10).await.unwrap();
        assert_eq!(empty.processed, 0);
    }

    #[tokio::test]
    async fn prune_orphan_raw_events_only_removes_unattributed() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .ingest_events(&[event("id-a", None), event("id-b", Some("acct-1"))])
            .await
            .unwrap();

        let removed = store.prune_orphan_raw_events(10).await.unwrap();
        assert_eq!(removed, 1);
    }
}
