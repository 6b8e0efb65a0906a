//! Persisted article lifecycle: the `current` and `dead` partitions.
//!
//! Every mutation runs inside one transaction, so a failed batch leaves the
//! database as it was before the call.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::feed::RawEntry;
use crate::urls::normalize_url;

/// An article in the ACTIVE partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveArticle {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub raw_score: u64,
    pub published_at: DateTime<Utc>,
    /// `now - published_at`, in seconds, as of the listing call.
    pub age_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub active: u64,
    pub expired: u64,
}

#[derive(Debug, Clone)]
pub struct LifecycleStore {
    pool: SqlitePool,
}

type CurrentRow = (i64, String, String, i64, i64);

const KNOWN_COUNT: &str = "SELECT (SELECT COUNT(*) FROM current WHERE url_key = ?1) \
     + (SELECT COUNT(*) FROM dead WHERE url_key = ?1)";

impl LifecycleStore {
    /// Opens (creating if needed) a database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.display(), "opened lifecycle store");
        Ok(store)
    }

    /// A private in-memory database, kept alive by a single pinned connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        // AUTOINCREMENT keeps ids of expired rows from being handed out again.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS current (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                url_key TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                score INTEGER NOT NULL DEFAULT 0,
                published_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dead (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL,
                url_key TEXT NOT NULL UNIQUE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_current_published ON current(published_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// True when the normalized `url` is in either partition.
    pub async fn is_known(&self, url: &str) -> Result<bool, StoreError> {
        let key = normalize_url(url);
        let count: i64 = sqlx::query_scalar(KNOWN_COUNT)
            .bind(&key)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Inserts a batch as ACTIVE articles with a zero score, all or nothing.
    ///
    /// Entries whose URL is already known are skipped. Returns the stored rows.
    pub async fn insert_new(
        &self,
        entries: &[RawEntry],
    ) -> Result<Vec<ActiveArticle>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(entries.len());

        for entry in entries {
            let key = normalize_url(&entry.link);
            let known: i64 = sqlx::query_scalar(KNOWN_COUNT)
                .bind(&key)
                .fetch_one(&mut *tx)
                .await?;
            if known > 0 {
                debug!(url = %entry.link, "already known, not inserting");
                continue;
            }

            let id = sqlx::query(
                "INSERT INTO current (url, url_key, title, score, published_at) \
                 VALUES (?, ?, ?, 0, ?)",
            )
            .bind(&entry.link)
            .bind(&key)
            .bind(&entry.title)
            .bind(entry.published_at.timestamp())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            inserted.push(ActiveArticle {
                id,
                url: entry.link.clone(),
                title: entry.title.clone(),
                raw_score: 0,
                published_at: entry.published_at,
                age_secs: 0,
            });
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Sets the raw score of ACTIVE articles; ids not in ACTIVE are ignored.
    pub async fn update_scores(&self, scores: &[(i64, u64)]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for (id, score) in scores {
            updated += sqlx::query("UPDATE current SET score = ? WHERE id = ?")
                .bind(i64::try_from(*score).unwrap_or(i64::MAX))
                .bind(*id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }

    /// ACTIVE ids with `now - published_at > horizon_secs`.
    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        horizon_secs: u64,
    ) -> Result<Vec<i64>, StoreError> {
        let horizon = i64::try_from(horizon_secs).unwrap_or(i64::MAX);
        let cutoff = now.timestamp().saturating_sub(horizon);
        let ids = sqlx::query_scalar("SELECT id FROM current WHERE published_at < ? ORDER BY id")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Moves ACTIVE articles to the dead partition, keeping id and url.
    pub async fn expire(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut moved = 0;
        for id in ids {
            let copied = sqlx::query(
                "INSERT INTO dead (id, url, url_key) \
                 SELECT id, url, url_key FROM current WHERE id = ?",
            )
            .bind(*id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if copied == 0 {
                continue;
            }
            sqlx::query("DELETE FROM current WHERE id = ?")
                .bind(*id)
                .execute(&mut *tx)
                .await?;
            moved += copied;
        }
        tx.commit().await?;
        Ok(moved)
    }

    /// `find_expired` followed by `expire`.
    pub async fn sweep(&self, now: DateTime<Utc>, horizon_secs: u64) -> Result<u64, StoreError> {
        let ids = self.find_expired(now, horizon_secs).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        let moved = self.expire(&ids).await?;
        info!(expired = moved, "expiration sweep done");
        Ok(moved)
    }

    /// All ACTIVE articles in insertion order, with their age at `now`.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<ActiveArticle>, StoreError> {
        let rows: Vec<CurrentRow> =
            sqlx::query_as("SELECT id, url, title, score, published_at FROM current ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let articles = rows
            .into_iter()
            .map(|(id, url, title, score, published)| {
                let published_at = Utc.timestamp_opt(published, 0).single().unwrap_or_default();
                ActiveArticle {
                    id,
                    url,
                    title,
                    raw_score: u64::try_from(score).unwrap_or(0),
                    published_at,
                    age_secs: now.timestamp() - published,
                }
            })
            .collect();
        Ok(articles)
    }

    pub async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let (active, expired): (i64, i64) =
            sqlx::query_as("SELECT (SELECT COUNT(*) FROM current), (SELECT COUNT(*) FROM dead)")
                .fetch_one(&self.pool)
                .await?;
        Ok(StoreCounts {
            active: active.max(0) as u64,
            expired: expired.max(0) as u64,
        })
    }

    /// Ids in the dead partition, ascending.
    pub async fn expired_ids(&self) -> Result<Vec<i64>, StoreError> {
        let ids = sqlx::query_scalar("SELECT id FROM dead ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
