//! Deduplicating play history storage.
//!
//! Every play is keyed on `(played_at, user_id, track_id)`. Inserting a key
//! that is already stored is silently ignored, which lets the sync re-read
//! overlapping time windows without creating duplicates.

use std::{path::Path, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
};

use crate::{
    error::{Result, WatchError},
    types::{PlayRecord, TopTrack},
    utils,
};

/// Durable sink for play records.
#[allow(async_fn_in_trait)]
pub trait HistoryStore {
    /// Most recent stored play of a user, used as the resume point.
    async fn latest_played_at(&self, user_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Stores a batch and returns how many records were new.
    async fn insert_batch(&self, records: &[PlayRecord]) -> Result<u64>;
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS track_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        played_at INTEGER NOT NULL,
        user_id TEXT NOT NULL,
        provider_user_id TEXT NOT NULL,
        track_id TEXT NOT NULL,
        track_name TEXT NOT NULL,
        track_duration_ms INTEGER NOT NULL,
        track_popularity INTEGER,
        album_id TEXT,
        album_name TEXT,
        first_artist_id TEXT,
        first_artist_name TEXT,
        isrc TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(played_at, user_id, track_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_user_played_at ON track_history(user_id, played_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_track_id ON track_history(track_id)",
    "CREATE INDEX IF NOT EXISTS idx_artist_id ON track_history(first_artist_id)",
];

const INSERT: &str = "INSERT OR IGNORE INTO track_history
    (played_at, user_id, provider_user_id, track_id, track_name,
     track_duration_ms, track_popularity, album_id, album_name,
     first_artist_id, first_artist_name, isrc)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// SQLite-backed [`HistoryStore`].
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Opens (or creates) the database file at `path` and ensures the schema.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options).await
    }

    /// Creates a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    // A single connection: in-memory databases are per connection and the
    // tool never writes concurrently.
    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(*statement).execute(&pool).await?;
        }
        log::debug!("History database ready");

        Ok(Self { pool })
    }

    /// Number of stored plays for one user, or for everybody.
    pub async fn track_count(&self, user_id: Option<&str>) -> Result<i64> {
        let count: i64 = match user_id {
            Some(user_id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM track_history WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM track_history")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Newest plays of a user, newest first.
    pub async fn recent_tracks(&self, user_id: &str, limit: u32) -> Result<Vec<PlayRecord>> {
        let rows = sqlx::query(
            "SELECT played_at, user_id, provider_user_id, track_id, track_name,
                    track_duration_ms, track_popularity, album_id, album_name,
                    first_artist_id, first_artist_name, isrc
             FROM track_history
             WHERE user_id = ?
             ORDER BY played_at DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Most played tracks of a user within the last `days` days.
    pub async fn top_tracks(&self, user_id: &str, days: i64, limit: u32) -> Result<Vec<TopTrack>> {
        let since = (Utc::now() - Duration::days(days)).timestamp_millis();
        let rows = sqlx::query(
            "SELECT track_id, track_name, first_artist_name, COUNT(*) AS play_count
             FROM track_history
             WHERE user_id = ? AND played_at >= ?
             GROUP BY track_id, track_name, first_artist_name
             ORDER BY play_count DESC, track_name ASC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(since)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TopTrack> {
                Ok(TopTrack {
                    track_id: row.try_get("track_id")?,
                    track_name: row.try_get("track_name")?,
                    first_artist_name: row.try_get("first_artist_name")?,
                    play_count: row.try_get("play_count")?,
                })
            })
            .collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl HistoryStore for SqliteHistoryStore {
    async fn latest_played_at(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(played_at) FROM track_history WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(latest.and_then(utils::millis_to_datetime))
    }

    async fn insert_batch(&self, records: &[PlayRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for record in records {
            let duration = i64::try_from(record.track_duration_ms).map_err(|_| {
                WatchError::invalid(format!(
                    "track_duration_ms out of range: {}",
                    record.track_duration_ms
                ))
            })?;
            let result = sqlx::query(INSERT)
                .bind(record.played_at_ms())
                .bind(&record.user_id)
                .bind(&record.provider_user_id)
                .bind(&record.track_id)
                .bind(&record.track_name)
                .bind(duration)
                .bind(record.track_popularity.map(i64::from))
                .bind(&record.album_id)
                .bind(&record.album_name)
                .bind(&record.first_artist_id)
                .bind(&record.first_artist_name)
                .bind(&record.isrc)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        log::info!(
            "Inserted {} new plays (out of {} total)",
            inserted,
            records.len()
        );
        Ok(inserted)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PlayRecord> {
    let played_at_ms: i64 = row.try_get("played_at")?;
    let played_at = utils::millis_to_datetime(played_at_ms)
        .ok_or_else(|| corrupt(format!("invalid played_at value {}", played_at_ms)))?;
    let duration: i64 = row.try_get("track_duration_ms")?;
    let track_duration_ms = u64::try_from(duration)
        .map_err(|_| corrupt(format!("invalid track_duration_ms value {}", duration)))?;
    let popularity: Option<i64> = row.try_get("track_popularity")?;

    Ok(PlayRecord {
        played_at,
        user_id: row.try_get("user_id")?,
        provider_user_id: row.try_get("provider_user_id")?,
        track_id: row.try_get("track_id")?,
        track_name: row.try_get("track_name")?,
        track_duration_ms,
        track_popularity: popularity.and_then(|p| u32::try_from(p).ok()),
        album_id: row.try_get("album_id")?,
        album_name: row.try_get("album_name")?,
        first_artist_id: row.try_get("first_artist_id")?,
        first_artist_name: row.try_get("first_artist_name")?,
        isrc: row.try_get("isrc")?,
    })
}

fn corrupt(message: String) -> WatchError {
    WatchError::Storage(sqlx::Error::Decode(message.into()))
}
