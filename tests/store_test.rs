use chrono::{DateTime, Utc};
use spotwatch::WatchError;
use spotwatch::storage::{HistoryStore, SqliteHistoryStore};
use spotwatch::types::PlayRecord;
use spotwatch::utils::now_millis;

const MINUTE: i64 = 60_000;

fn record(user_id: &str, track_id: &str, played_at_ms: i64) -> PlayRecord {
    PlayRecord {
        played_at: DateTime::<Utc>::from_timestamp_millis(played_at_ms).unwrap(),
        user_id: user_id.to_string(),
        provider_user_id: format!("spotify-{}", user_id),
        track_id: track_id.to_string(),
        track_name: format!("Song {}", track_id),
        track_duration_ms: 200_000,
        track_popularity: Some(50),
        album_id: Some("album".to_string()),
        album_name: Some("Album".to_string()),
        first_artist_id: Some("artist".to_string()),
        first_artist_name: Some(format!("Artist {}", track_id)),
        isrc: None,
    }
}

#[tokio::test]
async fn test_insert_is_idempotent() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let base = 1_704_067_200_000;
    let batch = vec![
        record("1", "a", base),
        record("1", "b", base + MINUTE),
        record("1", "c", base + 2 * MINUTE),
    ];

    assert_eq!(store.insert_batch(&batch).await.unwrap(), 3);
    assert_eq!(store.insert_batch(&batch).await.unwrap(), 0);
    assert_eq!(store.track_count(Some("1")).await.unwrap(), 3);
}

#[tokio::test]
async fn test_partial_overlap_counts_only_new() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let base = 1_704_067_200_000;

    store
        .insert_batch(&[record("1", "a", base), record("1", "b", base + MINUTE)])
        .await
        .unwrap();
    let inserted = store
        .insert_batch(&[
            record("1", "b", base + MINUTE),
            record("1", "c", base + 2 * MINUTE),
        ])
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    assert_eq!(store.track_count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn test_uniqueness_key_components() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let at = 1_704_067_200_000;

    let inserted = store
        .insert_batch(&[
            record("1", "a", at),
            // Same track, other instant
            record("1", "a", at + 1),
            // Same instant, other user
            record("2", "a", at),
            // Same instant and user, other track
            record("1", "b", at),
        ])
        .await
        .unwrap();

    assert_eq!(inserted, 4);
}

#[tokio::test]
async fn test_duplicates_within_one_batch() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let at = 1_704_067_200_000;

    let inserted = store
        .insert_batch(&[record("1", "a", at), record("1", "a", at)])
        .await
        .unwrap();

    assert_eq!(inserted, 1);
}

#[tokio::test]
async fn test_empty_batch() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    assert_eq!(store.insert_batch(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_latest_played_at() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let base = 1_704_067_200_123;

    assert_eq!(store.latest_played_at("1").await.unwrap(), None);

    store
        .insert_batch(&[
            record("1", "a", base + 5 * MINUTE),
            record("1", "b", base),
            record("2", "c", base + 60 * MINUTE),
        ])
        .await
        .unwrap();

    let latest = store.latest_played_at("1").await.unwrap().unwrap();
    assert_eq!(latest.timestamp_millis(), base + 5 * MINUTE);
    assert_eq!(store.latest_played_at("3").await.unwrap(), None);
}

#[tokio::test]
async fn test_recent_tracks_newest_first() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let base = 1_704_067_200_000;
    store
        .insert_batch(&[
            record("1", "old", base),
            record("1", "new", base + 2 * MINUTE),
            record("1", "mid", base + MINUTE),
            record("2", "other", base + 3 * MINUTE),
        ])
        .await
        .unwrap();

    let recent = store.recent_tracks("1", 2).await.unwrap();
    let ids: Vec<_> = recent.iter().map(|r| r.track_id.as_str()).collect();
    assert_eq!(ids, ["new", "mid"]);

    // Stored records read back unchanged
    assert_eq!(recent[0], record("1", "new", base + 2 * MINUTE));
}

#[tokio::test]
async fn test_top_tracks() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let now = now_millis();
    let long_ago = now - 30 * 24 * 60 * MINUTE;

    store
        .insert_batch(&[
            record("1", "hit", now - MINUTE),
            record("1", "hit", now - 2 * MINUTE),
            record("1", "hit", now - 3 * MINUTE),
            record("1", "fine", now - 4 * MINUTE),
            record("1", "fine", now - 5 * MINUTE),
            record("1", "once", now - 6 * MINUTE),
            record("1", "forgotten", long_ago),
            record("1", "forgotten", long_ago + MINUTE),
            record("1", "forgotten", long_ago + 2 * MINUTE),
            record("1", "forgotten", long_ago + 3 * MINUTE),
        ])
        .await
        .unwrap();

    let top = store.top_tracks("1", 7, 10).await.unwrap();
    let ranking: Vec<_> = top
        .iter()
        .map(|t| (t.track_id.as_str(), t.play_count))
        .collect();
    assert_eq!(ranking, [("hit", 3), ("fine", 2), ("once", 1)]);
    assert_eq!(top[0].first_artist_name.as_deref(), Some("Artist hit"));

    let top = store.top_tracks("1", 7, 1).await.unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn test_reopen_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.db");
    let at = 1_704_067_200_000;

    let store = SqliteHistoryStore::open(&path).await.unwrap();
    assert_eq!(
        store.insert_batch(&[record("1", "a", at)]).await.unwrap(),
        1
    );
    store.close().await;

    let store = SqliteHistoryStore::open(&path).await.unwrap();
    assert_eq!(store.track_count(Some("1")).await.unwrap(), 1);
    assert_eq!(
        store.insert_batch(&[record("1", "a", at)]).await.unwrap(),
        0
    );
    assert_eq!(
        store
            .latest_played_at("1")
            .await
            .unwrap()
            .map(|dt| dt.timestamp_millis()),
        Some(at)
    );
    store.close().await;
}

// Writes a row behind the store's back, bypassing the typed insert path.
async fn insert_raw(path: &std::path::Path, played_at: &str, duration: &str) {
    let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    sqlx::query(&format!(
        "INSERT INTO track_history
            (played_at, user_id, provider_user_id, track_id, track_name, track_duration_ms)
         VALUES ({}, '1', 'me', 'corrupt', 'Corrupt', {})",
        played_at, duration
    ))
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
}

#[tokio::test]
async fn test_negative_duration_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    SqliteHistoryStore::open(&path).await.unwrap().close().await;

    insert_raw(&path, "1704067200000", "-5").await;

    let store = SqliteHistoryStore::open(&path).await.unwrap();
    let result = store.recent_tracks("1", 10).await;
    assert!(matches!(result, Err(WatchError::Storage(_))));
    store.close().await;
}

#[tokio::test]
async fn test_mistyped_column_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    SqliteHistoryStore::open(&path).await.unwrap().close().await;

    insert_raw(&path, "'yesterday'", "1000").await;

    let store = SqliteHistoryStore::open(&path).await.unwrap();
    let result = store.recent_tracks("1", 10).await;
    assert!(matches!(result, Err(WatchError::Storage(_))));
    store.close().await;
}
