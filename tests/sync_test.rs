use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat};
use serde_json::json;
use spotwatch::history::{PaginationOptions, Termination};
use spotwatch::spotify::recently_played::{RecentlyPlayedQuery, RecentlyPlayedSource};
use spotwatch::storage::{HistoryStore, SqliteHistoryStore};
use spotwatch::sync::{SyncRequest, resume_point, sync_history};
use spotwatch::types::{Cursors, PlayRecord, RawPage};
use spotwatch::utils::now_millis;
use spotwatch::{Result, WatchError};

const T0: i64 = 1_704_067_200_000;
const MINUTE: i64 = 60_000;
const DAY: i64 = 86_400_000;

#[derive(Default)]
struct FakeSpotify {
    pages: VecDeque<Result<RawPage>>,
    queries: Vec<RecentlyPlayedQuery>,
}

impl RecentlyPlayedSource for FakeSpotify {
    async fn fetch(&mut self, query: &RecentlyPlayedQuery) -> Result<RawPage> {
        self.queries.push(*query);
        self.pages.pop_front().unwrap_or_else(|| Ok(RawPage::default()))
    }
}

fn page(instants: &[i64], has_next: bool) -> RawPage {
    let items = instants
        .iter()
        .rev()
        .map(|ms| {
            let played_at = DateTime::from_timestamp_millis(*ms)
                .unwrap()
                .to_rfc3339_opts(SecondsFormat::Millis, true);
            json!({
                "played_at": played_at,
                "track": { "id": format!("t{}", ms), "name": "Song", "duration_ms": 1000 }
            })
        })
        .collect();
    RawPage {
        items: Some(items),
        next: has_next.then(|| "next".to_string()),
        cursors: instants.iter().max().map(|max| Cursors {
            after: Some(*max),
            before: None,
        }),
        ..RawPage::default()
    }
}

fn request(since: Option<i64>, until: Option<i64>) -> SyncRequest {
    SyncRequest {
        user_id: "1".to_string(),
        provider_user_id: "me".to_string(),
        since,
        until,
        initial_lookback_days: 7,
        options: PaginationOptions {
            limit: 50,
            request_delay: Duration::ZERO,
        },
    }
}

async fn seeded_store(at: i64) -> SqliteHistoryStore {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let mut source = FakeSpotify {
        pages: vec![Ok(page(&[at], false))].into(),
        ..FakeSpotify::default()
    };
    sync_history(&mut source, &store, &request(Some(at - 1), Some(at + 1)))
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_resume_from_latest_stored_play() {
    let store = seeded_store(T0).await;
    let mut source = FakeSpotify {
        pages: vec![
            Ok(page(&[T0, T0 + MINUTE], true)),
            Ok(page(&[T0 + 2 * MINUTE], false)),
        ]
        .into(),
        ..FakeSpotify::default()
    };

    let report = sync_history(&mut source, &store, &request(None, Some(T0 + DAY)))
        .await
        .unwrap();

    assert_eq!(source.queries[0].after_cursor(), Some(T0));
    assert_eq!(source.queries[1].after_cursor(), Some(T0 + MINUTE));
    assert_eq!(report.start, T0);
    assert_eq!(report.pages, 2);
    assert_eq!(report.batches, 2);
    assert_eq!(report.fetched, 3);
    // The play at T0 was already stored
    assert_eq!(report.inserted, 2);
    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(store.track_count(Some("1")).await.unwrap(), 3);
}

#[tokio::test]
async fn test_empty_store_uses_lookback() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let before = now_millis();
    let start = resume_point(&store, &request(None, None)).await.unwrap();

    let expected = before - 7 * DAY;
    assert!((expected - 1_000..=expected + 5_000).contains(&start));
}

#[tokio::test]
async fn test_explicit_since_wins() {
    let store = seeded_store(T0 + DAY).await;
    let start = resume_point(&store, &request(Some(T0), None)).await.unwrap();
    assert_eq!(start, T0);
}

#[tokio::test]
async fn test_up_to_date_makes_no_request() {
    let store = seeded_store(T0).await;
    let mut source = FakeSpotify::default();

    let report = sync_history(&mut source, &store, &request(None, Some(T0)))
        .await
        .unwrap();

    assert!(source.queries.is_empty());
    assert_eq!(report.pages, 0);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.termination, None);
}

#[tokio::test]
async fn test_failure_keeps_stored_batches() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();
    let mut source = FakeSpotify {
        pages: vec![
            Ok(page(&[T0 + MINUTE, T0 + 2 * MINUTE], true)),
            Err(WatchError::Upstream {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        ]
        .into(),
        ..FakeSpotify::default()
    };

    let result = sync_history(&mut source, &store, &request(Some(T0), Some(T0 + DAY))).await;

    assert!(matches!(result, Err(WatchError::Upstream { status: 502, .. })));
    let stored: Vec<PlayRecord> = store.recent_tracks("1", 10).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_inverted_explicit_window_is_rejected() {
    let store = SqliteHistoryStore::in_memory().await.unwrap();

    for (since, until) in [(T0 + DAY, T0), (T0, T0)] {
        let mut source = FakeSpotify::default();
        let result = sync_history(&mut source, &store, &request(Some(since), Some(until))).await;

        assert!(matches!(result, Err(WatchError::InvalidParameter(_))));
        assert!(source.queries.is_empty());
    }
}
