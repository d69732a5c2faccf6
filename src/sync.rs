//! Incremental ingestion: resume from the newest stored play, page forward,
//! store every batch as it arrives.

use chrono::{DateTime, Utc};

use crate::{
    error::{Result, WatchError},
    history::{HistoryPaginator, PaginationOptions, Termination},
    spotify::recently_played::RecentlyPlayedSource,
    storage::HistoryStore,
    utils,
};

/// What to sync and how.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub user_id: String,
    pub provider_user_id: String,
    /// Overrides the stored resume point (epoch milliseconds).
    pub since: Option<i64>,
    /// End of the window (epoch milliseconds); defaults to now.
    pub until: Option<i64>,
    /// Lookback used when nothing is stored yet.
    pub initial_lookback_days: i64,
    pub options: PaginationOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub start: i64,
    pub end: i64,
    pub batches: usize,
    pub pages: usize,
    pub fetched: usize,
    pub inserted: u64,
    pub termination: Option<Termination>,
}

/// Picks the instant the next sync starts from.
pub async fn resume_point<H: HistoryStore>(store: &H, request: &SyncRequest) -> Result<i64> {
    if let Some(since) = request.since {
        return Ok(since);
    }

    let latest: Option<DateTime<Utc>> = store.latest_played_at(&request.user_id).await?;
    Ok(match latest {
        Some(latest) => {
            log::info!("Last stored play at {}", utils::format_played_at(&latest));
            latest.timestamp_millis()
        }
        None => {
            log::info!(
                "No stored plays, fetching the last {} days",
                request.initial_lookback_days
            );
            utils::days_ago_millis(request.initial_lookback_days)
        }
    })
}

/// Pages through the history after the resume point and stores each batch.
///
/// A failed fetch aborts the run; batches stored before the failure stay.
/// When the stored resume point is not before the end of the window there is
/// nothing to ask for and an empty report is returned. An explicit `since`
/// that is not before the end is rejected instead.
pub async fn sync_history<S, H>(
    source: &mut S,
    store: &H,
    request: &SyncRequest,
) -> Result<SyncReport>
where
    S: RecentlyPlayedSource,
    H: HistoryStore,
{
    let start = resume_point(store, request).await?;
    let end = request.until.unwrap_or_else(utils::now_millis);

    let mut report = SyncReport {
        start,
        end,
        ..SyncReport::default()
    };
    if start >= end {
        if request.since.is_some() {
            return Err(WatchError::invalid(format!(
                "since ({}) must be before until ({})",
                utils::format_millis(start),
                utils::format_millis(end)
            )));
        }
        log::info!("History is up to date");
        return Ok(report);
    }

    let mut pages = HistoryPaginator::new(
        source,
        start,
        Some(end),
        request.user_id.clone(),
        request.provider_user_id.clone(),
        request.options,
    )?;

    while let Some(batch) = pages.next_batch().await? {
        report.batches += 1;
        report.fetched += batch.len();
        report.inserted += store.insert_batch(&batch).await?;
    }

    report.pages = pages.pages_fetched();
    report.termination = pages.termination();
    Ok(report)
}
