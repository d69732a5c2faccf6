use std::time::Duration;

use tokio::time::sleep;

use crate::{
    error::{Result, WatchError},
    history::parser::parse_page,
    spotify::recently_played::{MAX_LIMIT, RecentlyPlayedQuery, RecentlyPlayedSource},
    types::PlayRecord,
    utils,
};

/// Page size and pacing of a pagination run.
#[derive(Debug, Clone, Copy)]
pub struct PaginationOptions {
    pub limit: u32,
    /// Pause before every fetch except the first one.
    pub request_delay: Duration,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            limit: MAX_LIMIT,
            request_delay: Duration::from_millis(100),
        }
    }
}

/// Why a pagination run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Empty page, no next page, or no usable next cursor.
    Exhausted,
    /// A record newer than the end of the window was reached.
    WindowComplete,
    /// A fetch failed; the error was returned to the caller.
    Aborted,
}

/// Walks the recently-played history forward from a start instant.
///
/// The paginator is pull-based: nothing is fetched until [`next_batch`] is
/// awaited, and each call fetches at most the pages needed to produce one
/// non-empty batch. Once a terminal state is reached no further request is
/// made.
///
/// # Termination
///
/// - A page without items ends the run ([`Termination::Exhausted`])
/// - The first record played after `end_time` ends the run; records of that
///   page scanned before it are still returned, the rest of the page is
///   discarded ([`Termination::WindowComplete`])
/// - A page without a `next` link, or whose `after` cursor does not move
///   forward, ends the run after its records are returned
///   ([`Termination::Exhausted`])
///
/// Records already handed out stay valid when a later fetch fails.
///
/// # Example
///
/// ```
/// let mut pages = HistoryPaginator::new(&mut client, start_ms, None, "1", "me", options)?;
/// while let Some(batch) = pages.next_batch().await? {
///     store.insert_batch(&batch).await?;
/// }
/// ```
///
/// [`next_batch`]: HistoryPaginator::next_batch
pub struct HistoryPaginator<'a, S: RecentlyPlayedSource> {
    source: &'a mut S,
    user_id: String,
    provider_user_id: String,
    options: PaginationOptions,
    cursor: i64,
    end_time: i64,
    pages_fetched: usize,
    termination: Option<Termination>,
}

impl<'a, S: RecentlyPlayedSource> HistoryPaginator<'a, S> {
    /// Prepares a run over `(start_time, end_time]`, both in epoch milliseconds.
    ///
    /// `end_time` defaults to the current time.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidParameter`] before any request is made if
    /// `start_time` is not before `end_time` or the page limit is out of range.
    pub fn new(
        source: &'a mut S,
        start_time: i64,
        end_time: Option<i64>,
        user_id: impl Into<String>,
        provider_user_id: impl Into<String>,
        options: PaginationOptions,
    ) -> Result<Self> {
        let end_time = end_time.unwrap_or_else(utils::now_millis);
        if start_time >= end_time {
            return Err(WatchError::invalid(format!(
                "start_time ({}) must be before end_time ({})",
                start_time, end_time
            )));
        }
        RecentlyPlayedQuery::after(options.limit, start_time)?;

        log::info!(
            "Fetching plays from {} to {}",
            utils::format_millis(start_time),
            utils::format_millis(end_time)
        );

        Ok(Self {
            source,
            user_id: user_id.into(),
            provider_user_id: provider_user_id.into(),
            options,
            cursor: start_time,
            end_time,
            pages_fetched: 0,
            termination: None,
        })
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Returns the next non-empty batch of in-window records, or `None` once
    /// the run has terminated.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<PlayRecord>>> {
        loop {
            if self.termination.is_some() {
                return Ok(None);
            }

            if self.pages_fetched > 0 && !self.options.request_delay.is_zero() {
                sleep(self.options.request_delay).await;
            }

            let query = RecentlyPlayedQuery::after(self.options.limit, self.cursor)?;
            let page = match self.source.fetch(&query).await {
                Ok(page) => page,
                Err(e) => {
                    self.termination = Some(Termination::Aborted);
                    return Err(e);
                }
            };
            self.pages_fetched += 1;

            if page.item_count() == 0 {
                log::info!("No more plays found");
                self.termination = Some(Termination::Exhausted);
                return Ok(None);
            }

            let mut batch = parse_page(&page, &self.user_id, &self.provider_user_id);
            if let Some(outside) = batch
                .iter()
                .position(|record| record.played_at_ms() > self.end_time)
            {
                log::info!(
                    "Reached end of window at play from {}",
                    utils::format_played_at(&batch[outside].played_at)
                );
                batch.truncate(outside);
                self.termination = Some(Termination::WindowComplete);
            } else if !page.has_next() {
                log::info!("No next page available");
                self.termination = Some(Termination::Exhausted);
            } else {
                match page.next_cursor() {
                    Some(next) if next > self.cursor => self.cursor = next,
                    _ => {
                        log::info!("No usable after cursor, stopping pagination");
                        self.termination = Some(Termination::Exhausted);
                    }
                }
            }

            log::debug!(
                "Page {}: {} plays in window",
                self.pages_fetched,
                batch.len()
            );
            if !batch.is_empty() {
                return Ok(Some(batch));
            }
        }
    }

    /// Drives the run to completion and returns every record in order.
    pub async fn collect_all(mut self) -> Result<Vec<PlayRecord>> {
        let mut records = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            records.extend(batch);
        }
        log::debug!(
            "Collected {} plays from {} pages",
            records.len(),
            self.pages_fetched
        );
        Ok(records)
    }
}

/// Fetches every play between `start_time` and `end_time` (default: now).
pub async fn get_all_tracks_since<S: RecentlyPlayedSource>(
    source: &mut S,
    start_time: i64,
    end_time: Option<i64>,
    user_id: &str,
    provider_user_id: &str,
    options: PaginationOptions,
) -> Result<Vec<PlayRecord>> {
    HistoryPaginator::new(
        source,
        start_time,
        end_time,
        user_id,
        provider_user_id,
        options,
    )?
    .collect_all()
    .await
}
