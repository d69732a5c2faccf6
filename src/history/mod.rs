//! Turning recently-played pages into an ordered play history.
//!
//! - [`parser`] maps one raw page to [`PlayRecord`]s, dropping malformed items
//! - [`paginator`] walks pages forward in time until the window end or the
//!   end of the data

pub mod paginator;
pub mod parser;

pub use paginator::{HistoryPaginator, PaginationOptions, Termination, get_all_tracks_since};
pub use parser::{RecordParseError, parse_item, parse_page};

use crate::{
    error::Result,
    spotify::recently_played::{RecentlyPlayedQuery, RecentlyPlayedSource},
    types::PlayRecord,
};

/// Fetches a single page and parses it.
pub async fn get_parsed_track_history<S: RecentlyPlayedSource>(
    source: &mut S,
    query: &RecentlyPlayedQuery,
    user_id: &str,
    provider_user_id: &str,
) -> Result<Vec<PlayRecord>> {
    let page = source.fetch(query).await?;
    Ok(parse_page(&page, user_id, provider_user_id))
}
