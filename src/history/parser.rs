use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    types::{PlayHistoryItem, PlayRecord, RawPage},
    utils,
};

/// Why a single page item was dropped.
///
/// Never returned to callers of [`parse_page`]; it only feeds the warning log.
#[derive(Error, Debug)]
pub enum RecordParseError {
    #[error("item is not a play history object: {0}")]
    Undecodable(#[from] serde_json::Error),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unparsable played_at timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Maps one raw page into play records, keeping the page order.
///
/// Missing or empty `items` yields an empty list. Each item is decoded on its
/// own; an item that fails is logged and skipped while the rest of the page
/// is still returned.
pub fn parse_page(page: &RawPage, user_id: &str, provider_user_id: &str) -> Vec<PlayRecord> {
    let Some(items) = page.items.as_ref() else {
        return Vec::new();
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse_item(item, user_id, provider_user_id) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping play history item #{}: {}", index, e),
        }
    }

    if records.len() < items.len() {
        log::debug!(
            "Parsed {} of {} play history items",
            records.len(),
            items.len()
        );
    }
    records
}

/// Decodes and validates a single play history item.
pub fn parse_item(
    item: &Value,
    user_id: &str,
    provider_user_id: &str,
) -> Result<PlayRecord, RecordParseError> {
    let item = PlayHistoryItem::deserialize(item)?;

    let raw_played_at = item
        .played_at
        .ok_or(RecordParseError::MissingField("played_at"))?;
    let played_at = utils::parse_played_at(&raw_played_at)
        .ok_or(RecordParseError::InvalidTimestamp(raw_played_at))?;

    let track = item.track.ok_or(RecordParseError::MissingField("track"))?;
    let track_id = track.id.ok_or(RecordParseError::MissingField("track.id"))?;
    let track_name = track
        .name
        .ok_or(RecordParseError::MissingField("track.name"))?;
    let track_duration_ms = track
        .duration_ms
        .ok_or(RecordParseError::MissingField("track.duration_ms"))?;

    let (album_id, album_name) = track
        .album
        .map(|album| (album.id, album.name))
        .unwrap_or_default();
    let (first_artist_id, first_artist_name) = track
        .artists
        .and_then(|artists| artists.into_iter().next())
        .map(|artist| (artist.id, artist.name))
        .unwrap_or_default();

    Ok(PlayRecord {
        played_at,
        user_id: user_id.to_string(),
        provider_user_id: provider_user_id.to_string(),
        track_id,
        track_name,
        track_duration_ms,
        track_popularity: track.popularity,
        album_id,
        album_name,
        first_artist_id,
        first_artist_name,
        isrc: track.external_ids.and_then(|ids| ids.isrc),
    })
}
