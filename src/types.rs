use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub state: String,
    pub token: Option<Token>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub expires_in: Option<u64>,
}

/// One page of the "recently played" endpoint.
///
/// Items are kept as raw JSON so that a single malformed entry can be skipped
/// by the parser without failing the whole page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default, deserialize_with = "lenient")]
    pub items: Option<Vec<Value>>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub href: Option<String>,
}

impl RawPage {
    pub fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, |items| items.len())
    }

    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }

    /// Cursor for the following page, in epoch milliseconds.
    pub fn next_cursor(&self) -> Option<i64> {
        self.cursors.as_ref().and_then(|c| c.after)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cursors {
    #[serde(default, deserialize_with = "millis_from_string_or_number")]
    pub after: Option<i64>,
    #[serde(default, deserialize_with = "millis_from_string_or_number")]
    pub before: Option<i64>,
}

// Spotify sends cursors as strings ("1484811043508"); numbers are accepted too.
fn millis_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

// Optional fields: a value of the wrong shape is treated as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayHistoryItem {
    pub played_at: Option<String>,
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub duration_ms: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub popularity: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub album: Option<AlbumRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub artists: Option<Vec<ArtistRef>>,
    #[serde(default, deserialize_with = "lenient")]
    pub external_ids: Option<ExternalIds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumRef {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistRef {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    #[serde(default, deserialize_with = "lenient")]
    pub isrc: Option<String>,
}

/// A single observed play, normalized from one page item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord {
    pub played_at: DateTime<Utc>,
    pub user_id: String,
    pub provider_user_id: String,
    pub track_id: String,
    pub track_name: String,
    pub track_duration_ms: u64,
    pub track_popularity: Option<u32>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub first_artist_id: Option<String>,
    pub first_artist_name: Option<String>,
    pub isrc: Option<String>,
}

impl PlayRecord {
    pub fn played_at_ms(&self) -> i64 {
        self.played_at.timestamp_millis()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTrack {
    pub track_id: String,
    pub track_name: String,
    pub first_artist_name: Option<String>,
    pub play_count: i64,
}

#[derive(Tabled)]
pub struct PlayTableRow {
    pub played_at: String,
    pub track: String,
    pub artist: String,
    pub album: String,
}

#[derive(Tabled)]
pub struct TopTrackTableRow {
    pub rank: usize,
    pub track: String,
    pub artist: String,
    pub plays: i64,
}
