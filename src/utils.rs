use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::error::{Result, WatchError};

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random OAuth `state` value, echoed back by the callback.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// `Authorization` header value for HTTP Basic client authentication.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let credentials = format!("{}:{}", client_id, client_secret);
    format!("Basic {}", STANDARD.encode(credentials))
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Parses a provider timestamp such as `2016-12-13T20:44:04.589Z` as UTC.
pub fn parse_played_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Start of the given `YYYY-MM-DD` day in UTC, as epoch milliseconds.
pub fn date_to_millis(date: &str) -> Result<i64> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| WatchError::invalid(format!("expected YYYY-MM-DD, got '{}'", date)))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| WatchError::invalid(format!("invalid date '{}'", date)))?;
    Ok(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

pub fn days_ago_millis(days: i64) -> i64 {
    (Utc::now() - Duration::days(days)).timestamp_millis()
}

pub fn format_played_at(played_at: &DateTime<Utc>) -> String {
    played_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn format_millis(millis: i64) -> String {
    millis_to_datetime(millis)
        .map(|dt| format_played_at(&dt))
        .unwrap_or_else(|| millis.to_string())
}
