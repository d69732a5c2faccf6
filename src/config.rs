//! Configuration management for the Spotify listening history watcher.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, server settings, storage
//! location and the tuning knobs of the history sync.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::error::{Result, WatchError};

pub const DEFAULT_SCOPE: &str = "user-read-recently-played user-top-read";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
pub const DEFAULT_INITIAL_LOOKBACK_DAYS: i64 = 7;

/// Returns the application directory inside the platform's local data directory.
///
/// - Linux: `~/.local/share/spotwatch`
/// - macOS: `~/Library/Application Support/spotwatch`
/// - Windows: `%LOCALAPPDATA%/spotwatch`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotwatch");
    path
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from `spotwatch/.env` in the platform-specific local
/// data directory. A missing file is not an error: every value can also be
/// supplied through the process environment, which always takes precedence.
///
/// # Errors
///
/// This function will return an error if:
/// - The parent directory cannot be created
/// - The `.env` file exists but cannot be read or parsed
///
/// # Example
///
/// ```
/// use spotwatch::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<()> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir).await?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path)
            .map_err(|e| WatchError::Config(format!("{}: {}", path.display(), e)))?;
    }
    Ok(())
}

/// Reads a required environment variable.
///
/// # Errors
///
/// Returns [`WatchError::Config`] naming the variable when it is unset or not
/// valid unicode.
pub fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| WatchError::Config(format!("{} must be set", name)))
}

/// Reads an optional environment variable, treating empty values as unset.
pub fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| WatchError::Config(format!("{} has an invalid value: {}", name, raw))),
        None => Ok(default),
    }
}

/// Returns the server address for the local OAuth callback server.
///
/// Retrieves the `SERVER_ADDRESS` environment variable which specifies
/// the address and port where the local HTTP server should bind for
/// handling OAuth callbacks during the authentication flow.
///
/// # Example
///
/// ```
/// let addr = server_addr()?; // e.g., "127.0.0.1:8080"
/// ```
pub fn server_addr() -> Result<String> {
    required("SERVER_ADDRESS")
}

/// Returns the Spotify user ID the history belongs to.
///
/// Retrieves `SPOTIFY_USER_ID`, defaulting to `"1"` for single-user setups
/// where the provider account id is not tracked.
pub fn spotify_user() -> String {
    optional("SPOTIFY_USER_ID").unwrap_or_else(|| "1".to_string())
}

/// Returns the internal user ID stored alongside every play.
///
/// Retrieves `SPOTWATCH_USER_ID`, defaulting to `"1"`.
pub fn internal_user() -> String {
    optional("SPOTWATCH_USER_ID").unwrap_or_else(|| "1".to_string())
}

/// Returns the Spotify API client ID for authentication.
///
/// Retrieves the `SPOTIFY_API_AUTH_CLIENT_ID` environment variable which
/// contains the client ID obtained when registering the application with
/// Spotify's developer platform.
///
/// # Example
///
/// ```
/// let client_id = spotify_client_id()?; // e.g., "abc123..."
/// ```
pub fn spotify_client_id() -> Result<String> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Returns the Spotify API client secret, if one is configured.
///
/// When present the token endpoint is called with HTTP Basic client
/// authentication; otherwise the public-client PKCE form is used.
///
/// # Security Note
///
/// The client secret should be kept confidential and never exposed in logs
/// or version control.
pub fn spotify_client_secret() -> Option<String> {
    optional("SPOTIFY_API_AUTH_CLIENT_SECRET")
}

/// Returns the Spotify OAuth redirect URI.
///
/// Retrieves the `SPOTIFY_API_REDIRECT_URI` environment variable which specifies
/// the callback URL that Spotify should redirect to after user authorization.
/// This must match the redirect URI registered in the Spotify application settings.
///
/// # Example
///
/// ```
/// let redirect_uri = spotify_redirect_uri()?; // e.g., "http://127.0.0.1:8080/callback"
/// ```
pub fn spotify_redirect_uri() -> Result<String> {
    required("SPOTIFY_API_REDIRECT_URI")
}

/// Returns the Spotify API scope permissions.
///
/// Defaults to `user-read-recently-played user-top-read`, the scopes the
/// recently-played endpoint needs.
pub fn spotify_scope() -> String {
    optional("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string())
}

/// Returns the Spotify OAuth authorization URL.
pub fn spotify_apiauth_url() -> String {
    optional("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string())
}

/// Returns the Spotify Web API base URL.
///
/// Retrieves `SPOTIFY_API_URL`, which is used for all API operations after
/// authentication.
///
/// # Example
///
/// ```
/// let api_url = spotify_apiurl(); // e.g., "https://api.spotify.com/v1"
/// ```
pub fn spotify_apiurl() -> String {
    optional("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Returns the Spotify OAuth token exchange URL.
pub fn spotify_apitoken_url() -> String {
    optional("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string())
}

/// Returns a refresh token supplied through the environment.
///
/// Used to bootstrap headless installations that never ran the interactive
/// `auth` command.
pub fn spotify_refresh_token() -> Option<String> {
    optional("SPOTIFY_REFRESH_TOKEN")
}

/// Returns the path of the SQLite history database.
pub fn database_path() -> PathBuf {
    optional("SPOTWATCH_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("history.db"))
}

/// Runtime settings for a history sync.
#[derive(Debug, Clone)]
pub struct Settings {
    pub user_id: String,
    pub provider_user_id: String,
    pub database_path: PathBuf,
    pub page_limit: u32,
    pub request_delay: Duration,
    pub initial_lookback_days: i64,
}

impl Settings {
    /// Gathers the sync settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Config`] if `SPOTWATCH_PAGE_LIMIT`,
    /// `SPOTWATCH_REQUEST_DELAY_MS` or `SPOTWATCH_INITIAL_LOOKBACK_DAYS` hold
    /// values that are not numbers.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user_id: internal_user(),
            provider_user_id: spotify_user(),
            database_path: database_path(),
            page_limit: parsed_or("SPOTWATCH_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?,
            request_delay: Duration::from_millis(parsed_or(
                "SPOTWATCH_REQUEST_DELAY_MS",
                DEFAULT_REQUEST_DELAY_MS,
            )?),
            initial_lookback_days: parsed_or(
                "SPOTWATCH_INITIAL_LOOKBACK_DAYS",
                DEFAULT_INITIAL_LOOKBACK_DAYS,
            )?,
        })
    }
}
