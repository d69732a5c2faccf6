use reqwest::Client;

use crate::{
    config,
    error::{Result, WatchError},
    spotify::auth::TokenProvider,
    types::RawPage,
};

/// Largest page size the endpoint accepts.
pub const MAX_LIMIT: u32 = 50;

/// Validated parameters for one recently-played request.
///
/// Cursor values are absolute instants in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentlyPlayedQuery {
    limit: u32,
    after: Option<i64>,
    before: Option<i64>,
}

impl RecentlyPlayedQuery {
    /// Creates a query after checking the endpoint's preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidParameter`] if `limit` is outside
    /// `1..=50` or if both `after` and `before` are set.
    pub fn new(limit: u32, after: Option<i64>, before: Option<i64>) -> Result<Self> {
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(WatchError::invalid(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }
        if after.is_some() && before.is_some() {
            return Err(WatchError::invalid(
                "only one of 'after' or 'before' can be set",
            ));
        }
        Ok(Self {
            limit,
            after,
            before,
        })
    }

    pub fn after(limit: u32, cursor: i64) -> Result<Self> {
        Self::new(limit, Some(cursor), None)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn after_cursor(&self) -> Option<i64> {
        self.after
    }

    pub fn before_cursor(&self) -> Option<i64> {
        self.before
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(after) = self.after {
            params.push(("after", after.to_string()));
        }
        if let Some(before) = self.before {
            params.push(("before", before.to_string()));
        }
        params
    }
}

/// Anything that can serve pages of the recently-played history.
#[allow(async_fn_in_trait)]
pub trait RecentlyPlayedSource {
    async fn fetch(&mut self, query: &RecentlyPlayedQuery) -> Result<RawPage>;
}

/// Validates the parameters and fetches a single page.
///
/// This is the raw fetch contract: `limit` in `1..=50` and at most one cursor.
/// Validation happens before any request is sent.
pub async fn fetch_recently_played<S: RecentlyPlayedSource>(
    source: &mut S,
    limit: u32,
    after: Option<i64>,
    before: Option<i64>,
) -> Result<RawPage> {
    let query = RecentlyPlayedQuery::new(limit, after, before)?;
    source.fetch(&query).await
}

/// Spotify Web API client for the recently-played endpoint.
///
/// Every request asks the [`TokenProvider`] for a bearer token, so a
/// [`crate::management::TokenManager`] transparently refreshes expired tokens
/// between pages.
///
/// # API Endpoint
///
/// `GET {api_url}/me/player/recently-played?limit=..&after=..|before=..`
///
/// # Error Handling
///
/// - Network errors surface as [`WatchError::Request`]
/// - Any non-2xx status surfaces as [`WatchError::Upstream`] with the body
/// - A body that is not a page document surfaces as [`WatchError::Decode`]
///
/// No retry is attempted, including for `429 Too Many Requests`.
///
/// # Example
///
/// ```
/// let mut client = SpotifyClient::new("https://api.spotify.com/v1", StaticToken(token));
/// let query = RecentlyPlayedQuery::new(50, None, None)?;
/// let page = client.fetch(&query).await?;
/// println!("{} items, has next: {}", page.item_count(), page.has_next());
/// ```
pub struct SpotifyClient<T: TokenProvider> {
    http: Client,
    api_url: String,
    tokens: T,
}

impl<T: TokenProvider> SpotifyClient<T> {
    pub fn new(api_url: impl Into<String>, tokens: T) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Creates a client for the API base URL configured in `SPOTIFY_API_URL`.
    pub fn from_env(tokens: T) -> Self {
        Self::new(config::spotify_apiurl(), tokens)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/me/player/recently-played", self.api_url)
    }
}

impl<T: TokenProvider> RecentlyPlayedSource for SpotifyClient<T> {
    async fn fetch(&mut self, query: &RecentlyPlayedQuery) -> Result<RawPage> {
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(self.endpoint())
            .query(&query.params())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WatchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!(
            "GET {} {:?} -> {} bytes",
            self.endpoint(),
            query.params(),
            body.len()
        );
        Ok(serde_json::from_str(&body)?)
    }
}
