use std::path::PathBuf;

use chrono::Utc;

use crate::{
    config,
    error::{Result, WatchError},
    spotify::auth::{ClientCredentials, TokenProvider, refresh_token},
    types::Token,
};

// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: u64 = 240;

pub struct TokenManager {
    token: Token,
    path: PathBuf,
    credentials: Option<ClientCredentials>,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager {
            token,
            path: Self::token_path(),
            credentials: None,
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Loads the cached token, or bootstraps one from `SPOTIFY_REFRESH_TOKEN`.
    pub async fn load() -> Result<Self> {
        let path = Self::token_path();
        let token = match async_fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) => match config::spotify_refresh_token() {
                Some(refresh) => {
                    log::info!("No cached token ({}), using SPOTIFY_REFRESH_TOKEN", e);
                    Self::bootstrap(refresh)
                }
                None => {
                    return Err(WatchError::Auth(format!(
                        "no token at {}: {}. Run spotwatch auth first",
                        path.display(),
                        e
                    )));
                }
            },
        };

        Ok(Self {
            token,
            path,
            credentials: None,
        })
    }

    /// A token that only carries a refresh token and is already expired.
    pub fn bootstrap(refresh_token: String) -> Token {
        Token {
            access_token: String::new(),
            refresh_token,
            scope: String::new(),
            expires_in: 0,
            obtained_at: 0,
        }
    }

    pub async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.token)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn get_valid_token(&mut self) -> Result<String> {
        if self.is_expired() {
            let credentials = match &self.credentials {
                Some(credentials) => credentials.clone(),
                None => ClientCredentials::from_env()?,
            };
            self.token = refresh_token(&credentials, &self.token.refresh_token)
                .await
                .map_err(|e| WatchError::Auth(format!("token refresh failed: {}", e)))?;
            self.persist().await?;
            log::debug!("Access token refreshed");
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        self.token.access_token.is_empty()
            || now + EXPIRY_MARGIN_SECS >= self.token.obtained_at + self.token.expires_in
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache/token.json")
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}

impl TokenProvider for TokenManager {
    async fn access_token(&mut self) -> Result<String> {
        self.get_valid_token().await
    }
}
