use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, Url, header::AUTHORIZATION};
use tokio::sync::Mutex;

use crate::{
    config,
    error::{Result, WatchError},
    server::start_api_server,
    types::{PkceToken, Token, TokenResponse},
    utils, warning,
};

/// Source of bearer tokens for Spotify API requests.
///
/// Implementations may refresh or persist tokens as a side effect, hence the
/// `&mut self` receiver.
#[allow(async_fn_in_trait)]
pub trait TokenProvider {
    async fn access_token(&mut self) -> Result<String>;
}

/// A fixed bearer token that never expires from the client's point of view.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    async fn access_token(&mut self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Client identity used against the token endpoint.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl ClientCredentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: config::spotify_client_id()?,
            client_secret: config::spotify_client_secret(),
            token_url: config::spotify_apitoken_url(),
        })
    }
}

/// Builds the Spotify authorization URL for the authorization code flow.
///
/// The URL carries the PKCE `code_challenge` (S256) and the random `state`
/// that the callback handler compares against before exchanging the code.
/// All query values are percent-encoded, so scopes may contain spaces.
///
/// # Errors
///
/// Returns [`WatchError::Config`] if `auth_url` is not a valid URL.
///
/// # Example
///
/// ```
/// let url = authorize_url(
///     "https://accounts.spotify.com/authorize",
///     "client-id",
///     "http://127.0.0.1:8080/callback",
///     "user-read-recently-played",
///     &challenge,
///     &state,
/// )?;
/// ```
pub fn authorize_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    code_challenge: &str,
    state: &str,
) -> Result<String> {
    let url = Url::parse_with_params(
        auth_url,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", scope),
            ("state", state),
            ("show_dialog", "false"),
        ],
    )
    .map_err(|e| WatchError::Config(format!("invalid authorization url {}: {}", auth_url, e)))?;

    Ok(url.to_string())
}

/// Runs the complete interactive OAuth 2.0 authorization flow.
///
/// This function orchestrates the entire authentication process including:
/// 1. Generating the PKCE code verifier/challenge and a random `state`
/// 2. Starting a local callback server
/// 3. Opening the authorization URL in the user's browser
/// 4. Waiting for the OAuth callback
///
/// The authorization URL is also returned through a warning when the browser
/// cannot be opened, so the flow works on machines without a desktop session
/// as long as the redirect reaches the callback server.
///
/// # Arguments
///
/// * `shared_state` - Shared state between the flow and the callback handler;
///   holds the verifier, the expected `state` and, once exchanged, the token
///
/// # Returns
///
/// - `Ok(Token)` - Token obtained from the code exchange
/// - `Err(WatchError)` - Missing configuration or no callback within 60 seconds
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tokio::sync::Mutex;
///
/// let shared_state = Arc::new(Mutex::new(None));
/// let token = auth(shared_state).await?;
/// ```
pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Result<Token> {
    // generate PKCE verifier, challenge and CSRF state
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let state = utils::generate_state();

    let auth_url = authorize_url(
        &config::spotify_apiauth_url(),
        &config::spotify_client_id()?,
        &config::spotify_redirect_uri()?,
        &config::spotify_scope(),
        &code_challenge,
        &state,
    )?;
    let server_addr = config::server_addr()?;

    // Store verifier and state before redirect
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier,
            state,
            token: None,
        });
    }

    // start API server
    let server_state = Arc::clone(&shared_state);
    tokio::spawn(async move {
        if let Err(e) = start_api_server(&server_addr, server_state).await {
            log::error!("Callback server stopped: {}", e);
        }
    });

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    wait_for_token(shared_state)
        .await
        .ok_or_else(|| WatchError::Auth("authentication failed or timed out".to_string()))
}

/// Waits for the OAuth callback to complete and return a token.
///
/// Polls the shared state once per second for at most 60 seconds.
async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(pkce_token) = lock.as_ref() {
            if let Some(token) = &pkce_token.token {
                return Some(token.clone());
            }
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Refreshes an access token using a refresh token.
///
/// Exchanges a long-lived refresh token for a new short-lived access token.
/// When the response does not rotate the refresh token, the one passed in is
/// kept in the returned [`Token`].
///
/// # Arguments
///
/// * `credentials` - Client identity and token endpoint
/// * `refresh_token` - Refresh token obtained from an earlier authorization
///
/// # Errors
///
/// - [`WatchError::Request`] - Network failure
/// - [`WatchError::Upstream`] - Token endpoint rejected the request
/// - [`WatchError::Decode`] - Response was not a token document
///
/// # Example
///
/// ```
/// let credentials = ClientCredentials::from_env()?;
/// let token = refresh_token(&credentials, "AQC...refresh_token").await?;
/// println!("New access token expires in {} seconds", token.expires_in);
/// ```
pub async fn refresh_token(credentials: &ClientCredentials, refresh_token: &str) -> Result<Token> {
    let response = request_token(
        credentials,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await?;

    Ok(into_token(response, Some(refresh_token)))
}

/// Exchanges an authorization code for an access token.
///
/// Completes the authorization code flow. The PKCE `verifier` must be the one
/// whose challenge was sent in the authorization request.
///
/// # Errors
///
/// - [`WatchError::Request`] - Network failure
/// - [`WatchError::Upstream`] - Invalid/expired code or verifier mismatch
/// - [`WatchError::Decode`] - Response was not a token document
pub async fn exchange_code(
    credentials: &ClientCredentials,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> Result<Token> {
    let response = request_token(
        credentials,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await?;

    Ok(into_token(response, None))
}

async fn request_token(
    credentials: &ClientCredentials,
    params: &[(&str, &str)],
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = params.to_vec();

    let client = Client::new();
    let mut request = client.post(&credentials.token_url);
    match &credentials.client_secret {
        Some(secret) => {
            request = request.header(
                AUTHORIZATION,
                utils::basic_auth_header(&credentials.client_id, secret),
            );
        }
        None => form.push(("client_id", &credentials.client_id)),
    }

    let response = request.form(&form).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(WatchError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn into_token(response: TokenResponse, previous_refresh: Option<&str>) -> Token {
    Token {
        access_token: response.access_token,
        refresh_token: response
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default(),
        scope: response.scope,
        expires_in: response.expires_in.unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    }
}
