//! # Spotify Integration Module
//!
//! This module provides the interface to the Spotify Web API that spotwatch
//! needs: obtaining bearer tokens and reading the user's recently-played
//! history. It handles all HTTP communication with Spotify, so the history
//! layer above it only deals with typed pages.
//!
//! ## Architecture
//!
//! ```text
//! Application Layer (CLI, Sync)
//!          ↓
//! History Layer (Parser, Paginator)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (OAuth 2.0 authorization code + PKCE, refresh)
//!     └── Recently Played (cursor-paginated play history)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! ### Authentication Module
//!
//! [`auth`] - Token acquisition and renewal:
//! - **Interactive Flow**: Authorization URL, local callback server and code exchange
//! - **State Check**: The callback rejects responses whose `state` does not match
//! - **Refresh**: Exchanges a long-lived refresh token for a short-lived bearer token
//! - **Token Providers**: The [`auth::TokenProvider`] seam used by every API call
//!
//! ### Recently Played Module
//!
//! [`recently_played`] - Wraps `GET /me/player/recently-played`:
//! - **Parameter Validation**: `limit` in `1..=50`, at most one of `after`/`before`
//! - **Raw Pages**: Items stay loosely typed so the parser can skip bad entries
//! - **Cursor Metadata**: Exposes the `next` link and `cursors.after` value
//!
//! ## Error Handling Philosophy
//!
//! Non-success responses become [`crate::WatchError::Upstream`] carrying the
//! status code and body. Nothing in this layer retries on its own; the caller
//! decides what a failed request means for the current run.
//!
//! ## API Coverage
//!
//! - `GET /me/player/recently-played` - Play history with cursor pagination
//! - `POST /api/token` - Authorization code exchange and token refresh
//!
//! ## Usage Patterns
//!
//! ```rust
//! let tokens = TokenManager::load().await?;
//! let mut client = SpotifyClient::from_env(tokens);
//! let query = RecentlyPlayedQuery::new(50, Some(after_ms), None)?;
//! let page = client.fetch(&query).await?;
//! ```

pub mod auth;
pub mod recently_played;
