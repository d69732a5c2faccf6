//! # API Module
//!
//! HTTP endpoints served by the short-lived local server that runs while
//! `spotwatch auth` waits for Spotify to redirect back.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives the OAuth redirect, checks the `state` value
//!   against the one generated for this flow and exchanges the authorization
//!   code (plus PKCE verifier) for a token. The token is written into the
//!   shared state the auth flow is polling.
//! - [`health`] - Returns name and version; handy to check that the redirect
//!   URI actually reaches this process.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let app = spotwatch::server::router(Arc::new(Mutex::new(None)));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
