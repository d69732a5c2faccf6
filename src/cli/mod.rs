//! # CLI Module
//!
//! This module provides the command-line interface layer for spotwatch. It
//! implements all user-facing commands and coordinates between the Spotify
//! client, the history paginator and the local history database.
//!
//! ## Command Categories
//!
//! ### Authentication
//!
//! - [`auth`] - Runs the OAuth authorization flow and caches the token
//!
//! ### Ingestion
//!
//! - [`sync`] - Fetches every play since the newest stored one and stores it
//! - [`fetch`] - Fetches a single page, optionally dumping the raw JSON
//!
//! ### Queries
//!
//! - [`recent`] - Shows the newest stored plays
//! - [`top`] - Shows the most played tracks of the last days
//! - [`info`] - Shows how much history is stored
//!
//! ## Architecture Design
//!
//! ```text
//! CLI Layer (User Interface)
//!     ↓
//! Sync / History Layer (Pagination, Parsing)
//!     ↓
//! Spotify Layer + Storage Layer
//! ```
//!
//! Commands report progress with the crate's status macros and terminate via
//! [`crate::error!`] on unrecoverable failures. Library code underneath only
//! returns errors.
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotwatch auth                        # Authorize once
//! spotwatch sync                        # Run periodically (cron, systemd timer)
//! spotwatch recent --limit 20           # Inspect what was stored
//! spotwatch top --days 30               # Most played tracks this month
//! spotwatch fetch --save raw.json       # Debug the raw API response
//! ```

mod auth;
mod fetch;
mod history;
mod sync;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{Res, config::Settings, storage::SqliteHistoryStore};

pub use auth::auth;
pub use fetch::fetch;
pub use history::info;
pub use history::recent;
pub use history::top;
pub use sync::sync;

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

async fn open_store(settings: &Settings) -> Res<SqliteHistoryStore> {
    Ok(SqliteHistoryStore::open(&settings.database_path).await?)
}
