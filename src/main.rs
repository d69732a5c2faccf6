use std::{path::PathBuf, sync::Arc};

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotwatch::{cli, config, error, types::PkceToken};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Fetch and store all plays since the last stored one
    Sync(SyncOptions),

    /// Fetch a single page of recently played tracks
    Fetch(FetchOptions),

    /// Show the most recently stored plays
    Recent(RecentOptions),

    /// Show the most played tracks
    Top(TopOptions),

    /// Show statistics about the stored history
    Info,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SyncOptions {
    /// Start date (YYYY-MM-DD), overrides the last stored play
    #[clap(long)]
    pub since: Option<String>,

    /// End date (YYYY-MM-DD), defaults to now
    #[clap(long)]
    pub until: Option<String>,

    /// Items per request (1-50)
    #[clap(long)]
    pub limit: Option<u32>,

    /// Pause between requests in milliseconds
    #[clap(long)]
    pub delay_ms: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct FetchOptions {
    /// Items to fetch (1-50)
    #[clap(long, default_value_t = 50)]
    pub limit: u32,

    /// Only plays after this instant (epoch milliseconds)
    #[clap(long, conflicts_with = "before")]
    pub after: Option<i64>,

    /// Only plays before this instant (epoch milliseconds)
    #[clap(long)]
    pub before: Option<i64>,

    /// Write the raw API response to this file
    #[clap(long)]
    pub save: Option<PathBuf>,

    /// Do not store the parsed plays
    #[clap(long)]
    pub no_store: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecentOptions {
    #[clap(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct TopOptions {
    /// Number of days to look back
    #[clap(long, default_value_t = 7)]
    pub days: i64,

    #[clap(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(Arc::clone(&oauth_result)).await;
        }
        Command::Sync(opt) => cli::sync(opt.since, opt.until, opt.limit, opt.delay_ms).await,
        Command::Fetch(opt) => {
            cli::fetch(opt.limit, opt.after, opt.before, opt.save, opt.no_store).await
        }
        Command::Recent(opt) => cli::recent(opt.limit).await,
        Command::Top(opt) => cli::top(opt.days, opt.limit).await,
        Command::Info => cli::info().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
