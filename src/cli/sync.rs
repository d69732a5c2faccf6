use crate::{
    Res,
    cli::{open_store, spinner},
    config::Settings,
    error,
    history::{PaginationOptions, Termination},
    info,
    management::TokenManager,
    spotify::recently_played::SpotifyClient,
    success,
    sync::{SyncReport, SyncRequest, sync_history},
    utils,
};

pub async fn sync(
    since: Option<String>,
    until: Option<String>,
    limit: Option<u32>,
    delay_ms: Option<u64>,
) {
    match call_sync(since, until, limit, delay_ms).await {
        Ok(report) if report.pages == 0 => success!("History is already up to date."),
        Ok(report) => {
            info!(
                "Window {} - {}, {} pages ({})",
                utils::format_millis(report.start),
                utils::format_millis(report.end),
                report.pages,
                describe(report.termination)
            );
            success!(
                "Inserted {} new plays (out of {} fetched)",
                report.inserted,
                report.fetched
            );
        }
        Err(e) => error!("Sync failed: {}", e),
    }
}

async fn call_sync(
    since: Option<String>,
    until: Option<String>,
    limit: Option<u32>,
    delay_ms: Option<u64>,
) -> Res<SyncReport> {
    let settings = Settings::from_env()?;
    let request = SyncRequest {
        user_id: settings.user_id.clone(),
        provider_user_id: settings.provider_user_id.clone(),
        since: since.as_deref().map(utils::date_to_millis).transpose()?,
        until: until.as_deref().map(utils::date_to_millis).transpose()?,
        initial_lookback_days: settings.initial_lookback_days,
        options: PaginationOptions {
            limit: limit.unwrap_or(settings.page_limit),
            request_delay: delay_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or(settings.request_delay),
        },
    };

    let store = open_store(&settings).await?;
    let tokens = TokenManager::load().await?;
    let mut client = SpotifyClient::from_env(tokens);

    let pb = spinner("Fetching recently played tracks...");
    let result = sync_history(&mut client, &store, &request).await;
    pb.finish_and_clear();

    store.close().await;
    Ok(result?)
}

fn describe(termination: Option<Termination>) -> &'static str {
    match termination {
        Some(Termination::WindowComplete) => "reached end of window",
        Some(Termination::Exhausted) => "no more plays",
        Some(Termination::Aborted) => "aborted",
        None => "not started",
    }
}
