use std::path::PathBuf;

use crate::{
    Res,
    cli::{history::print_plays, open_store, spinner},
    config::Settings,
    error,
    history::parse_page,
    info,
    management::TokenManager,
    spotify::recently_played::{RecentlyPlayedQuery, RecentlyPlayedSource, SpotifyClient},
    storage::HistoryStore,
    success, warning,
};

pub async fn fetch(
    limit: u32,
    after: Option<i64>,
    before: Option<i64>,
    save: Option<PathBuf>,
    no_store: bool,
) {
    if let Err(e) = call_fetch(limit, after, before, save, no_store).await {
        error!("Fetch failed: {}", e);
    }
}

async fn call_fetch(
    limit: u32,
    after: Option<i64>,
    before: Option<i64>,
    save: Option<PathBuf>,
    no_store: bool,
) -> Res<()> {
    let settings = Settings::from_env()?;
    let query = RecentlyPlayedQuery::new(limit, after, before)?;

    let tokens = TokenManager::load().await?;
    let mut client = SpotifyClient::from_env(tokens);

    let pb = spinner("Fetching recently played tracks...");
    let page = client.fetch(&query).await;
    pb.finish_and_clear();
    let page = page?;

    if let Some(path) = save {
        async_fs::write(&path, serde_json::to_string_pretty(&page)?).await?;
        info!("Raw response written to {}", path.display());
    }

    let records = parse_page(&page, &settings.user_id, &settings.provider_user_id);
    info!(
        "Fetched {} items, parsed {} plays",
        page.item_count(),
        records.len()
    );
    if records.is_empty() {
        warning!("No plays were parsed from the response");
        return Ok(());
    }

    print_plays(&records);

    if !no_store {
        let store = open_store(&settings).await?;
        let inserted = store.insert_batch(&records).await?;
        store.close().await;
        success!("Inserted {} new plays", inserted);
    }
    Ok(())
}
