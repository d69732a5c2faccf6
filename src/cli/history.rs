use tabled::Table;

use crate::{
    Res,
    cli::open_store,
    config::Settings,
    error, info,
    storage::HistoryStore,
    types::{PlayRecord, PlayTableRow, TopTrackTableRow},
    utils, warning,
};

struct HistoryStats {
    total: i64,
    user_total: i64,
    latest: Option<String>,
}

pub async fn recent(limit: u32) {
    match load_recent(limit).await {
        Ok(plays) if plays.is_empty() => warning!("No plays stored yet. Run spotwatch sync."),
        Ok(plays) => print_plays(&plays),
        Err(e) => error!("Failed to load recent plays. Err: {}", e),
    }
}

pub async fn top(days: i64, limit: u32) {
    match load_top(days, limit).await {
        Ok(rows) if rows.is_empty() => warning!("No plays in the last {} days.", days),
        Ok(rows) => println!("Top tracks of the last {} days\n{}", days, Table::new(rows)),
        Err(e) => error!("Failed to load top tracks. Err: {}", e),
    }
}

pub async fn info() {
    match load_stats().await {
        Ok(stats) => {
            info!("Stored plays (all users): {}", stats.total);
            info!("Stored plays (current user): {}", stats.user_total);
            match stats.latest {
                Some(latest) => info!("Latest play: {}", latest),
                None => warning!("No plays stored yet. Run spotwatch sync."),
            }
        }
        Err(e) => error!("Failed to read history database. Err: {}", e),
    }
}

async fn load_recent(limit: u32) -> Res<Vec<PlayRecord>> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let plays = store.recent_tracks(&settings.user_id, limit).await?;
    store.close().await;
    Ok(plays)
}

async fn load_top(days: i64, limit: u32) -> Res<Vec<TopTrackTableRow>> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let top = store.top_tracks(&settings.user_id, days, limit).await?;
    store.close().await;

    Ok(top
        .into_iter()
        .enumerate()
        .map(|(i, t)| TopTrackTableRow {
            rank: i + 1,
            track: t.track_name,
            artist: t.first_artist_name.unwrap_or_default(),
            plays: t.play_count,
        })
        .collect())
}

async fn load_stats() -> Res<HistoryStats> {
    let settings = Settings::from_env()?;
    info!("Database: {}", settings.database_path.display());

    let store = open_store(&settings).await?;
    let stats = HistoryStats {
        total: store.track_count(None).await?,
        user_total: store.track_count(Some(&settings.user_id)).await?,
        latest: store
            .latest_played_at(&settings.user_id)
            .await?
            .map(|dt| utils::format_played_at(&dt)),
    };
    store.close().await;
    Ok(stats)
}

pub(crate) fn print_plays(plays: &[PlayRecord]) {
    let rows: Vec<PlayTableRow> = plays
        .iter()
        .map(|p| PlayTableRow {
            played_at: utils::format_played_at(&p.played_at),
            track: p.track_name.clone(),
            artist: p.first_artist_name.clone().unwrap_or_default(),
            album: p.album_name.clone().unwrap_or_default(),
        })
        .collect();

    println!("{}", Table::new(rows));
}
