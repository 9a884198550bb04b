use wta_players::api::serve;
use wta_players::cli::Cli;
use wta_players::config::Settings;
use wta_players::service::PlayerDataService;
use wta_players::storage::MemoryCache;
use wta_players::wta::client::LiveRanking;

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Fail fast on missing or invalid settings, before anything is served.
    let settings = Settings::new(Cli::parse())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(settings.get_trace_level()).into())
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        url = %settings.ranking_url,
        cache_timeout_minutes = settings.cache_timeout_minutes,
        "Initializing live ranking service."
    );
    let live_ranking = LiveRanking::new(&settings)?;
    let cache = MemoryCache::new(settings.cache_timeout());
    let service = PlayerDataService::new(cache, Arc::new(live_ranking));

    let listener = TcpListener::bind(&settings.bind_address).await?;
    serve(listener, service).await?;

    Ok(())
}
