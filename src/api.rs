pub mod handlers;
pub mod query;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::RankingResult;
use crate::service::PlayerDataService;

pub const PLAYERS_ROUTE: &str = "/api/WtaPlayers/GetPlayers";

pub fn router(service: PlayerDataService) -> Router {
    Router::new()
        .route(PLAYERS_ROUTE, get(handlers::get_players))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Starts the API server.
pub async fn serve(listener: TcpListener, service: PlayerDataService) -> RankingResult<()> {
    let addr = listener.local_addr()?;

    tracing::info!(address = ?addr, "Starting server");

    axum::serve(listener, router(service)).await?;

    Ok(())
}
