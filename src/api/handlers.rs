use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::query::{PlayerQuery, QueryOptions};
use crate::error::RankingError;
use crate::service::PlayerDataService;

/// Top players of the live ranking, shaped by the caller's query options.
/// An unreachable ranking page answers with an empty list.
pub async fn get_players(
    State(service): State<PlayerDataService>,
    options: Result<Query<QueryOptions>, QueryRejection>,
) -> Result<Json<Value>, RankingError> {
    // Reject malformed options before touching the cache or the upstream page.
    let Query(options) = options.map_err(|e| RankingError::Query(e.body_text()))?;
    let query = PlayerQuery::try_from(options)?;
    let ranking = service.players().await;
    debug!(players = ranking.len(), scraped_at = %ranking.timestamp, "Shaping ranking for response.");
    Ok(Json(query.apply(&ranking)))
}

impl IntoResponse for RankingError {
    fn into_response(self) -> Response {
        let status = match &self {
            RankingError::Query(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
