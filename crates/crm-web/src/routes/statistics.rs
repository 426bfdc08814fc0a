//! Statistics endpoint for external consumers.

use axum::extract::State;
use axum::Json;
use database::statistics::{self, Statistics};
use database::{QueryParams, StatisticsQuery};
use tracing::info;

use super::ApiResponse;
use crate::error::Result;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Viewing, deal and commission totals.
///
/// Dates are checked before anything touches the database, so a malformed
/// `date_from` never runs as an unbounded query.
pub async fn external_statistics(
    State(state): State<AppState>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Statistics>>> {
    let params = QueryParams::from_pairs(pairs);
    let query = StatisticsQuery::from_params(&params)?;

    info!(
        date_from = ?query.date_from,
        date_to = ?query.date_to,
        user_ids = query.user_ids.len(),
        bot_ids = query.bot_ids.len(),
        "Fetching statistics"
    );

    let stats = statistics::fetch_statistics(state.db.pool(), &query).await?;
    Ok(ApiResponse::ok(stats))
}
