//! Viewing record routes.

use axum::extract::State;
use axum::Json;
use database::viewing_record::{self, ViewingRecordInput};
use database::ViewingRecord;
use serde::Deserialize;

use super::ApiResponse;
use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

/// Optional customer scope for listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub customer_id: Option<i64>,
}

/// List viewing records, newest first.
pub async fn list_viewing_records(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ViewingRecord>>>> {
    let records = viewing_record::list_viewing_records(state.db.pool(), query.customer_id).await?;
    Ok(ApiResponse::ok(records))
}

/// Record a viewing.
pub async fn create_viewing_record(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ViewingRecordInput>,
) -> Result<Json<ApiResponse<ViewingRecord>>> {
    let record = viewing_record::create_viewing_record(state.db.pool(), &input).await?;
    Ok(ApiResponse::ok(record))
}

/// Get one viewing record.
pub async fn get_viewing_record(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ViewingRecord>>> {
    let record = viewing_record::get_viewing_record(state.db.pool(), id).await?;
    Ok(ApiResponse::ok(record))
}

/// Delete a viewing record.
pub async fn delete_viewing_record(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    viewing_record::delete_viewing_record(state.db.pool(), id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })))
}
