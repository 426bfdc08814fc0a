//! Appointment routes.

use axum::extract::State;
use axum::Json;
use database::appointment::{self, AppointmentInput};
use database::{Appointment, AppointmentStatus};
use serde::Deserialize;

use super::viewing_records::ListQuery;
use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

/// Body for a status change.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// List appointments by time.
pub async fn list_appointments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>> {
    let appointments = appointment::list_appointments(state.db.pool(), query.customer_id).await?;
    Ok(ApiResponse::ok(appointments))
}

/// Schedule a viewing appointment.
pub async fn create_appointment(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> Result<Json<ApiResponse<Appointment>>> {
    let created = appointment::create_appointment(state.db.pool(), &input).await?;
    Ok(ApiResponse::ok(created))
}

/// Move an appointment to a new status.
pub async fn update_appointment_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<ApiResponse<Appointment>>> {
    let status = AppointmentStatus::parse(&update.status).ok_or_else(|| {
        AppError::BadRequest(format!("Unknown appointment status: {}", update.status))
    })?;

    let updated = appointment::update_appointment_status(state.db.pool(), id, status).await?;
    Ok(ApiResponse::ok(updated))
}

/// Delete an appointment.
pub async fn delete_appointment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    appointment::delete_appointment(state.db.pool(), id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })))
}
