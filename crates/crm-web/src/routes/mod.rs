//! Route handlers for the CRM API.

pub mod appointments;
pub mod customers;
pub mod health;
pub mod statistics;
pub mod viewing_records;

use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Success envelope: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Customers
        .route(
            "/api/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/api/customers/stats", get(customers::customer_stats))
        .route(
            "/api/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        // Viewing records
        .route(
            "/api/viewing-records",
            get(viewing_records::list_viewing_records).post(viewing_records::create_viewing_record),
        )
        .route(
            "/api/viewing-records/:id",
            get(viewing_records::get_viewing_record).delete(viewing_records::delete_viewing_record),
        )
        // Appointments
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id/status",
            put(appointments::update_appointment_status),
        )
        .route(
            "/api/appointments/:id",
            axum::routing::delete(appointments::delete_appointment),
        )
        // External consumers
        .route(
            "/api/external/statistics",
            get(statistics::external_statistics),
        )
}
