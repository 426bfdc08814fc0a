//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub database: String,
}

/// Health check endpoint. Reports `degraded` when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = match database::sqlx::query("SELECT 1")
        .execute(state.db.pool())
        .await
    {
        Ok(_) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "Database health check failed");
            "unreachable"
        }
    };

    Json(Health {
        status: if database == "ok" { "ok" } else { "degraded" }.to_string(),
        database: database.to_string(),
    })
}
