//! Appointment scheduling.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Appointment, AppointmentStatus};
use crate::validation::{
    parse_datetime, validate_length, validate_required, ValidationError, MAX_NOTES_LENGTH,
};

/// Maximum allowed length for property names and addresses.
pub const MAX_PROPERTY_LENGTH: usize = 200;

/// Fields accepted when scheduling a viewing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentInput {
    pub customer_id: i64,
    pub property_name: String,
    pub property_address: Option<String>,
    /// Any format accepted by [`parse_datetime`].
    pub appointment_time: String,
    pub notes: Option<String>,
}

impl AppointmentInput {
    /// Validate and return the normalized appointment time.
    pub fn validate(&self) -> std::result::Result<String, ValidationError> {
        validate_required("property_name", &self.property_name, MAX_PROPERTY_LENGTH)?;
        if let Some(address) = &self.property_address {
            validate_length("property_address", address, MAX_PROPERTY_LENGTH)?;
        }
        if let Some(notes) = &self.notes {
            validate_length("notes", notes, MAX_NOTES_LENGTH)?;
        }
        let time = parse_datetime("appointment_time", &self.appointment_time)?;
        Ok(time.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// Schedule a viewing for an existing customer.
pub async fn create_appointment(
    pool: &SqlitePool,
    input: &AppointmentInput,
) -> Result<Appointment> {
    let appointment_time = input.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO appointments (
            customer_id, property_name, property_address, appointment_time, status, notes
        )
        SELECT id, ?, ?, ?, ?, ?
        FROM customers
        WHERE id = ?
        "#,
    )
    .bind(input.property_name.trim())
    .bind(&input.property_address)
    .bind(&appointment_time)
    .bind(AppointmentStatus::Pending.as_str())
    .bind(&input.notes)
    .bind(input.customer_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Customer",
            id: input.customer_id.to_string(),
        });
    }

    let id = result.last_insert_rowid();
    tracing::info!(
        appointment_id = id,
        customer_id = input.customer_id,
        %appointment_time,
        "Appointment created"
    );

    get_appointment(pool, id).await
}

/// Get an appointment by ID.
pub async fn get_appointment(pool: &SqlitePool, id: i64) -> Result<Appointment> {
    sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, customer_id, property_name, property_address, appointment_time, status, notes,
               created_at, updated_at
        FROM appointments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Appointment",
        id: id.to_string(),
    })
}

/// List appointments by time, optionally for one customer.
pub async fn list_appointments(
    pool: &SqlitePool,
    customer_id: Option<i64>,
) -> Result<Vec<Appointment>> {
    let rows = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, customer_id, property_name, property_address, appointment_time, status, notes,
               created_at, updated_at
        FROM appointments
        WHERE (? IS NULL OR customer_id = ?)
        ORDER BY appointment_time ASC, id ASC
        "#,
    )
    .bind(customer_id)
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Move an appointment to a new status.
pub async fn update_appointment_status(
    pool: &SqlitePool,
    id: i64,
    status: AppointmentStatus,
) -> Result<Appointment> {
    let result = sqlx::query(
        r#"
        UPDATE appointments
        SET status = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Appointment",
            id: id.to_string(),
        });
    }

    tracing::info!(appointment_id = id, status = status.as_str(), "Appointment status updated");
    get_appointment(pool, id).await
}

/// Delete an appointment.
pub async fn delete_appointment(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Appointment",
            id: id.to_string(),
        });
    }

    Ok(())
}
