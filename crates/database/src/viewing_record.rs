//! Viewing record persistence.
//!
//! Each insert or delete refreshes the owning customer's `viewing_count`
//! and `total_commission` in the same transaction.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::ViewingRecord;
use crate::validation::{validate_length, ValidationError, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

const VIEWING_COLUMNS: &str = "id, customer_id, cityName, property_name, room_type, commission, \
    viewing_status, viewing_feedback, notes, userId, botId, created_at, updated_at";

/// Fields accepted when recording a viewing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewingRecordInput {
    pub customer_id: i64,
    #[serde(rename = "cityName")]
    pub city_name: Option<String>,
    pub property_name: Option<String>,
    pub room_type: Option<String>,
    pub commission: f64,
    /// Defaults to `pending`.
    pub viewing_status: Option<String>,
    pub viewing_feedback: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the customer's userId.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// Defaults to the customer's botId.
    #[serde(rename = "botId")]
    pub bot_id: Option<String>,
}

impl ViewingRecordInput {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if !self.commission.is_finite() || self.commission < 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "commission".to_string(),
                value: self.commission.to_string(),
            });
        }
        if let Some(city) = &self.city_name {
            validate_length("cityName", city, MAX_NAME_LENGTH)?;
        }
        if let Some(notes) = &self.notes {
            validate_length("notes", notes, MAX_NOTES_LENGTH)?;
        }
        Ok(())
    }
}

/// Record a viewing for an existing customer.
pub async fn create_viewing_record(
    pool: &SqlitePool,
    input: &ViewingRecordInput,
) -> Result<ViewingRecord> {
    input.validate()?;

    let mut tx = pool.begin().await?;

    let owner = sqlx::query_as::<_, (Option<String>, Option<String>)>(
        r#"
        SELECT userId, botId
        FROM customers
        WHERE id = ?
        "#,
    )
    .bind(input.customer_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Customer",
        id: input.customer_id.to_string(),
    })?;

    let user_id = input.user_id.clone().or(owner.0);
    let bot_id = input.bot_id.clone().or(owner.1);

    let result = sqlx::query(
        r#"
        INSERT INTO viewing_records (
            customer_id, cityName, property_name, room_type, commission,
            viewing_status, viewing_feedback, notes, userId, botId
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.customer_id)
    .bind(input.city_name.as_deref().map(str::trim))
    .bind(&input.property_name)
    .bind(&input.room_type)
    .bind(input.commission)
    .bind(input.viewing_status.as_deref().unwrap_or("pending"))
    .bind(&input.viewing_feedback)
    .bind(&input.notes)
    .bind(user_id)
    .bind(bot_id)
    .execute(&mut *tx)
    .await?;

    refresh_customer_totals(&mut *tx, input.customer_id).await?;
    tx.commit().await?;

    let id = result.last_insert_rowid();
    tracing::info!(
        viewing_record_id = id,
        customer_id = input.customer_id,
        "Viewing record created"
    );

    get_viewing_record(pool, id).await
}

/// Get a viewing record by ID.
pub async fn get_viewing_record(pool: &SqlitePool, id: i64) -> Result<ViewingRecord> {
    let sql = format!("SELECT {} FROM viewing_records WHERE id = ?", VIEWING_COLUMNS);
    sqlx::query_as::<_, ViewingRecord>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "ViewingRecord",
            id: id.to_string(),
        })
}

/// List viewing records, newest first, optionally for one customer.
pub async fn list_viewing_records(
    pool: &SqlitePool,
    customer_id: Option<i64>,
) -> Result<Vec<ViewingRecord>> {
    let sql = format!(
        "SELECT {} FROM viewing_records WHERE (? IS NULL OR customer_id = ?) \
         ORDER BY created_at DESC, id DESC",
        VIEWING_COLUMNS
    );
    let rows = sqlx::query_as::<_, ViewingRecord>(&sql)
        .bind(customer_id)
        .bind(customer_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Delete a viewing record.
pub async fn delete_viewing_record(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    let customer_id = sqlx::query_scalar::<_, i64>(
        r#"
        DELETE FROM viewing_records
        WHERE id = ?
        RETURNING customer_id
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "ViewingRecord",
        id: id.to_string(),
    })?;

    refresh_customer_totals(&mut *tx, customer_id).await?;
    tx.commit().await?;

    tracing::info!(viewing_record_id = id, customer_id, "Viewing record deleted");
    Ok(())
}

/// Recompute a customer's viewing count and commission total.
async fn refresh_customer_totals(conn: &mut SqliteConnection, customer_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE customers
        SET viewing_count = (
                SELECT COUNT(*) FROM viewing_records WHERE customer_id = ?
            ),
            total_commission = (
                SELECT COALESCE(SUM(commission), 0) FROM viewing_records WHERE customer_id = ?
            ),
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(customer_id)
    .bind(customer_id)
    .bind(customer_id)
    .execute(conn)
    .await?;

    Ok(())
}
