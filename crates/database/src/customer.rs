//! Customer CRUD, filtered listing and stats.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::filter::{CustomerFilter, Pagination};
use crate::models::{Customer, CustomerStatus};
use crate::tags::encode_tag_array;
use crate::validation::{
    validate_length, validate_required, ValidationError, MAX_NAME_LENGTH, MAX_NOTES_LENGTH,
};

const CUSTOMER_COLUMNS: &str = "id, name, nickname, phone, backup_phone, status, community, \
    business_type, room_type, price_range, price_min, price_max, source_channel, creator, \
    is_agent, userId, botId, total_commission, viewing_count, notes, created_at, updated_at";

/// Editable customer fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInput {
    pub name: String,
    pub nickname: Option<String>,
    pub phone: String,
    pub backup_phone: Option<String>,
    /// Defaults to [`CustomerStatus::Following`].
    pub status: Option<i64>,
    pub community: Option<String>,
    pub business_type: Vec<String>,
    pub room_type: Vec<String>,
    pub price_range: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub source_channel: Option<String>,
    pub creator: Option<String>,
    pub is_agent: bool,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "botId")]
    pub bot_id: Option<String>,
    pub notes: Option<String>,
}

impl CustomerInput {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validate_required("name", &self.name, MAX_NAME_LENGTH)?;
        validate_required("phone", &self.phone, MAX_NAME_LENGTH)?;

        if let Some(status) = self.status {
            if CustomerStatus::from_code(status).is_none() {
                return Err(ValidationError::OutOfRange {
                    field: "status".to_string(),
                    value: status.to_string(),
                });
            }
        }

        if let (Some(min), Some(max)) = self.price_bounds() {
            if min > max {
                return Err(ValidationError::OutOfRange {
                    field: "price_range".to_string(),
                    value: format!("{}-{}", min, max),
                });
            }
        }

        if let Some(notes) = &self.notes {
            validate_length("notes", notes, MAX_NOTES_LENGTH)?;
        }

        Ok(())
    }

    /// Structured bounds, filled from `price_range` where not given.
    pub fn price_bounds(&self) -> (Option<f64>, Option<f64>) {
        let (legacy_min, legacy_max) = self
            .price_range
            .as_deref()
            .map(parse_price_range)
            .unwrap_or((None, None));
        (self.price_min.or(legacy_min), self.price_max.or(legacy_max))
    }

    fn status_code(&self) -> i64 {
        self.status.unwrap_or(CustomerStatus::Following.code())
    }
}

/// Split a legacy `"min-max"` budget. A single number is both bounds.
pub fn parse_price_range(raw: &str) -> (Option<f64>, Option<f64>) {
    let parse = |part: &str| part.trim().parse::<f64>().ok().filter(|v| v.is_finite());

    match raw.split_once('-') {
        Some((min, max)) => (parse(min), parse(max)),
        None => {
            let value = parse(raw);
            (value, value)
        }
    }
}

/// One page of customers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerPage {
    pub items: Vec<Customer>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Customer counts for one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: i64,
    pub label: &'static str,
    pub count: i64,
}

/// Aggregates over a filtered customer set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerStats {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub total_commission: f64,
    pub total_viewings: i64,
}

#[derive(FromRow)]
struct TotalsRow {
    total: i64,
    total_commission: Option<f64>,
    total_viewings: Option<i64>,
}

/// Create a customer and return the stored row.
pub async fn create_customer(pool: &SqlitePool, input: &CustomerInput) -> Result<Customer> {
    input.validate()?;
    let (price_min, price_max) = input.price_bounds();

    let result = sqlx::query(
        r#"
        INSERT INTO customers (
            name, nickname, phone, backup_phone, status, community, business_type, room_type,
            price_range, price_min, price_max, source_channel, creator, is_agent, userId, botId,
            notes
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.name.trim())
    .bind(&input.nickname)
    .bind(input.phone.trim())
    .bind(&input.backup_phone)
    .bind(input.status_code())
    .bind(&input.community)
    .bind(encode_tag_array(&input.business_type))
    .bind(encode_tag_array(&input.room_type))
    .bind(&input.price_range)
    .bind(price_min)
    .bind(price_max)
    .bind(&input.source_channel)
    .bind(&input.creator)
    .bind(input.is_agent)
    .bind(&input.user_id)
    .bind(&input.bot_id)
    .bind(&input.notes)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!(customer_id = id, "Customer created");

    get_customer(pool, id).await
}

/// Get a customer by ID.
pub async fn get_customer(pool: &SqlitePool, id: i64) -> Result<Customer> {
    let sql = format!("SELECT {} FROM customers WHERE id = ?", CUSTOMER_COLUMNS);
    sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Customer",
            id: id.to_string(),
        })
}

/// Replace the editable fields of a customer.
pub async fn update_customer(
    pool: &SqlitePool,
    id: i64,
    input: &CustomerInput,
) -> Result<Customer> {
    input.validate()?;
    let (price_min, price_max) = input.price_bounds();

    let result = sqlx::query(
        r#"
        UPDATE customers
        SET name = ?, nickname = ?, phone = ?, backup_phone = ?, status = ?, community = ?,
            business_type = ?, room_type = ?, price_range = ?, price_min = ?, price_max = ?,
            source_channel = ?, creator = ?, is_agent = ?, userId = ?, botId = ?, notes = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(input.name.trim())
    .bind(&input.nickname)
    .bind(input.phone.trim())
    .bind(&input.backup_phone)
    .bind(input.status_code())
    .bind(&input.community)
    .bind(encode_tag_array(&input.business_type))
    .bind(encode_tag_array(&input.room_type))
    .bind(&input.price_range)
    .bind(price_min)
    .bind(price_max)
    .bind(&input.source_channel)
    .bind(&input.creator)
    .bind(input.is_agent)
    .bind(&input.user_id)
    .bind(&input.bot_id)
    .bind(&input.notes)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Customer",
            id: id.to_string(),
        });
    }

    tracing::info!(customer_id = id, "Customer updated");
    get_customer(pool, id).await
}

/// Delete a customer. Viewing records and appointments cascade.
pub async fn delete_customer(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM customers
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Customer",
            id: id.to_string(),
        });
    }

    tracing::info!(customer_id = id, "Customer deleted");
    Ok(())
}

/// Count customers matching a filter.
pub async fn count_customers(pool: &SqlitePool, filter: &CustomerFilter) -> Result<i64> {
    let query = filter
        .compile()
        .into_query("SELECT COUNT(*) FROM customers", "");

    let count = sqlx::query_scalar_with::<_, i64, _>(&query.sql, query.arguments()?)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// List customers matching a filter, newest first.
pub async fn list_customers(
    pool: &SqlitePool,
    filter: &CustomerFilter,
    pagination: Pagination,
) -> Result<CustomerPage> {
    let total = count_customers(pool, filter).await?;

    let head = format!("SELECT {} FROM customers", CUSTOMER_COLUMNS);
    let query = filter
        .compile()
        .into_query(&head, "ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?")
        .bind(pagination.page_size)
        .bind(pagination.offset());

    let items = sqlx::query_as_with::<_, Customer, _>(&query.sql, query.arguments()?)
        .fetch_all(pool)
        .await?;

    tracing::debug!(total, returned = items.len(), "Listed customers");

    Ok(CustomerPage {
        items,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
    })
}

/// Totals and per-status counts for customers matching a filter.
pub async fn customer_stats(pool: &SqlitePool, filter: &CustomerFilter) -> Result<CustomerStats> {
    let totals_query = filter.compile().into_query(
        "SELECT COUNT(*) AS total, CAST(SUM(total_commission) AS REAL) AS total_commission, \
         SUM(viewing_count) AS total_viewings FROM customers",
        "",
    );
    let totals =
        sqlx::query_as_with::<_, TotalsRow, _>(&totals_query.sql, totals_query.arguments()?)
            .fetch_one(pool)
            .await?;

    let status_query = filter.compile().into_query(
        "SELECT status, COUNT(*) FROM customers",
        "GROUP BY status",
    );
    let counts =
        sqlx::query_as_with::<_, (i64, i64), _>(&status_query.sql, status_query.arguments()?)
            .fetch_all(pool)
            .await?;

    let by_status = CustomerStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status: status.code(),
            label: status.label(),
            count: counts
                .iter()
                .find(|(code, _)| *code == status.code())
                .map(|(_, count)| *count)
                .unwrap_or(0),
        })
        .collect();

    Ok(CustomerStats {
        total: totals.total,
        by_status,
        total_commission: totals.total_commission.unwrap_or(0.0),
        total_viewings: totals.total_viewings.unwrap_or(0),
    })
}
