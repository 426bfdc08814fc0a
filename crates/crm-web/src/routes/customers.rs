//! Customer routes.

use axum::extract::State;
use axum::Json;
use database::customer::{self, CustomerInput, CustomerStats};
use database::{Customer, CustomerFilter, Pagination, QueryParams};
use serde::Serialize;
use tracing::info;

use super::ApiResponse;
use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

/// Customer with its tag columns decoded.
#[derive(Debug, Serialize)]
pub struct CustomerView {
    #[serde(flatten)]
    pub customer: Customer,
    pub business_types: Vec<String>,
    pub room_types: Vec<String>,
    pub status_label: Option<&'static str>,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        Self {
            business_types: customer.business_types(),
            room_types: customer.room_types(),
            status_label: customer.status().map(|status| status.label()),
            customer,
        }
    }
}

/// One page of customers.
#[derive(Debug, Serialize)]
pub struct CustomerList {
    pub items: Vec<CustomerView>,
    pub total: i64,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
}

/// List customers matching the query-string filters.
pub async fn list_customers(
    State(state): State<AppState>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<CustomerList>>> {
    let params = QueryParams::from_pairs(pairs);
    let filter = CustomerFilter::from_params(&params)?;
    let pagination = Pagination::from_params(&params);

    let page = customer::list_customers(state.db.pool(), &filter, pagination).await?;

    Ok(ApiResponse::ok(CustomerList {
        items: page.items.into_iter().map(CustomerView::from).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Aggregates over customers matching the query-string filters.
pub async fn customer_stats(
    State(state): State<AppState>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<CustomerStats>>> {
    let params = QueryParams::from_pairs(pairs);
    let filter = CustomerFilter::from_params(&params)?;

    let stats = customer::customer_stats(state.db.pool(), &filter).await?;
    Ok(ApiResponse::ok(stats))
}

/// Create a customer.
pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> Result<Json<ApiResponse<CustomerView>>> {
    let created = customer::create_customer(state.db.pool(), &input).await?;
    info!(customer_id = created.id, creator = ?created.creator, "Customer added");
    Ok(ApiResponse::ok(created.into()))
}

/// Get one customer.
pub async fn get_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<CustomerView>>> {
    let found = customer::get_customer(state.db.pool(), id).await?;
    Ok(ApiResponse::ok(found.into()))
}

/// Replace a customer's editable fields.
pub async fn update_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> Result<Json<ApiResponse<CustomerView>>> {
    let updated = customer::update_customer(state.db.pool(), id, &input).await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Delete a customer with its viewings and appointments.
pub async fn delete_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    customer::delete_customer(state.db.pool(), id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })))
}
