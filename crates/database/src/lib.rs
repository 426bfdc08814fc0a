//! SQLite persistence layer for the brokerage CRM.
//!
//! This crate owns the schema for customers, viewing records and
//! appointments, the compiler that turns loosely-typed query parameters
//! into parameterized SQL filters, and the statistics aggregates built on
//! top of it.
//!
//! # Example
//!
//! ```no_run
//! use database::{customer, CustomerFilter, Database, Pagination, QueryParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:crm.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // `status=1,4&city=["北京","上海"]`
//!     let params =
//!         QueryParams::from_pairs([("status", "1,4"), ("city", r#"["北京","上海"]"#)]);
//!     let filter = CustomerFilter::from_params(&params)?;
//!     let page = customer::list_customers(db.pool(), &filter, Pagination::default()).await?;
//!     println!("{} customers", page.total);
//!
//!     Ok(())
//! }
//! ```

pub mod appointment;
pub mod customer;
pub mod error;
pub mod filter;
pub mod models;
pub mod statistics;
pub mod tags;
pub mod validation;
pub mod viewing_record;

pub use error::{DatabaseError, Result};
pub use filter::{
    CompiledQuery, CustomerFilter, Pagination, ParamValue, QueryParams, SqlValue, WhereClause,
};
pub use models::{Appointment, AppointmentStatus, Customer, CustomerStatus, ViewingRecord};
pub use statistics::{Statistics, StatisticsQuery};
pub use tags::{decode_tag_array, encode_tag_array};
pub use validation::ValidationError;

// Re-exported so callers can name pool and error types.
pub use sqlx;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
///
/// Constructed once at startup and handed to whoever executes queries;
/// cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    pub const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/crm.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
