//! Query-string filters compiled into parameterized SQL.
//!
//! Compilation is pure: it turns [`QueryParams`] into a [`WhereClause`]
//! (conditions plus positional parameters) and never touches the pool.
//! Callers execute the result through [`CompiledQuery::arguments`].

pub mod customer_filter;
pub mod params;
pub mod where_clause;

pub use customer_filter::{city_condition, city_params, CustomerFilter};
pub use params::{Pagination, ParamValue, QueryParams};
pub use where_clause::{count_placeholders, placeholders, CompiledQuery, SqlValue, WhereClause};
