//! Viewing and deal statistics for external consumers.
//!
//! Two aggregates are computed and merged:
//! - viewings and commission, optionally limited to a date range;
//! - customers in the two completed statuses, never date-limited since
//!   status is current state.
//!
//! Both are optionally limited to customers matching `userId IN (...)`
//! and `botId IN (...)`. When both lists are given the customer must
//! match both.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::filter::{placeholders, CompiledQuery, QueryParams, SqlValue, WhereClause};
use crate::models::CustomerStatus;
use crate::validation::ValidationError;
use crate::Result;

/// Scope of a statistics request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub user_ids: Vec<String>,
    pub bot_ids: Vec<String>,
}

impl StatisticsQuery {
    /// Read `date_from`, `date_to`, `userId` and `botId`.
    ///
    /// Fails on a malformed date so no query runs with a widened range.
    pub fn from_params(params: &QueryParams) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            date_from: params.date("date_from")?,
            date_to: params.date("date_to")?,
            user_ids: params.ids("userId"),
            bot_ids: params.ids("botId"),
        })
    }

    pub fn has_user_filter(&self) -> bool {
        !self.user_ids.is_empty()
    }

    pub fn has_bot_filter(&self) -> bool {
        !self.bot_ids.is_empty()
    }

    pub fn has_customer_filter(&self) -> bool {
        self.has_user_filter() || self.has_bot_filter()
    }

    /// Viewing count and commission sum.
    pub fn viewing_query(&self) -> CompiledQuery {
        let mut clause = WhereClause::new();

        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => clause.push(
                "DATE(vr.created_at) BETWEEN ? AND ?",
                [date_value(from), date_value(to)],
            ),
            (Some(from), None) => clause.push("DATE(vr.created_at) >= ?", [date_value(from)]),
            (None, Some(to)) => clause.push("DATE(vr.created_at) <= ?", [date_value(to)]),
            (None, None) => {}
        }

        let head = if self.has_customer_filter() {
            self.push_customer_conditions(&mut clause);
            "SELECT COUNT(*) AS viewing_count, \
             CAST(SUM(vr.commission) AS REAL) AS total_commission \
             FROM viewing_records vr INNER JOIN customers c ON c.id = vr.customer_id"
        } else {
            "SELECT COUNT(*) AS viewing_count, \
             CAST(SUM(vr.commission) AS REAL) AS total_commission \
             FROM viewing_records vr"
        };

        clause.into_query(head, "")
    }

    /// Counts of customers in the two completed statuses.
    pub fn status_query(&self) -> CompiledQuery {
        let mut clause = WhereClause::new();
        self.push_customer_conditions(&mut clause);

        let head = format!(
            "SELECT \
             SUM(CASE WHEN c.status = {unpaid} THEN 1 ELSE 0 END) AS completed_unpaid_count, \
             SUM(CASE WHEN c.status = {paid} THEN 1 ELSE 0 END) AS completed_paid_count \
             FROM customers c",
            unpaid = CustomerStatus::CompletedUnpaid.code(),
            paid = CustomerStatus::CompletedPaid.code(),
        );

        clause.into_query(&head, "")
    }

    fn push_customer_conditions(&self, clause: &mut WhereClause) {
        if self.has_user_filter() {
            clause.push(
                format!("c.userId IN ({})", placeholders(self.user_ids.len())),
                self.user_ids.iter().cloned().map(SqlValue::Text),
            );
        }
        if self.has_bot_filter() {
            clause.push(
                format!("c.botId IN ({})", placeholders(self.bot_ids.len())),
                self.bot_ids.iter().cloned().map(SqlValue::Text),
            );
        }
    }

    fn period(&self) -> Period {
        Period {
            date_from: self.date_from.map(|date| date.to_string()),
            date_to: self.date_to.map(|date| date.to_string()),
        }
    }

    fn applied_filters(&self) -> Option<AppliedFilters> {
        self.has_customer_filter().then(|| AppliedFilters {
            user_ids: self.user_ids.clone(),
            bot_ids: self.bot_ids.clone(),
        })
    }
}

/// Raw viewing aggregate row.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct ViewingAggregate {
    pub viewing_count: Option<i64>,
    pub total_commission: Option<f64>,
}

/// Raw status aggregate row. Both sums are NULL on an empty table.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct StatusAggregate {
    pub completed_unpaid_count: Option<i64>,
    pub completed_paid_count: Option<i64>,
}

/// Merged statistics response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub viewing_count: i64,
    pub completed_unpaid_count: i64,
    pub completed_paid_count: i64,
    pub total_commission: f64,
    pub period: Period,
    /// Present only when a userId or botId filter was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<AppliedFilters>,
}

/// Echo of the requested date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

/// Echo of the customer filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilters {
    #[serde(rename = "userIds")]
    pub user_ids: Vec<String>,
    #[serde(rename = "botIds")]
    pub bot_ids: Vec<String>,
}

/// Combine both aggregates. NULL sums become zero.
pub fn merge(
    query: &StatisticsQuery,
    viewing: ViewingAggregate,
    status: StatusAggregate,
) -> Statistics {
    Statistics {
        viewing_count: viewing.viewing_count.unwrap_or(0),
        completed_unpaid_count: status.completed_unpaid_count.unwrap_or(0),
        completed_paid_count: status.completed_paid_count.unwrap_or(0),
        total_commission: viewing
            .total_commission
            .filter(|value| value.is_finite())
            .unwrap_or(0.0),
        period: query.period(),
        filters: query.applied_filters(),
    }
}

/// Run both aggregates and merge them.
pub async fn fetch_statistics(pool: &SqlitePool, query: &StatisticsQuery) -> Result<Statistics> {
    let viewing_query = query.viewing_query();
    let viewing = sqlx::query_as_with::<_, ViewingAggregate, _>(
        &viewing_query.sql,
        viewing_query.arguments()?,
    )
    .fetch_one(pool)
    .await?;

    let status_query = query.status_query();
    let status = sqlx::query_as_with::<_, StatusAggregate, _>(
        &status_query.sql,
        status_query.arguments()?,
    )
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        has_customer_filter = query.has_customer_filter(),
        viewing_count = ?viewing.viewing_count,
        "Statistics aggregated"
    );

    Ok(merge(query, viewing, status))
}

fn date_value(date: NaiveDate) -> SqlValue {
    SqlValue::Text(date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{self, CustomerInput};
    use crate::filter::count_placeholders;
    use crate::viewing_record::{self, ViewingRecordInput};
    use crate::Database;

    fn query(pairs: &[(&str, &str)]) -> StatisticsQuery {
        StatisticsQuery::from_params(&QueryParams::from_pairs(pairs.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_params() {
        let q = query(&[]);
        assert!(!q.has_customer_filter());

        let viewing = q.viewing_query();
        assert!(!viewing.sql.contains("WHERE"));
        assert!(!viewing.sql.contains("JOIN"));
        assert!(viewing.params.is_empty());

        let status = q.status_query();
        assert!(!status.sql.contains("WHERE"));
        assert!(status.params.is_empty());

        let stats = merge(&q, ViewingAggregate::default(), StatusAggregate::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["period"], serde_json::json!({}));
        assert!(json.get("filters").is_none());
    }

    #[test]
    fn test_user_and_bot_filters_intersect() {
        let q = query(&[("userId", "123,456"), ("botId", "bot1,bot2")]);
        assert!(q.has_user_filter() && q.has_bot_filter() && q.has_customer_filter());

        for compiled in [q.viewing_query(), q.status_query()] {
            assert!(
                compiled.sql.contains("c.userId IN (?, ?) AND c.botId IN (?, ?)"),
                "{}",
                compiled.sql
            );
            assert_eq!(
                compiled.params,
                vec![
                    SqlValue::from("123"),
                    SqlValue::from("456"),
                    SqlValue::from("bot1"),
                    SqlValue::from("bot2"),
                ]
            );
            assert_eq!(count_placeholders(&compiled.sql), compiled.params.len());
        }
        assert!(q.viewing_query().sql.contains("INNER JOIN customers c"));

        let stats = merge(&q, ViewingAggregate::default(), StatusAggregate::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json["filters"],
            serde_json::json!({"userIds": ["123", "456"], "botIds": ["bot1", "bot2"]})
        );
    }

    #[test]
    fn test_bot_filter_only_keeps_empty_user_ids() {
        let q = query(&[("botId", "bot1")]);
        let stats = merge(&q, ViewingAggregate::default(), StatusAggregate::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["filters"], serde_json::json!({"userIds": [], "botIds": ["bot1"]}));
        assert!(!q.status_query().sql.contains("userId"));
    }

    #[test]
    fn test_date_range_scopes_viewings_only() {
        let q = query(&[("date_from", "2024-01-01"), ("date_to", "2024-01-31"), ("userId", "u1")]);

        let viewing = q.viewing_query();
        assert!(viewing.sql.contains("DATE(vr.created_at) BETWEEN ? AND ? AND c.userId IN (?)"));
        assert_eq!(
            viewing.params,
            vec![
                SqlValue::from("2024-01-01"),
                SqlValue::from("2024-01-31"),
                SqlValue::from("u1"),
            ]
        );

        let status = q.status_query();
        assert!(!status.sql.contains("created_at"));
        assert_eq!(status.params, vec![SqlValue::from("u1")]);
    }

    #[test]
    fn test_single_date_bound() {
        let q = query(&[("date_to", "2024-06-30")]);
        assert!(q.viewing_query().sql.ends_with("WHERE DATE(vr.created_at) <= ?"));

        let stats = merge(&q, ViewingAggregate::default(), StatusAggregate::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["period"], serde_json::json!({"date_to": "2024-06-30"}));
    }

    #[test]
    fn test_invalid_dates_rejected() {
        for (key, value) in [("date_from", "2024-02-31"), ("date_to", "soon")] {
            let params = QueryParams::from_pairs([(key, value)]);
            let err = StatisticsQuery::from_params(&params).unwrap_err();
            assert_eq!(err.code(), "INVALID_DATE_FORMAT");
            assert_eq!(err.field(), key);
        }
    }

    #[test]
    fn test_merge_null_commission_is_zero() {
        let stats = merge(
            &StatisticsQuery::default(),
            ViewingAggregate {
                viewing_count: Some(0),
                total_commission: None,
            },
            StatusAggregate::default(),
        );
        assert_eq!(stats.total_commission, 0.0);
        assert_eq!(stats.completed_paid_count, 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_commission"], serde_json::json!(0.0));
    }

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn customer_input(name: &str, status: i64, user_id: &str, bot_id: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            phone: "13800000000".to_string(),
            status: Some(status),
            user_id: Some(user_id.to_string()),
            bot_id: Some(bot_id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_statistics_empty_database() {
        let db = test_db().await;
        let stats = fetch_statistics(db.pool(), &StatisticsQuery::default()).await.unwrap();
        assert_eq!(stats.viewing_count, 0);
        assert_eq!(stats.completed_unpaid_count, 0);
        assert_eq!(stats.completed_paid_count, 0);
        assert_eq!(stats.total_commission, 0.0);
        assert!(stats.filters.is_none());
    }

    #[tokio::test]
    async fn test_fetch_statistics_with_filters() {
        let db = test_db().await;
        let pool = db.pool();

        let a = customer::create_customer(pool, &customer_input("甲", 4, "123", "bot1"))
            .await
            .unwrap();
        let b = customer::create_customer(pool, &customer_input("乙", 5, "123", "bot2"))
            .await
            .unwrap();
        let c = customer::create_customer(pool, &customer_input("丙", 5, "999", "bot1"))
            .await
            .unwrap();

        for (customer_id, commission) in [(a.id, 1000.0), (b.id, 2500.5), (c.id, 700.0)] {
            let input = ViewingRecordInput {
                customer_id,
                city_name: Some("北京市".to_string()),
                commission,
                ..Default::default()
            };
            viewing_record::create_viewing_record(pool, &input).await.unwrap();
        }

        let all = fetch_statistics(pool, &StatisticsQuery::default()).await.unwrap();
        assert_eq!(all.viewing_count, 3);
        assert_eq!(all.completed_unpaid_count, 1);
        assert_eq!(all.completed_paid_count, 2);
        assert!((all.total_commission - 4200.5).abs() < 1e-6);

        let scoped = fetch_statistics(pool, &query(&[("userId", "123"), ("botId", "bot1,bot2")]))
            .await
            .unwrap();
        assert_eq!(scoped.viewing_count, 2);
        assert_eq!(scoped.completed_unpaid_count, 1);
        assert_eq!(scoped.completed_paid_count, 1);
        assert!((scoped.total_commission - 3500.5).abs() < 1e-6);

        // Intersection, not union: user 999 only has bot1.
        let narrow = fetch_statistics(pool, &query(&[("userId", "999"), ("botId", "bot2")]))
            .await
            .unwrap();
        assert_eq!(narrow.viewing_count, 0);
        assert_eq!(narrow.total_commission, 0.0);
        assert_eq!(narrow.completed_paid_count, 0);

        // Viewings were created today, so a past range excludes all of them.
        let past = fetch_statistics(
            pool,
            &query(&[("date_from", "2000-01-01"), ("date_to", "2000-12-31")]),
        )
        .await
        .unwrap();
        assert_eq!(past.viewing_count, 0);
        assert_eq!(past.completed_paid_count, 2);
    }
}
