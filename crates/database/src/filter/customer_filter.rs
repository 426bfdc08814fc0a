//! Customer list filters.
//!
//! Compiles against an unaliased `customers` table so the city subquery can
//! correlate on `customers.id`.

use chrono::NaiveDate;

use super::params::QueryParams;
use super::where_clause::{SqlValue, WhereClause};
use crate::tags::tag_pattern;
use crate::validation::ValidationError;

/// Lower budget bound: the structured column, else the part of
/// `price_range` before the hyphen.
const PRICE_MIN_EXPR: &str =
    "COALESCE(price_min, CAST(SUBSTR(price_range, 1, INSTR(price_range, '-') - 1) AS REAL))";

/// Upper budget bound: the structured column, else the part of
/// `price_range` after the hyphen.
const PRICE_MAX_EXPR: &str =
    "COALESCE(price_max, CAST(SUBSTR(price_range, INSTR(price_range, '-') + 1) AS REAL))";

/// Parsed customer filters. Empty fields add no condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    /// Matches name, nickname, phone or backup phone.
    pub search_text: Option<String>,
    pub phone: Option<String>,
    pub statuses: Vec<i64>,
    pub source_channels: Vec<String>,
    /// Tags matched inside the JSON-encoded `business_type` column.
    pub business_types: Vec<String>,
    pub creators: Vec<String>,
    pub is_agent: Vec<bool>,
    pub community: Option<String>,
    /// Cities matched against the customer's viewing records.
    pub cities: Vec<String>,
    pub bot_id: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// Inclusive creation date bounds.
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl CustomerFilter {
    /// Read filters from query parameters.
    ///
    /// Malformed list elements are dropped. Malformed dates are an error.
    pub fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        Ok(Self {
            search_text: params.text_any(&["name", "searchText"]),
            phone: params.text("phone"),
            statuses: params.integers("status"),
            source_channels: params.list("source_channel"),
            business_types: params.list("business_type"),
            creators: params.list("creator"),
            is_agent: params.booleans("is_agent"),
            community: params.text("community"),
            cities: params.list("city"),
            bot_id: params.text("botId"),
            price_min: params.number("price_min"),
            price_max: params.number("price_max"),
            date_from: params.date("date_from")?,
            date_to: params.date("date_to")?,
        })
    }

    /// Compile into ANDed conditions over `customers`.
    pub fn compile(&self) -> WhereClause {
        let mut clause = WhereClause::new();

        if let Some(text) = &self.search_text {
            let pattern = contains_pattern(text);
            clause.push(
                "(name LIKE ? OR nickname LIKE ? OR phone LIKE ? OR backup_phone LIKE ?)",
                vec![SqlValue::Text(pattern); 4],
            );
        }

        if let Some(phone) = &self.phone {
            clause.push("phone LIKE ?", [SqlValue::Text(contains_pattern(phone))]);
        }

        clause.push_eq_or_in("status", to_values(&self.statuses));
        clause.push_eq_or_in("source_channel", to_values(&self.source_channels));
        clause.push_like_any(
            "business_type",
            self.business_types.iter().map(|tag| tag_pattern(tag)).collect(),
        );
        clause.push_eq_or_in("creator", to_values(&self.creators));
        clause.push_eq_or_in("is_agent", to_values(&self.is_agent));

        if let Some(community) = &self.community {
            clause.push("community LIKE ?", [SqlValue::Text(contains_pattern(community))]);
        }

        if let Some((condition, params)) = city_condition(&self.cities, "vr", "customers.id") {
            clause.push(condition, params);
        }

        if let Some(bot_id) = &self.bot_id {
            clause.push("botId = ?", [SqlValue::Text(bot_id.clone())]);
        }

        if let Some(min) = self.price_min {
            clause.push(format!("{} >= ?", PRICE_MIN_EXPR), [SqlValue::Real(min)]);
        }
        if let Some(max) = self.price_max {
            clause.push(format!("{} <= ?", PRICE_MAX_EXPR), [SqlValue::Real(max)]);
        }

        if let Some(from) = self.date_from {
            clause.push("DATE(created_at) >= ?", [SqlValue::Text(from.to_string())]);
        }
        if let Some(to) = self.date_to {
            clause.push("DATE(created_at) <= ?", [SqlValue::Text(to.to_string())]);
        }

        clause
    }
}

/// EXISTS subquery matching customers with a viewing in any of `cities`.
///
/// Stored city names are inconsistent ("北京", "北京市", "北京市朝阳区"), so
/// each city matches by containment, by its "市" form, or exactly. Three
/// parameters per city, in input order. Returns `None` for no cities.
pub fn city_condition(
    cities: &[String],
    alias: &str,
    customer_id: &str,
) -> Option<(String, Vec<SqlValue>)> {
    if cities.is_empty() {
        return None;
    }

    let single = format!(
        "({a}.cityName LIKE ? OR {a}.cityName LIKE ? OR {a}.cityName = ?)",
        a = alias
    );
    let body = if cities.len() == 1 {
        single
    } else {
        format!("({})", vec![single; cities.len()].join(" OR "))
    };

    let condition = format!(
        "EXISTS (SELECT 1 FROM viewing_records {a} WHERE {a}.customer_id = {id} AND {body})",
        a = alias,
        id = customer_id,
        body = body
    );
    let params = cities.iter().flat_map(|city| city_params(city)).collect();

    Some((condition, params))
}

/// `(%city%, city市, city)` for one city.
pub fn city_params(city: &str) -> [SqlValue; 3] {
    [
        SqlValue::Text(contains_pattern(city)),
        SqlValue::Text(format!("{}市", city)),
        SqlValue::Text(city.to_string()),
    ]
}

fn contains_pattern(text: &str) -> String {
    format!("%{}%", text)
}

fn to_values<T>(values: &[T]) -> Vec<SqlValue>
where
    T: Clone + Into<SqlValue>,
{
    values.iter().cloned().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::where_clause::count_placeholders;

    fn compile(pairs: &[(&str, &str)]) -> WhereClause {
        let params = QueryParams::from_pairs(pairs.iter().copied());
        CustomerFilter::from_params(&params).unwrap().compile()
    }

    fn text(value: &str) -> SqlValue {
        SqlValue::Text(value.to_string())
    }

    #[test]
    fn test_no_params_compiles_to_nothing() {
        let clause = compile(&[]);
        assert!(clause.is_empty());
        assert!(clause.params().is_empty());
        assert_eq!(clause.to_sql(), "");
    }

    #[test]
    fn test_search_text_binds_four_patterns() {
        let clause = compile(&[("searchText", " 王 ")]);
        assert_eq!(
            clause.to_sql(),
            "WHERE (name LIKE ? OR nickname LIKE ? OR phone LIKE ? OR backup_phone LIKE ?)"
        );
        assert_eq!(clause.params(), &vec![text("%王%"); 4][..]);
    }

    #[test]
    fn test_name_wins_over_search_text() {
        let clause = compile(&[("searchText", "a"), ("name", "b")]);
        assert_eq!(clause.params()[0], text("%b%"));
    }

    #[test]
    fn test_status_single_and_multi() {
        assert_eq!(compile(&[("status", "2")]).to_sql(), "WHERE status = ?");
        assert_eq!(compile(&[("status", "[2]")]).to_sql(), "WHERE status = ?");

        let clause = compile(&[("status", "1,abc,3")]);
        assert_eq!(clause.to_sql(), "WHERE status IN (?, ?)");
        assert_eq!(clause.params(), &[SqlValue::Integer(1), SqlValue::Integer(3)]);
    }

    #[test]
    fn test_status_encodings_are_equivalent() {
        // Same logical filter: every bound value is 1.
        for raw in ["1", "[1]", "1,1", "[\"1\"]"] {
            let clause = compile(&[("status", raw)]);
            assert!(!clause.is_empty(), "{raw}");
            assert!(clause.params().iter().all(|p| *p == SqlValue::Integer(1)), "{raw}");
        }
        let repeated = compile(&[("status", "1"), ("status", "1")]);
        assert!(repeated.params().iter().all(|p| *p == SqlValue::Integer(1)));
    }

    #[test]
    fn test_repeated_keys_match_single_value_encoding() {
        let repeated = compile(&[("status", "1,2"), ("status", "3")]);
        let single = compile(&[("status", "1,2,3")]);
        assert_eq!(repeated.to_sql(), "WHERE status IN (?, ?, ?)");
        assert_eq!(repeated.params(), single.params());

        let repeated = compile(&[("city", "北京,上海"), ("city", r#"["深圳"]"#)]);
        let single = compile(&[("city", "北京,上海,深圳")]);
        assert_eq!(repeated.to_sql(), single.to_sql());
        assert_eq!(repeated.params(), single.params());
        assert_eq!(repeated.params().len(), 9);
    }

    #[test]
    fn test_all_malformed_status_is_absent() {
        assert!(compile(&[("status", "abc,def")]).is_empty());
    }

    #[test]
    fn test_business_type_uses_or_of_like() {
        let clause = compile(&[("business_type", r#"["whole_rent","shared_rent"]"#)]);
        assert_eq!(
            clause.to_sql(),
            "WHERE (business_type LIKE ? OR business_type LIKE ?)"
        );
        assert_eq!(
            clause.params(),
            &[text("%\"whole_rent\"%"), text("%\"shared_rent\"%")]
        );

        let single = compile(&[("business_type", "whole_rent")]);
        assert_eq!(single.to_sql(), "WHERE business_type LIKE ?");
    }

    #[test]
    fn test_is_agent_binds_integers() {
        let clause = compile(&[("is_agent", "true,maybe,false")]);
        assert_eq!(clause.to_sql(), "WHERE is_agent IN (?, ?)");
        assert_eq!(clause.params(), &[SqlValue::Integer(1), SqlValue::Integer(0)]);

        assert!(compile(&[("is_agent", "maybe")]).is_empty());
    }

    #[test]
    fn test_single_city_tri_form() {
        let clause = compile(&[("city", "北京")]);
        assert_eq!(
            clause.to_sql(),
            "WHERE EXISTS (SELECT 1 FROM viewing_records vr WHERE vr.customer_id = customers.id \
             AND (vr.cityName LIKE ? OR vr.cityName LIKE ? OR vr.cityName = ?))"
        );
        assert_eq!(clause.params(), &[text("%北京%"), text("北京市"), text("北京")]);
    }

    #[test]
    fn test_multi_city_params_in_input_order() {
        let cities = ["上海", "北京", "深圳"];
        let clause = compile(&[("city", r#"["上海","北京","深圳"]"#)]);

        assert_eq!(clause.params().len(), 3 * cities.len());
        for (i, city) in cities.iter().enumerate() {
            assert_eq!(&clause.params()[i * 3..i * 3 + 3], &city_params(city)[..]);
        }
        assert_eq!(clause.conditions().len(), 1);
        assert_eq!(clause.conditions()[0].matches(" OR (").count(), cities.len() - 1);
        assert_eq!(count_placeholders(&clause.to_sql()), clause.params().len());
    }

    #[test]
    fn test_empty_city_list_equals_absent() {
        assert_eq!(compile(&[("city", "[]")]), compile(&[]));
        assert_eq!(compile(&[("city", " , ")]), compile(&[]));
    }

    #[test]
    fn test_price_bounds() {
        let clause = compile(&[("price_min", "3000"), ("price_max", "8000.5")]);
        assert_eq!(clause.conditions().len(), 2);
        assert!(clause.conditions()[0].ends_with(">= ?"));
        assert!(clause.conditions()[1].ends_with("<= ?"));
        assert_eq!(clause.params(), &[SqlValue::Real(3000.0), SqlValue::Real(8000.5)]);

        assert!(compile(&[("price_min", "cheap")]).is_empty());
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let params = QueryParams::from_pairs([("date_from", "not-a-date")]);
        let err = CustomerFilter::from_params(&params).unwrap_err();
        assert_eq!(err.code(), "INVALID_DATE_FORMAT");
    }

    #[test]
    fn test_placeholders_match_params_for_all_filters() {
        let all: &[(&str, &str)] = &[
            ("name", "李"),
            ("phone", "139"),
            ("status", "1,2"),
            ("source_channel", "58同城"),
            ("business_type", "whole_rent,shared_rent"),
            ("creator", "[\"小王\",\"小李\"]"),
            ("is_agent", "false"),
            ("community", "望京"),
            ("city", "北京,上海"),
            ("botId", "bot-7"),
            ("price_min", "1000"),
            ("price_max", "9000"),
            ("date_from", "2024-01-01"),
            ("date_to", "2024-12-31"),
        ];

        // Every prefix of the filter list.
        for n in 0..=all.len() {
            let clause = compile(&all[..n]);
            assert_eq!(
                count_placeholders(&clause.to_sql()),
                clause.params().len(),
                "mismatch with {} filters",
                n
            );
        }

        // Each filter on its own.
        for pair in all {
            let clause = compile(std::slice::from_ref(pair));
            assert_eq!(clause.conditions().len(), 1, "{:?}", pair);
            assert_eq!(count_placeholders(&clause.to_sql()), clause.params().len());
        }
    }

    #[test]
    fn test_param_order_follows_condition_order() {
        let clause = compile(&[
            ("price_max", "5000"),
            ("city", "杭州"),
            ("phone", "186"),
            ("status", "4"),
        ]);
        // Conditions are emitted in a fixed field order regardless of input order.
        assert_eq!(
            clause.params(),
            &[
                text("%186%"),
                SqlValue::Integer(4),
                text("%杭州%"),
                text("杭州市"),
                text("杭州"),
                SqlValue::Real(5000.0),
            ]
        );
    }
}
