//! Query-string parameter normalization.
//!
//! HTTP callers send the same logical filter in several shapes:
//! `status=1`, `status=1,3`, `status=[1,3]` or `status=1&status=3`.
//! [`QueryParams`] records each key as a [`ParamValue`] once, and the typed
//! accessors below are the only place that looks at the raw shape.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::validation::{parse_date, ValidationError};

/// Raw value of one query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// The key appeared once.
    Scalar(String),
    /// The key was repeated.
    List(Vec<String>),
}

impl ParamValue {
    /// Elements of a scalar-or-list parameter.
    ///
    /// Each raw value is parsed as a JSON array first and as a
    /// comma-separated list otherwise, and a repeated key concatenates the
    /// results in order. Elements are trimmed and blanks dropped.
    pub fn elements(&self) -> Vec<String> {
        match self {
            ParamValue::Scalar(raw) => split_scalar(raw),
            ParamValue::List(items) => items.iter().flat_map(|item| split_scalar(item)).collect(),
        }
    }

    /// First non-blank raw value, trimmed.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(raw) => Some(raw.trim()).filter(|raw| !raw.is_empty()),
            ParamValue::List(items) => items
                .iter()
                .map(|item| item.trim())
                .find(|item| !item.is_empty()),
        }
    }
}

/// Query parameters keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `(key, value)` pairs in query-string order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    /// Add a value. A repeated key turns the entry into a list.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.values.entry(key.into()) {
            Entry::Vacant(entry) => {
                entry.insert(ParamValue::Scalar(value));
            }
            Entry::Occupied(mut entry) => {
                let previous = std::mem::replace(entry.get_mut(), ParamValue::List(Vec::new()));
                let items = match previous {
                    ParamValue::Scalar(first) => vec![first, value],
                    ParamValue::List(mut items) => {
                        items.push(value);
                        items
                    }
                };
                *entry.get_mut() = ParamValue::List(items);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Free-text parameter, trimmed. Blank is absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)?.first_text().map(str::to_string)
    }

    /// First present free-text parameter among aliases.
    pub fn text_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }

    /// Scalar-or-list parameter as strings.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(ParamValue::elements).unwrap_or_default()
    }

    /// Scalar-or-list parameter as integers. Elements without a leading
    /// integer are dropped.
    pub fn integers(&self, key: &str) -> Vec<i64> {
        self.list(key)
            .iter()
            .filter_map(|item| parse_int_prefix(item))
            .collect()
    }

    /// Scalar-or-list parameter as booleans. Only `true` and `false` count.
    pub fn booleans(&self, key: &str) -> Vec<bool> {
        self.list(key)
            .iter()
            .filter_map(|item| match item.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            })
            .collect()
    }

    /// Float parameter. Unparseable or non-finite values are absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.text(key)?
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }

    /// Integer parameter used for paging and ids.
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.text(key).as_deref().and_then(parse_int_prefix)
    }

    /// Date parameter. Blank is absent; anything else must parse.
    pub fn date(&self, key: &str) -> Result<Option<NaiveDate>, ValidationError> {
        self.text(key).map(|raw| parse_date(key, &raw)).transpose()
    }

    /// Batch id parameter: comma-separated, exact values, no JSON form.
    pub fn ids(&self, key: &str) -> Vec<String> {
        let Some(value) = self.get(key) else {
            return Vec::new();
        };
        let raw: Vec<&str> = match value {
            ParamValue::Scalar(raw) => vec![raw.as_str()],
            ParamValue::List(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .flat_map(|item| item.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Page selection for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: i64 = 20;
    pub const MAX_PAGE_SIZE: i64 = 100;

    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// Read `page` and `pageSize` (or `page_size`).
    pub fn from_params(params: &QueryParams) -> Self {
        let page = params.integer("page").unwrap_or(1);
        let page_size = params
            .integer("pageSize")
            .or_else(|| params.integer("page_size"))
            .unwrap_or(Self::DEFAULT_PAGE_SIZE);
        Self::new(page, page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

fn split_scalar(raw: &str) -> Vec<String> {
    let raw = raw.trim();

    if raw.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(raw) {
            return items.into_iter().filter_map(json_element).collect();
        }
    }

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn json_element(value: Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Leading-integer parse: `"3"`, `" 3 "`, `"3abc"` and `"3.7"` give 3.
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let digits_start = usize::from(raw.starts_with(['+', '-']));
    let digits_len = raw[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    if digits_len == 0 {
        return None;
    }
    raw[..digits_start + digits_len].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_repeated_keys_become_list() {
        let p = params(&[
            ("status", "1"),
            ("status", "2"),
            ("status", "3"),
            ("city", "北京"),
        ]);
        assert_eq!(
            p.get("status"),
            Some(&ParamValue::List(vec!["1".into(), "2".into(), "3".into()]))
        );
        assert_eq!(p.get("city"), Some(&ParamValue::Scalar("北京".into())));
    }

    #[test]
    fn test_list_encodings() {
        assert_eq!(
            params(&[("city", r#"["北京","上海"]"#)]).list("city"),
            vec!["北京", "上海"]
        );
        assert_eq!(
            params(&[("city", "北京, 上海 ,")]).list("city"),
            vec!["北京", "上海"]
        );
        assert_eq!(params(&[("city", " 北京 ")]).list("city"), vec!["北京"]);
        assert_eq!(
            params(&[("city", "a"), ("city", " "), ("city", "b")]).list("city"),
            vec!["a", "b"]
        );
        assert!(params(&[("city", "[]")]).list("city").is_empty());
        assert!(params(&[("city", "")]).list("city").is_empty());
        assert!(params(&[]).list("city").is_empty());
    }

    #[test]
    fn test_repeated_keys_split_each_value() {
        let mixed = params(&[("status", "1,2"), ("status", "3")]);
        assert_eq!(mixed.integers("status"), vec![1, 2, 3]);
        assert_eq!(
            mixed.integers("status"),
            params(&[("status", "1,2,3")]).integers("status")
        );

        let cities = params(&[("city", "北京,上海"), ("city", r#"["深圳"]"#)]);
        assert_eq!(cities.list("city"), vec!["北京", "上海", "深圳"]);
    }

    #[test]
    fn test_json_array_with_numbers_and_blanks() {
        let p = params(&[("status", r#"[1, "2", " ", null]"#)]);
        assert_eq!(p.list("status"), vec!["1", "2"]);
    }

    #[test]
    fn test_integers_drop_malformed_elements() {
        assert_eq!(
            params(&[("status", "1,abc,3")]).integers("status"),
            vec![1, 3]
        );
        assert_eq!(
            params(&[("status", "[\"4\",\"x\"]")]).integers("status"),
            vec![4]
        );
        assert_eq!(params(&[("status", "2abc")]).integers("status"), vec![2]);
        assert!(params(&[("status", "abc")]).integers("status").is_empty());
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("-7"), Some(-7));
        assert_eq!(parse_int_prefix("3.9"), Some(3));
        assert_eq!(parse_int_prefix("+"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("x1"), None);
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            params(&[("is_agent", "true,false,yes")]).booleans("is_agent"),
            vec![true, false]
        );
        assert_eq!(params(&[("is_agent", "[true]")]).booleans("is_agent"), vec![true]);
        assert!(params(&[("is_agent", "1")]).booleans("is_agent").is_empty());
    }

    #[test]
    fn test_text_and_aliases() {
        let p = params(&[("searchText", "  张 "), ("phone", "   ")]);
        assert_eq!(p.text("searchText"), Some("张".to_string()));
        assert_eq!(p.text("phone"), None);
        assert_eq!(p.text_any(&["name", "searchText"]), Some("张".to_string()));
    }

    #[test]
    fn test_number() {
        assert_eq!(
            params(&[("price_min", "3000.5")]).number("price_min"),
            Some(3000.5)
        );
        assert_eq!(params(&[("price_min", "abc")]).number("price_min"), None);
        assert_eq!(params(&[("price_min", "NaN")]).number("price_min"), None);
        assert_eq!(params(&[]).number("price_min"), None);
    }

    #[test]
    fn test_date() {
        let p = params(&[("date_from", "2024-01-31"), ("date_to", ""), ("bad", "2024-99-01")]);
        assert_eq!(
            p.date("date_from").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        assert_eq!(p.date("date_to").unwrap(), None);
        assert_eq!(p.date("missing").unwrap(), None);
        assert_eq!(p.date("bad").unwrap_err().code(), "INVALID_DATE_FORMAT");
    }

    #[test]
    fn test_ids() {
        let p = params(&[
            ("userId", " 123, ,456 "),
            ("botId", "bot1"),
            ("botId", "bot2,bot3"),
        ]);
        assert_eq!(p.ids("userId"), vec!["123", "456"]);
        assert_eq!(p.ids("botId"), vec!["bot1", "bot2", "bot3"]);
        assert!(p.ids("missing").is_empty());
    }

    #[test]
    fn test_pagination() {
        assert_eq!(Pagination::from_params(&params(&[])), Pagination::new(1, 20));

        let p = Pagination::from_params(&params(&[("page", "3"), ("pageSize", "10")]));
        assert_eq!(p.offset(), 20);

        let p = Pagination::from_params(&params(&[("page", "0"), ("page_size", "1000")]));
        assert_eq!(p, Pagination::new(1, 100));

        let p = Pagination::from_params(&params(&[("page", "abc")]));
        assert_eq!(p.page, 1);
    }
}
