//! Parameterized WHERE clause assembly.
//!
//! Conditions only ever contain `?` placeholders. Each condition is pushed
//! together with its parameters, so the parameter list always follows the
//! left-to-right placeholder order of the joined SQL.

use sqlx::sqlite::SqliteArguments;
use sqlx::Arguments;

/// A value bound to one `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

/// ANDed conditions plus their positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<String>,
    params: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one condition and the parameters for its placeholders.
    pub fn push<I>(&mut self, condition: impl Into<String>, params: I)
    where
        I: IntoIterator<Item = SqlValue>,
    {
        let condition = condition.into();
        let start = self.params.len();
        self.params.extend(params);
        debug_assert_eq!(
            count_placeholders(&condition),
            self.params.len() - start,
            "placeholder mismatch in `{}`",
            condition
        );
        self.conditions.push(condition);
    }

    /// `column = ?` for one value, `column IN (?, …)` for several,
    /// nothing for none.
    pub fn push_eq_or_in(&mut self, column: &str, values: Vec<SqlValue>) {
        match values.len() {
            0 => {}
            1 => self.push(format!("{} = ?", column), values),
            n => self.push(format!("{} IN ({})", column, placeholders(n)), values),
        }
    }

    /// `column LIKE ?`, or the patterns ORed together in parentheses.
    pub fn push_like_any(&mut self, column: &str, patterns: Vec<String>) {
        let condition = match patterns.len() {
            0 => return,
            1 => format!("{} LIKE ?", column),
            n => format!(
                "({})",
                vec![format!("{} LIKE ?", column); n].join(" OR ")
            ),
        };
        self.push(condition, patterns.into_iter().map(SqlValue::Text));
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// `WHERE a AND b`, or an empty string when there are no conditions.
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Wrap the clause between a statement head and tail.
    pub fn into_query(self, head: &str, tail: &str) -> CompiledQuery {
        let sql = [head.trim(), self.to_sql().as_str(), tail.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        CompiledQuery {
            sql,
            params: self.params,
        }
    }
}

/// A complete statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl CompiledQuery {
    /// Append a parameter for a trailing placeholder (LIMIT, OFFSET).
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Convert the parameters into SQLite arguments.
    pub fn arguments<'q>(&self) -> Result<SqliteArguments<'q>, sqlx::Error> {
        let mut args = SqliteArguments::default();
        for param in &self.params {
            match param {
                SqlValue::Text(value) => args.add(value.clone()),
                SqlValue::Integer(value) => args.add(*value),
                SqlValue::Real(value) => args.add(*value),
            }
            .map_err(sqlx::Error::Encode)?;
        }
        Ok(args)
    }
}

/// `?, ?, ?` with `n` placeholders.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Number of `?` placeholders outside string literals.
pub fn count_placeholders(sql: &str) -> usize {
    let mut in_literal = false;
    let mut count = 0;
    for c in sql.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}
