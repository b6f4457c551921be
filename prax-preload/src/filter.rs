//! Filter types for WHERE clauses and relation scopes.
//!
//! A [`Filter`] renders to SQL with `$n` placeholders and can also be
//! evaluated directly against a [`Row`], which is how the in-memory engine
//! applies key filters and scope predicates.
//!
//! ```rust
//! use prax_preload::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::In("author_id".into(), vec![1.into(), 2.into()]),
//!     Filter::Equals("published".into(), FilterValue::Bool(true)),
//! ]);
//!
//! let (sql, params) = filter.to_sql(0);
//! assert_eq!(sql, "(author_id IN ($1, $2) AND published = $3)");
//! assert_eq!(params.len(), 3);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::record::Row;

/// A filter value that can be used in comparisons and stored in rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<FilterValue>),
}

/// Hashable identity of a non-null [`FilterValue`], used to group rows by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    /// Boolean key.
    Bool(bool),
    /// Integer key.
    Int(i64),
    /// Float key, by bit pattern.
    Float(u64),
    /// String key.
    String(String),
    /// JSON or list key, by its serialized form.
    Other(String),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Hashable key for this value; `None` for null.
    pub fn key(&self) -> Option<ValueKey> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(ValueKey::Bool(*b)),
            Self::Int(i) => Some(ValueKey::Int(*i)),
            Self::Float(f) => Some(ValueKey::Float(f.to_bits())),
            Self::String(s) => Some(ValueKey::String(s.clone())),
            Self::Json(v) => Some(ValueKey::Other(v.to_string())),
            Self::List(_) => serde_json::to_string(self).ok().map(ValueKey::Other),
        }
    }

    /// Compare two values the way SQL would. Integers and floats compare
    /// numerically; values of unrelated types are not comparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// SQL equality: null equals nothing.
    fn sql_eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        match self.compare(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => self == other,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A complete filter that can be converted to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, FilterValue),
    /// Not equals comparison.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(String, Vec<FilterValue>),

    /// Contains (LIKE %value%).
    Contains(String, FilterValue),
    /// Starts with (LIKE value%).
    StartsWith(String, FilterValue),
    /// Ends with (LIKE %value).
    EndsWith(String, FilterValue),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an equality filter.
    pub fn equals(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    /// Create an IN filter.
    pub fn in_list(
        column: impl Into<String>,
        values: impl IntoIterator<Item = FilterValue>,
    ) -> Self {
        Self::In(column.into(), values.into_iter().collect())
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Generate SQL for this filter with parameter placeholders.
    /// Returns (sql, params) where params are the values to bind, numbered
    /// from `param_offset + 1`.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let sql = self.to_sql_with_params(param_offset, &mut params);
        (sql, params)
    }

    fn to_sql_with_params(&self, offset: usize, params: &mut Vec<FilterValue>) -> String {
        match self {
            Self::None => "TRUE".to_string(),

            Self::Equals(col, val) => {
                if val.is_null() {
                    format!("{} IS NULL", col)
                } else {
                    format!("{} = {}", col, push_param(offset, params, val.clone()))
                }
            }
            Self::NotEquals(col, val) => {
                if val.is_null() {
                    format!("{} IS NOT NULL", col)
                } else {
                    format!("{} != {}", col, push_param(offset, params, val.clone()))
                }
            }

            Self::Lt(col, val) => format!("{} < {}", col, push_param(offset, params, val.clone())),
            Self::Lte(col, val) => {
                format!("{} <= {}", col, push_param(offset, params, val.clone()))
            }
            Self::Gt(col, val) => format!("{} > {}", col, push_param(offset, params, val.clone())),
            Self::Gte(col, val) => {
                format!("{} >= {}", col, push_param(offset, params, val.clone()))
            }

            Self::In(col, values) => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| push_param(offset, params, v.clone()))
                    .collect();
                format!("{} IN ({})", col, placeholders.join(", "))
            }
            Self::NotIn(col, values) => {
                if values.is_empty() {
                    return "TRUE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| push_param(offset, params, v.clone()))
                    .collect();
                format!("{} NOT IN ({})", col, placeholders.join(", "))
            }

            Self::Contains(col, val) => {
                let pattern = like_pattern(val, "%", "%");
                format!("{} LIKE {}", col, push_param(offset, params, pattern))
            }
            Self::StartsWith(col, val) => {
                let pattern = like_pattern(val, "", "%");
                format!("{} LIKE {}", col, push_param(offset, params, pattern))
            }
            Self::EndsWith(col, val) => {
                let pattern = like_pattern(val, "%", "");
                format!("{} LIKE {}", col, push_param(offset, params, pattern))
            }

            Self::IsNull(col) => format!("{} IS NULL", col),
            Self::IsNotNull(col) => format!("{} IS NOT NULL", col),

            Self::And(filters) => {
                if filters.is_empty() {
                    return "TRUE".to_string();
                }
                let parts: Vec<_> = filters
                    .iter()
                    .map(|f| f.to_sql_with_params(offset, params))
                    .collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(filters) => {
                if filters.is_empty() {
                    return "FALSE".to_string();
                }
                let parts: Vec<_> = filters
                    .iter()
                    .map(|f| f.to_sql_with_params(offset, params))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            Self::Not(filter) => {
                let inner = filter.to_sql_with_params(offset, params);
                format!("NOT ({})", inner)
            }
        }
    }

    /// Evaluate this filter against a row. Missing columns read as null.
    pub fn matches(&self, row: &Row) -> bool {
        let get = |col: &str| column(row, col);

        match self {
            Self::None => true,

            Self::Equals(col, val) => {
                if val.is_null() {
                    get(col).is_null()
                } else {
                    get(col).sql_eq(val)
                }
            }
            Self::NotEquals(col, val) => {
                let actual = get(col);
                if val.is_null() {
                    !actual.is_null()
                } else {
                    !actual.is_null() && !actual.sql_eq(val)
                }
            }

            Self::Lt(col, val) => get(col).compare(val) == Some(Ordering::Less),
            Self::Lte(col, val) => matches!(
                get(col).compare(val),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Gt(col, val) => get(col).compare(val) == Some(Ordering::Greater),
            Self::Gte(col, val) => matches!(
                get(col).compare(val),
                Some(Ordering::Greater | Ordering::Equal)
            ),

            Self::In(col, values) => {
                let actual = get(col);
                values.iter().any(|v| actual.sql_eq(v))
            }
            Self::NotIn(col, values) => {
                let actual = get(col);
                !actual.is_null() && !values.iter().any(|v| actual.sql_eq(v))
            }

            Self::Contains(col, val) => str_test(get(col), val, |a, b| a.contains(b)),
            Self::StartsWith(col, val) => str_test(get(col), val, |a, b| a.starts_with(b)),
            Self::EndsWith(col, val) => str_test(get(col), val, |a, b| a.ends_with(b)),

            Self::IsNull(col) => get(col).is_null(),
            Self::IsNotNull(col) => !get(col).is_null(),

            Self::And(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(row)),
            Self::Not(filter) => !filter.matches(row),
        }
    }
}

static NULL_VALUE: FilterValue = FilterValue::Null;

fn column<'r>(row: &'r Row, col: &str) -> &'r FilterValue {
    row.get(col).unwrap_or(&NULL_VALUE)
}

fn push_param(offset: usize, params: &mut Vec<FilterValue>, value: FilterValue) -> String {
    params.push(value);
    format!("${}", offset + params.len())
}

fn like_pattern(value: &FilterValue, prefix: &str, suffix: &str) -> FilterValue {
    match value {
        FilterValue::String(s) => FilterValue::String(format!("{}{}{}", prefix, s, suffix)),
        other => other.clone(),
    }
}

fn str_test(
    actual: &FilterValue,
    expected: &FilterValue,
    test: impl Fn(&str, &str) -> bool,
) -> bool {
    match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(b)) => test(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, FilterValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_filter_value_from() {
        assert_eq!(FilterValue::from(42i32), FilterValue::Int(42));
        assert_eq!(FilterValue::from("hello"), FilterValue::String("hello".to_string()));
        assert_eq!(FilterValue::from(true), FilterValue::Bool(true));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
    }

    #[test]
    fn test_value_key() {
        assert_eq!(FilterValue::Null.key(), None);
        assert_eq!(FilterValue::Int(7).key(), Some(ValueKey::Int(7)));
        assert_eq!(
            FilterValue::from("a").key(),
            Some(ValueKey::String("a".to_string()))
        );
    }

    #[test]
    fn test_filter_and_numbering() {
        let combined = Filter::and([
            Filter::equals("name", "Alice"),
            Filter::Gt("age".to_string(), FilterValue::Int(18)),
        ]);

        let (sql, params) = combined.to_sql(0);
        assert_eq!(sql, "(name = $1 AND age > $2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_filter_offset() {
        let (sql, params) = Filter::in_list("id", [1.into(), 2.into()]).to_sql(3);
        assert_eq!(sql, "id IN ($4, $5)");
        assert_eq!(params, vec![FilterValue::Int(1), FilterValue::Int(2)]);
    }

    #[test]
    fn test_filter_and_flattening() {
        assert!(Filter::and([Filter::None, Filter::None]).is_none());
        let single = Filter::and([Filter::None, Filter::IsNull("x".into())]);
        assert_eq!(single, Filter::IsNull("x".into()));
        let chained = Filter::equals("a", 1)
            .and_then(Filter::equals("b", 2))
            .and_then(Filter::None);
        assert!(matches!(chained, Filter::And(ref f) if f.len() == 2));
    }

    #[test]
    fn test_filter_in_empty() {
        let (sql, params) = Filter::In("id".into(), vec![]).to_sql(0);
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());
        assert!(!Filter::In("id".into(), vec![]).matches(&row(&[("id", 1.into())])));
    }

    #[test]
    fn test_filter_contains_sql() {
        let (sql, params) = Filter::Contains("email".to_string(), "example".into()).to_sql(0);
        assert_eq!(sql, "email LIKE $1");
        assert_eq!(params[0], FilterValue::String("%example%".to_string()));
    }

    #[test]
    fn test_matches_equality_and_null() {
        let r = row(&[("published", true.into()), ("deleted_at", FilterValue::Null)]);
        assert!(Filter::equals("published", true).matches(&r));
        assert!(!Filter::equals("published", false).matches(&r));
        assert!(Filter::equals("deleted_at", FilterValue::Null).matches(&r));
        assert!(Filter::IsNull("missing".into()).matches(&r));
        assert!(!Filter::NotEquals("deleted_at".into(), 1.into()).matches(&r));
    }

    #[test]
    fn test_matches_numeric_and_in() {
        let r = row(&[("score", 10.into()), ("ratio", 0.5.into())]);
        assert!(Filter::Gt("score".into(), 9.into()).matches(&r));
        assert!(Filter::Lte("score".into(), 10.0.into()).matches(&r));
        assert!(Filter::Lt("ratio".into(), 1.into()).matches(&r));
        assert!(Filter::in_list("score", [1.into(), 10.into()]).matches(&r));
        assert!(Filter::NotIn("score".into(), vec![1.into()]).matches(&r));
    }

    #[test]
    fn test_matches_strings_and_logic() {
        let r = row(&[("email", "bob@example.com".into())]);
        assert!(Filter::Contains("email".into(), "example".into()).matches(&r));
        assert!(Filter::StartsWith("email".into(), "bob".into()).matches(&r));
        assert!(Filter::EndsWith("email".into(), ".com".into()).matches(&r));
        assert!(Filter::not(Filter::EndsWith("email".into(), ".org".into())).matches(&r));
        assert!(Filter::or([
            Filter::equals("email", "x"),
            Filter::IsNotNull("email".into()),
        ])
        .matches(&r));
    }
}
