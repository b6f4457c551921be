//! Common types used in query building.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::record::Row;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Order by specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: Cow<'static, str>,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Write the SQL directly to a buffer.
    #[inline]
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&self.column);
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
    }

    /// Compare two rows on this field. Nulls sort first in ascending order.
    fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        let left = a.get(self.column.as_ref());
        let right = b.get(self.column.as_ref());
        let left_null = left.is_none_or(|v| v.is_null());
        let right_null = right.is_none_or(|v| v.is_null());

        let ordering = match (left, right) {
            _ if left_null || right_null => left_null.cmp(&right_null).reverse(),
            (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };

        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Order by specification that can be a single field or multiple fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Order by a single field.
    Field(OrderByField),
    /// Order by multiple fields.
    Fields(Box<[OrderByField]>),
}

impl OrderBy {
    /// Create an empty order by (no ordering).
    pub fn none() -> Self {
        Self::Fields(Box::new([]))
    }

    /// Check if the order by is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Field(_) => false,
            Self::Fields(fields) => fields.is_empty(),
        }
    }

    /// Add a field to the order by.
    pub fn then(self, field: OrderByField) -> Self {
        match self {
            Self::Field(existing) => Self::Fields(vec![existing, field].into_boxed_slice()),
            Self::Fields(existing) => {
                let mut fields: Vec<_> = existing.into_vec();
                fields.push(field);
                Self::from(fields)
            }
        }
    }

    /// Create an OrderBy from multiple fields.
    pub fn from_fields(fields: impl IntoIterator<Item = OrderByField>) -> Self {
        Self::from(fields.into_iter().collect::<Vec<_>>())
    }

    /// Iterate over the fields in order of precedence.
    pub fn fields(&self) -> &[OrderByField] {
        match self {
            Self::Field(field) => std::slice::from_ref(field),
            Self::Fields(fields) => fields,
        }
    }

    /// Generate the SQL ORDER BY clause (without the "ORDER BY" keyword).
    ///
    /// ```rust
    /// use prax_preload::types::{OrderBy, OrderByField};
    ///
    /// let order = OrderBy::from_fields([
    ///     OrderByField::desc("created_at"),
    ///     OrderByField::asc("id"),
    /// ]);
    /// assert_eq!(order.to_sql(), "created_at DESC, id ASC");
    /// ```
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            field.write_sql(&mut sql);
        }
        sql
    }

    /// Compare two rows by every field in turn.
    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        self.fields()
            .iter()
            .map(|field| field.compare_rows(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::none()
    }
}

impl From<OrderByField> for OrderBy {
    fn from(field: OrderByField) -> Self {
        Self::Field(field)
    }
}

impl From<Vec<OrderByField>> for OrderBy {
    fn from(mut fields: Vec<OrderByField>) -> Self {
        match fields.len() {
            0 => Self::none(),
            1 => Self::Field(fields.remove(0)),
            _ => Self::Fields(fields.into_boxed_slice()),
        }
    }
}

/// Field selection for root queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Select {
    /// Select all fields of the model.
    #[default]
    All,
    /// Select specific fields.
    Fields(Vec<String>),
}

impl Select {
    /// Create a selection for specific fields.
    pub fn fields(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }

    /// Check if this selects all fields.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Select {
    fn from(fields: [S; N]) -> Self {
        Self::fields(fields)
    }
}

impl From<Vec<String>> for Select {
    fn from(fields: Vec<String>) -> Self {
        Self::Fields(fields)
    }
}
