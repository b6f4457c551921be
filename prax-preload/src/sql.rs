//! Structured SELECT queries handed to a [`QueryEngine`](crate::traits::QueryEngine).

use crate::filter::{Filter, FilterValue};
use crate::pagination::Pagination;
use crate::types::OrderBy;

/// A single-table SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Model the rows belong to.
    pub model: String,
    /// Table to read.
    pub table: String,
    /// Projected columns; empty selects every column.
    pub columns: Vec<String>,
    /// WHERE clause.
    pub filter: Filter,
    /// ORDER BY clause.
    pub order_by: OrderBy,
    /// LIMIT/OFFSET clause.
    pub pagination: Pagination,
}

impl SelectQuery {
    /// Create a query selecting every row of `table`.
    pub fn new(model: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            table: table.into(),
            columns: Vec::new(),
            filter: Filter::None,
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
        }
    }

    /// Set the projected columns.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a predicate; repeated calls are combined with AND.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter.into());
        self
    }

    /// Set the ordering.
    pub fn order_by(mut self, order_by: impl Into<OrderBy>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Set the pagination.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Render the query with `$n` placeholders.
    ///
    /// ```rust
    /// use prax_preload::{Filter, SelectQuery};
    ///
    /// let query = SelectQuery::new("Comment", "comments")
    ///     .columns(["id", "post_id", "body"])
    ///     .r#where(Filter::in_list("post_id", [1.into(), 2.into()]))
    ///     .r#where(Filter::equals("approved", true));
    /// let (sql, params) = query.build_sql();
    /// assert_eq!(
    ///     sql,
    ///     "SELECT id, post_id, body FROM comments WHERE (post_id IN ($1, $2) AND approved = $3)"
    /// );
    /// assert_eq!(params.len(), 3);
    /// ```
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let mut sql = String::with_capacity(64);
        sql.push_str("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        let mut params = Vec::new();
        if !self.filter.is_none() {
            let (where_sql, where_params) = self.filter.to_sql(0);
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params = where_params;
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.to_sql());
        }
        if !self.pagination.is_empty() {
            sql.push(' ');
            sql.push_str(&self.pagination.to_sql());
        }
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderByField;

    #[test]
    fn test_select_all() {
        let (sql, params) = SelectQuery::new("User", "users").build_sql();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_full_query() {
        let query = SelectQuery::new("Post", "posts")
            .columns(["id", "title"])
            .r#where(Filter::equals("published", true))
            .order_by(OrderByField::desc("id"))
            .paginate(Pagination::new().skip(20).take(10));
        let (sql, params) = query.build_sql();
        assert_eq!(
            sql,
            "SELECT id, title FROM posts WHERE published = $1 ORDER BY id DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(params, vec![FilterValue::Bool(true)]);
    }
}
