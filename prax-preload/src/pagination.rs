//! Offset-based pagination for root queries.
//!
//! ```rust
//! use prax_preload::Pagination;
//!
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(), "LIMIT 20 OFFSET 10");
//! assert!(Pagination::new().is_empty());
//! ```

use std::fmt::Write;

/// Pagination configuration for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Generate SQL LIMIT/OFFSET clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(54);

        if let Some(take) = self.take {
            let _ = write!(sql, "LIMIT {}", take);
        }

        if let Some(skip) = self.skip {
            if !sql.is_empty() {
                sql.push(' ');
            }
            let _ = write!(sql, "OFFSET {}", skip);
        }

        sql
    }

    /// Apply this pagination to an in-memory result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = self.skip.map_or(0, |s| s as usize);
        let take = self.take.map_or(usize::MAX, |t| t as usize);
        items.into_iter().skip(skip).take(take).collect()
    }
}
