//! In-process query engine.
//!
//! [`MemoryEngine`] keeps tables as lists of rows and evaluates
//! [`SelectQuery`] values directly. Every executed query is recorded, which
//! makes it the engine of choice for asserting how many queries a load
//! issued.
//!
//! ```rust
//! use prax_preload::{FilterValue, MemoryEngine, QueryEngine, SelectQuery, row};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = MemoryEngine::new().with_table("users", ["id", "name"]);
//! engine.insert("users", row! {"id" => 1, "name" => "Ada"}).unwrap();
//!
//! let query = SelectQuery::new("User", "users").columns(["name"]);
//! let rows = engine.select(&query).await.unwrap();
//! assert_eq!(rows[0]["name"], FilterValue::from("Ada"));
//! assert_eq!(engine.query_count(), 1);
//! # }
//! ```

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::record::Row;
use crate::sql::SelectQuery;
use crate::traits::{BoxFuture, QueryEngine};

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// A query engine over in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: RwLock<IndexMap<String, MemoryTable>>,
    log: Mutex<Vec<SelectQuery>>,
}

impl MemoryEngine {
    /// Create an engine with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table, builder style.
    pub fn with_table(
        self,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.create_table(table, columns);
        self
    }

    /// Create a table, dropping any previous one with the same name.
    pub fn create_table(
        &self,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) {
        let contents = MemoryTable {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        };
        self.tables.write().insert(table.into(), contents);
    }

    /// Insert a row. Columns the row leaves out read as null.
    pub fn insert(&self, table: &str, row: Row) -> QueryResult<()> {
        self.insert_many(table, [row])
    }

    /// Insert several rows into one table.
    pub fn insert_many(&self, table: &str, rows: impl IntoIterator<Item = Row>) -> QueryResult<()> {
        let mut tables = self.tables.write();
        let target = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        for row in rows {
            if let Some(column) = row.keys().find(|c| !target.columns.contains(c)) {
                return Err(missing_column(table, column));
            }
            target.rows.push(row);
        }
        Ok(())
    }

    /// Every query executed so far, oldest first.
    pub fn queries(&self) -> Vec<SelectQuery> {
        self.log.lock().clone()
    }

    /// Number of queries executed so far.
    pub fn query_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Forget the executed queries.
    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn execute(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        self.log.lock().push(query.clone());

        let tables = self.tables.read();
        let table = tables
            .get(&query.table)
            .ok_or_else(|| missing_table(&query.table).with_model(&query.model))?;
        if let Some(column) = query.columns.iter().find(|c| !table.columns.contains(c)) {
            return Err(missing_column(&query.table, column).with_model(&query.model));
        }

        let mut rows: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| query.filter.matches(row))
            .collect();
        if !query.order_by.is_empty() {
            rows.sort_by(|a, b| query.order_by.compare_rows(a, b));
        }
        let rows = query.pagination.apply(rows);

        let columns = if query.columns.is_empty() {
            &table.columns
        } else {
            &query.columns
        };
        Ok(rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(FilterValue::Null)))
                    .collect()
            })
            .collect())
    }
}

impl QueryEngine for MemoryEngine {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        Box::pin(async move {
            let (sql, params) = query.build_sql();
            debug!(sql = %sql, params = params.len(), "Executing select");
            self.execute(query)
        })
    }
}

fn missing_table(table: &str) -> QueryError {
    QueryError::database(format!("relation \"{}\" does not exist", table))
}

fn missing_column(table: &str, column: &str) -> QueryError {
    QueryError::database(format!("column \"{}\" of relation \"{}\" does not exist", column, table))
        .with_field(column)
}
