//! The query execution seam.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::QueryResult;
use crate::record::Row;
use crate::sql::SelectQuery;

/// A boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes queries on behalf of the loader.
///
/// Each call is a read-only fetch. Errors are passed through to the caller
/// of the load untouched.
pub trait QueryEngine: Send + Sync {
    /// Run a SELECT and return the projected rows.
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>>;
}

impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        (**self).select(query)
    }
}

impl<E: QueryEngine + ?Sized> QueryEngine for &E {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        (**self).select(query)
    }
}
