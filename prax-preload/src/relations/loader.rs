//! Batched relation queries.
//!
//! One association level is one query: the related table filtered by the
//! set of parent keys, with the relation scope layered on top. The rows
//! come back grouped by the key they matched on.

use indexmap::{IndexMap, IndexSet};

use super::spec::Association;
use crate::catalog::Catalog;
use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue, ValueKey};
use crate::prax_trace;
use crate::record::Record;
use crate::sql::SelectQuery;
use crate::traits::QueryEngine;

/// Related records of one batch query, grouped by target key value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    groups: IndexMap<ValueKey, Vec<Record>>,
}

impl Batch {
    /// Records matching a key, in query order.
    pub fn many(&self, key: &ValueKey) -> &[Record] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// First record matching a key.
    pub fn first(&self, key: &ValueKey) -> Option<&Record> {
        self.many(key).first()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Check if the query returned nothing.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn push(&mut self, key: ValueKey, record: Record) {
        self.groups.entry(key).or_default().push(record);
    }
}

/// Unique non-null values of `column` across `parents`, in first-seen order.
pub fn collect_keys<'r>(
    parents: impl IntoIterator<Item = &'r Record>,
    column: &str,
) -> Vec<FilterValue> {
    let mut seen = IndexSet::new();
    let mut keys = Vec::new();
    for parent in parents {
        let value = parent.value(column);
        if let Some(key) = value.key() {
            if seen.insert(key) {
                keys.push(value.clone());
            }
        }
    }
    keys
}

/// Executes the batch query of one association level.
pub struct BatchLoader<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    catalog: &'a Catalog,
}

impl<'a, E: QueryEngine + ?Sized> BatchLoader<'a, E> {
    /// Create a loader.
    pub fn new(engine: &'a E, catalog: &'a Catalog) -> Self {
        Self { engine, catalog }
    }

    /// Build the batch query for `association`.
    pub fn build_query(
        &self,
        association: &Association,
        columns: Vec<String>,
        keys: Vec<FilterValue>,
    ) -> SelectQuery {
        let query = SelectQuery::new(&association.related_model, &association.related_table)
            .columns(columns)
            .r#where(Filter::In(association.target_key.clone(), keys));
        match &association.scope {
            Some(scope) => query
                .r#where(scope.filter.clone())
                .order_by(scope.order_by.clone()),
            None => query,
        }
    }

    /// Load the related records matching `keys`.
    ///
    /// No query is issued when `keys` is empty. Fetched rows become records
    /// of their concrete model.
    pub async fn load(
        &self,
        association: &Association,
        columns: Vec<String>,
        keys: Vec<FilterValue>,
    ) -> QueryResult<Batch> {
        if keys.is_empty() {
            prax_trace!(
                relation = %association.name,
                model = %association.owner_model,
                "No keys to load"
            );
            return Ok(Batch::default());
        }

        let query = self.build_query(association, columns, keys);
        let rows = self.engine.select(&query).await?;

        let mut batch = Batch::default();
        for row in rows {
            let Some(key) = row.get(&association.target_key).and_then(FilterValue::key) else {
                continue;
            };
            batch.push(key, self.catalog.materialize(&association.related_model, row)?);
        }
        Ok(batch)
    }
}
