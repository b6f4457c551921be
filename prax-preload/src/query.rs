//! Query builder entry point.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::{DebugConfig, PreloadConfig};
use crate::error::QueryResult;
use crate::operations::FindManyOperation;
use crate::record::Record;
use crate::relations::{ColumnIncludes, Preloader};
use crate::traits::QueryEngine;

/// Hands out query operations bound to an engine and a model catalog.
///
/// Cloning is cheap; the engine and catalog are shared.
pub struct QueryBuilder<E: QueryEngine> {
    engine: Arc<E>,
    catalog: Arc<Catalog>,
    debug: DebugConfig,
}

impl<E: QueryEngine> QueryBuilder<E> {
    /// Create a new query builder.
    pub fn new(engine: E, catalog: Catalog) -> Self {
        Self::shared(Arc::new(engine), Arc::new(catalog))
    }

    /// Create a query builder over an engine and catalog shared with other owners.
    pub fn shared(engine: Arc<E>, catalog: Arc<Catalog>) -> Self {
        Self {
            engine,
            catalog,
            debug: DebugConfig::default(),
        }
    }

    /// Create a query builder whose catalog and debug settings come from a config file.
    pub fn from_config(engine: E, config: &PreloadConfig) -> QueryResult<Self> {
        Ok(Self::new(engine, config.catalog()?).with_debug(config.debug.clone()))
    }

    /// Set the debug settings passed on to operations.
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// The query engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The model catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Start a find_many query on `model`.
    pub fn find_many(&self, model: impl Into<String>) -> FindManyOperation<E> {
        FindManyOperation::new(Arc::clone(&self.engine), Arc::clone(&self.catalog), model)
            .with_debug(self.debug.clone())
    }

    /// Preload relations onto records that were fetched elsewhere.
    pub async fn preload(
        &self,
        records: &mut [Record],
        includes: &ColumnIncludes,
    ) -> QueryResult<()> {
        Preloader::new(self.engine.as_ref(), &self.catalog)
            .load(records, includes)
            .await
    }
}

impl<E: QueryEngine> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            catalog: Arc::clone(&self.catalog),
            debug: self.debug.clone(),
        }
    }
}
