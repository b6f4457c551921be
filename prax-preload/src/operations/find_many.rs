//! FindMany operation with selective relation preloading.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::DebugConfig;
use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::pagination::Pagination;
use crate::prax_debug;
use crate::record::Record;
use crate::relations::{
    ColumnIncludes, ColumnResolver, ColumnSpecs, IncludeSpec, Preloader, SelectionMode,
};
use crate::sql::SelectQuery;
use crate::traits::QueryEngine;
use crate::types::{OrderBy, Select};

/// A query operation that finds multiple records and preloads relations.
///
/// Every builder method returns a new value; the operation is only run by
/// [`exec`](Self::exec).
///
/// # Example
///
/// ```rust,ignore
/// let posts = client
///     .find_many("Post")
///     .r#where(Filter::equals("published", true))
///     .include("tags")
///     .with_columns(ColumnSpecs::new().relation(
///         "comments",
///         ColumnSpec::columns(["body"]).include("author", ["name"]),
///     ))?
///     .without_columns(ColumnSpecs::new().relation("editor", ["password_hash"]))?
///     .exec()
///     .await?;
/// ```
pub struct FindManyOperation<E: QueryEngine> {
    engine: Arc<E>,
    catalog: Arc<Catalog>,
    debug: DebugConfig,
    model: String,
    filter: Filter,
    order_by: OrderBy,
    pagination: Pagination,
    select: Select,
    includes: IndexMap<String, IncludeSpec>,
    columns: ColumnIncludes,
}

impl<E: QueryEngine> FindManyOperation<E> {
    /// Create a new FindMany operation.
    pub fn new(engine: Arc<E>, catalog: Arc<Catalog>, model: impl Into<String>) -> Self {
        Self {
            engine,
            catalog,
            debug: DebugConfig::default(),
            model: model.into(),
            filter: Filter::None,
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
            select: Select::All,
            includes: IndexMap::new(),
            columns: ColumnIncludes::new(),
        }
    }

    /// Set the debug settings.
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        let new_filter = filter.into();
        self.filter = self.filter.and_then(new_filter);
        self
    }

    /// Set the order by clause.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = order.into();
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Take a limited number of records.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Select specific root fields. Keys needed by preloads are fetched regardless.
    pub fn select(mut self, select: impl Into<Select>) -> Self {
        self.select = select.into();
        self
    }

    /// Preload a relation with every column.
    ///
    /// A relation also named in [`with_columns`](Self::with_columns) or
    /// [`without_columns`](Self::without_columns) is loaded only once, with
    /// the column restriction.
    pub fn include(mut self, spec: impl Into<IncludeSpec>) -> Self {
        let spec = spec.into();
        self.includes.insert(spec.relation_name.clone(), spec);
        self
    }

    /// Preload relations fetching only the listed columns, plus required keys.
    ///
    /// Top-level relation names are checked against the root model and its
    /// subtypes now; nested names are checked when the load reaches them.
    /// Specs for the same relation replace earlier ones.
    pub fn with_columns(self, specs: impl Into<ColumnSpecs>) -> QueryResult<Self> {
        self.add_columns(specs.into(), SelectionMode::Include)
    }

    /// Preload relations fetching every column except the listed ones.
    ///
    /// Required keys are fetched even when listed.
    pub fn without_columns(self, specs: impl Into<ColumnSpecs>) -> QueryResult<Self> {
        self.add_columns(specs.into(), SelectionMode::Exclude)
    }

    fn add_columns(mut self, specs: ColumnSpecs, mode: SelectionMode) -> QueryResult<Self> {
        for name in specs.names() {
            self.catalog.family_relations(&self.model, name)?;
        }
        self.columns.merge(specs.parse(mode));
        Ok(self)
    }

    /// The relation specs the preloader will run, plain includes shadowed by
    /// column specs removed.
    pub fn preload_includes(&self) -> ColumnIncludes {
        let mut merged = ColumnIncludes::new();
        for (name, spec) in &self.includes {
            if self.columns.contains(name) {
                prax_debug!(
                    relation = %name,
                    model = %self.model,
                    "Plain include replaced by column spec"
                );
                continue;
            }
            merged.insert(name.clone(), spec.to_column_include());
        }
        merged.merge(self.columns.clone());
        merged
    }

    /// Build the root query.
    pub fn build_query(&self) -> QueryResult<SelectQuery> {
        self.root_query(&self.preload_includes())
    }

    /// Build the SQL of the root query.
    pub fn build_sql(&self) -> QueryResult<(String, Vec<FilterValue>)> {
        Ok(self.build_query()?.build_sql())
    }

    fn root_query(&self, includes: &ColumnIncludes) -> QueryResult<SelectQuery> {
        let columns = ColumnResolver::new(&self.catalog).root_columns(
            &self.model,
            &self.select,
            includes,
        )?;
        Ok(SelectQuery::new(&self.model, self.catalog.table(&self.model)?)
            .columns(columns)
            .r#where(self.filter.clone())
            .order_by(self.order_by.clone())
            .paginate(self.pagination))
    }

    /// Execute the query and preload the requested relations.
    pub async fn exec(self) -> QueryResult<Vec<Record>> {
        let started = Instant::now();
        let includes = self.preload_includes();
        let query = self.root_query(&includes)?;

        if self.debug.log_queries {
            let (sql, params) = query.build_sql();
            info!(model = %self.model, sql = %sql, params = params.len(), "Executing find_many");
        }

        let rows = self.engine.select(&query).await?;
        let mut records = rows
            .into_iter()
            .map(|row| self.catalog.materialize(&self.model, row))
            .collect::<QueryResult<Vec<Record>>>()?;

        if !includes.is_empty() {
            Preloader::new(self.engine.as_ref(), &self.catalog)
                .load(&mut records, &includes)
                .await?;
        }

        let elapsed = started.elapsed();
        if elapsed.as_millis() >= u128::from(self.debug.slow_query_threshold) {
            warn!(
                model = %self.model,
                records = records.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow find_many"
            );
        }
        Ok(records)
    }
}

impl<E: QueryEngine> Clone for FindManyOperation<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            catalog: Arc::clone(&self.catalog),
            debug: self.debug.clone(),
            model: self.model.clone(),
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            pagination: self.pagination,
            select: self.select.clone(),
            includes: self.includes.clone(),
            columns: self.columns.clone(),
        }
    }
}
