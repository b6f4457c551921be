//! Column selection and resolution.
//!
//! A [`ColumnSelector`] is a whitelist or a blacklist of column names. The
//! [`ColumnResolver`] turns one into the concrete column list of a batch
//! query, adding back every key the loader needs to wire records together:
//! the target primary key, the key the batch is grouped by, the keys nested
//! relations will read, and the discriminator of polymorphic models.

use indexmap::IndexSet;

use super::include::{ColumnInclude, ColumnIncludes};
use super::spec::Association;
use crate::catalog::Catalog;
use crate::error::QueryResult;
use crate::types::Select;

/// How a selector's columns are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// Only the listed columns (plus required keys).
    Include,
    /// Every column except the listed ones (required keys are kept).
    Exclude,
}

/// A set of column names and how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelector {
    /// Selection mode.
    pub mode: SelectionMode,
    /// Listed columns.
    pub columns: IndexSet<String>,
}

impl ColumnSelector {
    /// Create a selector.
    pub fn new(mode: SelectionMode, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            mode,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Whitelist the given columns.
    pub fn only(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(SelectionMode::Include, columns)
    }

    /// Blacklist the given columns.
    pub fn except(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(SelectionMode::Exclude, columns)
    }

    /// Select every column.
    pub fn all() -> Self {
        Self {
            mode: SelectionMode::Exclude,
            columns: IndexSet::new(),
        }
    }

    /// Check if a column passes the selector, ignoring required keys.
    pub fn includes(&self, column: &str) -> bool {
        match self.mode {
            SelectionMode::Include => self.columns.contains(column),
            SelectionMode::Exclude => !self.columns.contains(column),
        }
    }
}

impl Default for ColumnSelector {
    fn default() -> Self {
        Self::all()
    }
}

/// Computes the column lists of batch and root queries.
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> ColumnResolver<'a> {
    /// Create a resolver over a catalog.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Columns to fetch when loading `association` with `include`.
    ///
    /// Fails with an unknown relation error when `include` nests a relation
    /// the related model does not declare.
    pub fn resolve(
        &self,
        association: &Association,
        include: &ColumnInclude,
    ) -> QueryResult<Vec<String>> {
        let mut required = vec![
            association.related_primary_key.clone(),
            association.target_key.clone(),
        ];
        required.extend(self.nested_keys(&association.related_model, &include.nested)?);
        self.resolve_columns(&include.selector, &association.related_model, required)
    }

    /// Columns of the root query for `model`, widened with the keys that
    /// loading `includes` will read.
    pub fn root_columns(
        &self,
        model: &str,
        select: &Select,
        includes: &ColumnIncludes,
    ) -> QueryResult<Vec<String>> {
        let selector = match select {
            Select::All => ColumnSelector::all(),
            Select::Fields(fields) => ColumnSelector::only(fields),
        };
        let mut required = vec![self.catalog.primary_key(model)?];
        required.extend(self.nested_keys(model, includes)?);
        self.resolve_columns(&selector, model, required)
    }

    /// Parent-side keys needed in rows of `model` to load each relation of `nested`.
    pub fn nested_keys(&self, model: &str, nested: &ColumnIncludes) -> QueryResult<Vec<String>> {
        let mut keys = IndexSet::new();
        for name in nested.names() {
            for association in self.catalog.family_relations(model, name)? {
                keys.insert(association.source_key);
            }
        }
        Ok(keys.into_iter().collect())
    }

    /// Apply a selector to `model`'s columns and union in `required`.
    ///
    /// A whitelist is taken verbatim; a blacklist is applied to the columns
    /// of `model` and every model extending it. The discriminator of a
    /// polymorphic model is always kept.
    pub fn resolve_columns(
        &self,
        selector: &ColumnSelector,
        model: &str,
        required: impl IntoIterator<Item = String>,
    ) -> QueryResult<Vec<String>> {
        let mut columns: IndexSet<String> = match selector.mode {
            SelectionMode::Include => selector.columns.iter().cloned().collect(),
            SelectionMode::Exclude => self
                .catalog
                .family_columns(model)?
                .into_iter()
                .filter(|column| selector.includes(column))
                .collect(),
        };
        columns.extend(required);
        if let Some(discriminator) = self.catalog.discriminator(model)? {
            columns.insert(discriminator);
        }
        Ok(columns.into_iter().collect())
    }
}
