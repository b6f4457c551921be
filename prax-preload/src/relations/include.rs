//! Column specifications and include directives.
//!
//! A [`ColumnSpec`] is the raw, user-facing form: either a bare list of
//! column names, or `{columns, include}` with nested specs per relation. The
//! two forms mix freely at any depth. Parsing turns a spec into a
//! [`ColumnInclude`] tree with an explicit [`SelectionMode`]; no catalog
//! lookups happen here.
//!
//! ```rust
//! use prax_preload::{ColumnSpec, ColumnSpecs, SelectionMode};
//!
//! let specs = ColumnSpecs::new().relation(
//!     "comments",
//!     ColumnSpec::columns(["body"]).include("author", ["name"]),
//! );
//! let includes = specs.parse(SelectionMode::Include);
//! let comments = includes.get("comments").unwrap();
//! assert!(comments.selector.includes("body"));
//! assert!(comments.nested.contains("author"));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::select::{ColumnSelector, SelectionMode};
use crate::error::{QueryError, QueryResult};

/// Raw column specification for one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    /// Shorthand: just the columns.
    Columns(Vec<String>),
    /// Explicit form with nested relations.
    Nested(NestedSpec),
}

/// Explicit `{columns, include}` form of a column specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestedSpec {
    /// Columns of the relation's own model.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Specs for relations of the related model.
    #[serde(default)]
    pub include: IndexMap<String, ColumnSpec>,
}

impl ColumnSpec {
    /// Create a shorthand spec from column names.
    pub fn columns(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }

    /// Add a nested relation spec, switching to the explicit form.
    pub fn include(self, relation: impl Into<String>, spec: impl Into<ColumnSpec>) -> Self {
        let mut nested = match self {
            Self::Columns(columns) => NestedSpec {
                columns,
                include: IndexMap::new(),
            },
            Self::Nested(nested) => nested,
        };
        nested.include.insert(relation.into(), spec.into());
        Self::Nested(nested)
    }

    /// Column names listed at this level.
    pub fn column_names(&self) -> &[String] {
        match self {
            Self::Columns(columns) => columns,
            Self::Nested(nested) => &nested.columns,
        }
    }

    /// Parse into a canonical tree, reading every column list in `mode`.
    pub fn parse(&self, mode: SelectionMode) -> ColumnInclude {
        let selector = ColumnSelector::new(mode, self.column_names().iter().cloned());
        let nested = match self {
            Self::Columns(_) => ColumnIncludes::new(),
            Self::Nested(spec) => spec
                .include
                .iter()
                .map(|(name, child)| (name.clone(), child.parse(mode)))
                .collect(),
        };
        ColumnInclude { selector, nested }
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for ColumnSpec {
    fn from(columns: [S; N]) -> Self {
        Self::columns(columns)
    }
}

impl From<Vec<String>> for ColumnSpec {
    fn from(columns: Vec<String>) -> Self {
        Self::Columns(columns)
    }
}

impl From<NestedSpec> for ColumnSpec {
    fn from(spec: NestedSpec) -> Self {
        Self::Nested(spec)
    }
}

/// Column specifications keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSpecs(IndexMap<String, ColumnSpec>);

impl ColumnSpecs {
    /// Create an empty set of specs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec for a relation.
    pub fn relation(mut self, name: impl Into<String>, spec: impl Into<ColumnSpec>) -> Self {
        self.0.insert(name.into(), spec.into());
        self
    }

    /// Parse specs from a JSON object.
    ///
    /// ```rust
    /// use prax_preload::ColumnSpecs;
    /// use serde_json::json;
    ///
    /// let specs = ColumnSpecs::from_json(&json!({
    ///     "comments": {"columns": ["body"], "include": {"author": ["name"]}},
    ///     "tags": ["label"],
    /// }))
    /// .unwrap();
    /// assert_eq!(specs.names().collect::<Vec<_>>(), vec!["comments", "tags"]);
    ///
    /// assert!(ColumnSpecs::from_json(&json!({"tags": "label"})).is_err());
    /// ```
    pub fn from_json(value: &serde_json::Value) -> QueryResult<Self> {
        Self::deserialize(value).map_err(|e| QueryError::invalid_spec(e.to_string()).with_source(e))
    }

    /// Parse specs from a JSON string.
    pub fn from_json_str(json: &str) -> QueryResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| QueryError::invalid_spec(e.to_string()).with_source(e))
    }

    /// Relation names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Check if no relation is specified.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse every spec in `mode`.
    pub fn parse(&self, mode: SelectionMode) -> ColumnIncludes {
        self.0
            .iter()
            .map(|(name, spec)| (name.clone(), spec.parse(mode)))
            .collect()
    }
}

impl<K: Into<String>, const N: usize> From<[(K, ColumnSpec); N]> for ColumnSpecs {
    fn from(specs: [(K, ColumnSpec); N]) -> Self {
        Self(specs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A parsed column specification for one relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnInclude {
    /// Which columns of the related model to fetch.
    pub selector: ColumnSelector,
    /// Specs for relations of the related model.
    pub nested: ColumnIncludes,
}

impl ColumnInclude {
    /// Fetch every column, load nothing further.
    pub fn all() -> Self {
        Self::default()
    }

    /// Check if nested relations are specified.
    pub fn has_nested(&self) -> bool {
        !self.nested.is_empty()
    }
}

/// Parsed specifications keyed by relation name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnIncludes(IndexMap<String, ColumnInclude>);

impl ColumnIncludes {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the spec for a relation.
    pub fn get(&self, relation: &str) -> Option<&ColumnInclude> {
        self.0.get(relation)
    }

    /// Check if a relation is specified.
    pub fn contains(&self, relation: &str) -> bool {
        self.0.contains_key(relation)
    }

    /// Set the spec for a relation, replacing any previous one.
    pub fn insert(&mut self, relation: impl Into<String>, include: ColumnInclude) {
        self.0.insert(relation.into(), include);
    }

    /// Remove the spec for a relation.
    pub fn remove(&mut self, relation: &str) -> Option<ColumnInclude> {
        self.0.shift_remove(relation)
    }

    /// Merge another set in; its entries win.
    pub fn merge(&mut self, other: ColumnIncludes) {
        self.0.extend(other.0);
    }

    /// Iterate over `(relation, spec)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnInclude)> {
        self.0.iter().map(|(name, include)| (name.as_str(), include))
    }

    /// Relation names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of relations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no relation is specified.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ColumnInclude)> for ColumnIncludes {
    fn from_iter<T: IntoIterator<Item = (String, ColumnInclude)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A plain preload directive: load a relation with every column.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeSpec {
    /// Name of the relation to include.
    pub relation_name: String,
    /// Nested includes.
    pub nested: IndexMap<String, IncludeSpec>,
}

impl IncludeSpec {
    /// Create a new include spec for a relation.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
            nested: IndexMap::new(),
        }
    }

    /// Include a nested relation.
    pub fn include(mut self, nested: impl Into<IncludeSpec>) -> Self {
        let nested = nested.into();
        self.nested.insert(nested.relation_name.clone(), nested);
        self
    }

    /// Check if there are nested includes.
    pub fn has_nested(&self) -> bool {
        !self.nested.is_empty()
    }

    /// The equivalent column spec, selecting every column at each level.
    pub fn to_column_include(&self) -> ColumnInclude {
        ColumnInclude {
            selector: ColumnSelector::all(),
            nested: self
                .nested
                .iter()
                .map(|(name, spec)| (name.clone(), spec.to_column_include()))
                .collect(),
        }
    }
}

impl From<&str> for IncludeSpec {
    fn from(relation_name: &str) -> Self {
        Self::new(relation_name)
    }
}

impl From<String> for IncludeSpec {
    fn from(relation_name: String) -> Self {
        Self::new(relation_name)
    }
}
