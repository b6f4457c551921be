//! Model metadata catalog.
//!
//! The catalog answers the questions the preloader asks about a model: its
//! table, primary key and columns, and which relations it declares. Relation
//! keys left out of a declaration are inferred here:
//!
//! - `many_to_one name`: `name_id` on the owner, the related primary key on the target.
//! - `one_to_many` / `one_to_one`: the owner primary key, and
//!   `{declaring_model}_id` (snake case) on the target.
//!
//! Models can extend another model (single-table inheritance). A subtype
//! shares its parent's table, inherits its columns and relations, and is
//! picked for a row when the base model's discriminator column names it.
//!
//! ```rust
//! use prax_preload::{Catalog, ModelMeta, RelationSpec};
//!
//! let catalog = Catalog::new()
//!     .with(ModelMeta::new("User", "users").columns(["id", "name"]))
//!     .with(
//!         ModelMeta::new("BlogPost", "posts")
//!             .columns(["id", "title", "author_id"])
//!             .relation(RelationSpec::many_to_one("author", "User"))
//!             .relation(RelationSpec::one_to_many("comments", "Comment")),
//!     )
//!     .with(ModelMeta::new("Comment", "comments").columns(["id", "blog_post_id", "body"]));
//!
//! let author = catalog.require_relation("BlogPost", "author").unwrap();
//! assert_eq!((author.source_key.as_str(), author.target_key.as_str()), ("author_id", "id"));
//!
//! let comments = catalog.require_relation("BlogPost", "comments").unwrap();
//! assert_eq!(comments.target_key, "blog_post_id");
//! ```

use convert_case::{Case, Casing};
use indexmap::{IndexMap, IndexSet};

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::record::{Record, Row};
use crate::relations::{Association, RelationRegistry, RelationSpec, RelationType};

/// Metadata for a single model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
    /// Model name.
    pub name: String,
    /// Table name; inherited from the parent when unset.
    pub table: Option<String>,
    /// Primary key column; inherited from the parent, then `id`, when unset.
    pub primary_key: Option<String>,
    /// Columns declared by this model, on top of inherited ones.
    pub columns: Vec<String>,
    /// Relations declared by this model.
    pub relations: RelationRegistry,
    /// Parent model for single-table inheritance.
    pub extends: Option<String>,
    /// Column naming the concrete model of a row.
    pub discriminator: Option<String>,
    /// Discriminator value selecting this model; defaults to the model name.
    pub discriminator_value: Option<String>,
}

impl ModelMeta {
    /// Create a model stored in its own table.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::bare(name)
        }
    }

    /// Create a model that extends `parent` and shares its table.
    pub fn subtype(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            extends: Some(parent.into()),
            ..Self::bare(name)
        }
    }

    fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: None,
            columns: Vec::new(),
            relations: RelationRegistry::new(),
            extends: None,
            discriminator: None,
            discriminator_value: None,
        }
    }

    /// Set the primary key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Add columns.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Declare a relation.
    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.relations.register(spec);
        self
    }

    /// Set the discriminator column.
    pub fn discriminator(mut self, column: impl Into<String>) -> Self {
        self.discriminator = Some(column.into());
        self
    }

    /// Set the discriminator value selecting this model.
    pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    fn matches_discriminator(&self, value: &str) -> bool {
        self.discriminator_value.as_deref().unwrap_or(&self.name) == value
    }
}

/// Registry of model metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    models: IndexMap<String, ModelMeta>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any previous one with the same name.
    pub fn register(&mut self, meta: ModelMeta) {
        self.models.insert(meta.name.clone(), meta);
    }

    /// Register a model, builder style.
    pub fn with(mut self, meta: ModelMeta) -> Self {
        self.register(meta);
        self
    }

    /// Get a model's own metadata.
    pub fn model(&self, name: &str) -> QueryResult<&ModelMeta> {
        self.models
            .get(name)
            .ok_or_else(|| QueryError::unknown_model(name))
    }

    /// Check if a model is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Names of all registered models.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// The model followed by its ancestors, nearest first.
    fn lineage(&self, name: &str) -> QueryResult<Vec<&ModelMeta>> {
        let mut current = self.model(name)?;
        let mut chain = vec![current];
        while let Some(parent) = current.extends.as_deref() {
            if chain.len() > self.models.len() {
                return Err(QueryError::configuration(format!(
                    "Inheritance cycle through model {}",
                    name
                ))
                .with_model(name));
            }
            current = self.model(parent)?;
            chain.push(current);
        }
        Ok(chain)
    }

    /// The root of a model's inheritance chain.
    pub fn base_model(&self, name: &str) -> QueryResult<&str> {
        self.lineage(name)?
            .into_iter()
            .last()
            .map(|m| m.name.as_str())
            .ok_or_else(|| QueryError::unknown_model(name))
    }

    /// Check if `model` is `ancestor` or extends it.
    pub fn is_a(&self, model: &str, ancestor: &str) -> bool {
        self.lineage(model)
            .is_ok_and(|chain| chain.iter().any(|m| m.name == ancestor))
    }

    /// Table a model is stored in.
    pub fn table(&self, name: &str) -> QueryResult<String> {
        let lineage = self.lineage(name)?;
        let table = lineage.iter().find_map(|m| m.table.clone());
        Ok(table.unwrap_or_else(|| {
            lineage
                .last()
                .map_or(name, |m| m.name.as_str())
                .to_case(Case::Snake)
        }))
    }

    /// Primary key column of a model.
    pub fn primary_key(&self, name: &str) -> QueryResult<String> {
        let lineage = self.lineage(name)?;
        Ok(lineage
            .iter()
            .find_map(|m| m.primary_key.clone())
            .unwrap_or_else(|| "id".to_string()))
    }

    /// Every column of a model, inherited columns first.
    pub fn columns(&self, name: &str) -> QueryResult<Vec<String>> {
        let lineage = self.lineage(name)?;
        let mut columns: IndexSet<String> = IndexSet::new();
        if let Some(pk) = lineage.iter().rev().find_map(|m| m.primary_key.clone()) {
            columns.insert(pk);
        }
        for meta in lineage.iter().rev() {
            columns.extend(meta.columns.iter().cloned());
        }
        Ok(columns.into_iter().collect())
    }

    /// Every column stored for `model` and the models extending it.
    ///
    /// Rows fetched for a base model can materialize as any subtype, so a
    /// query selecting all columns of a polymorphic model reads these.
    pub fn family_columns(&self, name: &str) -> QueryResult<Vec<String>> {
        let mut columns: IndexSet<String> = self.columns(name)?.into_iter().collect();
        for member in self.descendants(name) {
            columns.extend(self.columns(member)?);
        }
        Ok(columns.into_iter().collect())
    }

    /// Discriminator column of a model's inheritance chain, if any.
    pub fn discriminator(&self, name: &str) -> QueryResult<Option<String>> {
        let lineage = self.lineage(name)?;
        Ok(lineage.iter().find_map(|m| m.discriminator.clone()))
    }

    /// Names of the relations a model declares or inherits.
    pub fn relation_names(&self, name: &str) -> QueryResult<Vec<String>> {
        let lineage = self.lineage(name)?;
        let names: IndexSet<&str> = lineage
            .into_iter()
            .rev()
            .flat_map(|m| m.relations.names())
            .collect();
        Ok(names.into_iter().map(str::to_string).collect())
    }

    /// Look up a relation on a model with its keys resolved.
    ///
    /// Returns `Ok(None)` if neither the model nor its ancestors declare it.
    pub fn relation(&self, model: &str, name: &str) -> QueryResult<Option<Association>> {
        let lineage = self.lineage(model)?;
        let Some((declaring, spec)) = lineage
            .into_iter()
            .find_map(|m| m.relations.get(name).map(move |spec| (m.name.as_str(), spec)))
        else {
            return Ok(None);
        };

        let related_table = self.table(&spec.related_model)?;
        let related_primary_key = self.primary_key(&spec.related_model)?;

        let (source_key, target_key) = match spec.relation_type {
            RelationType::ManyToOne => (
                spec.source_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", spec.name.to_case(Case::Snake))),
                spec.target_key
                    .clone()
                    .unwrap_or_else(|| related_primary_key.clone()),
            ),
            RelationType::OneToMany | RelationType::OneToOne => (
                match &spec.source_key {
                    Some(key) => key.clone(),
                    None => self.primary_key(model)?,
                },
                spec.target_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", declaring.to_case(Case::Snake))),
            ),
        };

        Ok(Some(Association {
            name: spec.name.clone(),
            relation_type: spec.relation_type,
            owner_model: model.to_string(),
            related_model: spec.related_model.clone(),
            related_table,
            related_primary_key,
            source_key,
            target_key,
            scope: spec.scope.clone(),
        }))
    }

    /// Look up a relation, failing with an unknown relation error if absent.
    pub fn require_relation(&self, model: &str, name: &str) -> QueryResult<Association> {
        match self.relation(model, name)? {
            Some(association) => Ok(association),
            None => Err(QueryError::unknown_relation(
                model,
                name,
                self.relation_names(model)?,
            )),
        }
    }

    /// Models extending `name`, directly or transitively.
    pub fn descendants(&self, name: &str) -> Vec<&str> {
        self.models
            .keys()
            .filter(|candidate| candidate.as_str() != name && self.is_a(candidate, name))
            .map(String::as_str)
            .collect()
    }

    /// Look up a relation on a model and on every model extending it.
    ///
    /// Rows of a base model may materialize as any of its subtypes, so a
    /// relation declared only on a subtype is still reachable from a batch
    /// of the base model. Fails with an unknown relation error when no member
    /// of the family declares it.
    pub fn family_relations(&self, model: &str, name: &str) -> QueryResult<Vec<Association>> {
        let mut found = Vec::new();
        for member in std::iter::once(model).chain(self.descendants(model)) {
            if let Some(association) = self.relation(member, name)? {
                found.push(association);
            }
        }
        if found.is_empty() {
            let mut known: IndexSet<String> = self.relation_names(model)?.into_iter().collect();
            for member in self.descendants(model) {
                known.extend(self.relation_names(member)?);
            }
            return Err(QueryError::unknown_relation(model, name, known));
        }
        Ok(found)
    }

    /// Turn a row fetched for `model` into a record of its concrete model.
    ///
    /// Columns that only sibling subtypes declare are dropped.
    pub fn materialize(&self, model: &str, mut row: Row) -> QueryResult<Record> {
        let concrete = self.concrete_model(model, &row);
        if self.descendants(model).is_empty() {
            return Ok(Record::from_row(concrete, row));
        }
        let own: IndexSet<String> = self.columns(concrete)?.into_iter().collect();
        let foreign: IndexSet<String> = self
            .family_columns(model)?
            .into_iter()
            .filter(|column| !own.contains(column))
            .collect();
        row.retain(|column, _| !foreign.contains(column));
        Ok(Record::from_row(concrete, row))
    }

    /// Concrete model of a row fetched for `model`, read from the discriminator.
    pub fn concrete_model<'c>(&'c self, model: &'c str, row: &Row) -> &'c str {
        let Ok(Some(column)) = self.discriminator(model) else {
            return model;
        };
        let Some(FilterValue::String(value)) = row.get(&column) else {
            return model;
        };
        self.models
            .values()
            .find(|meta| meta.matches_discriminator(value) && self.is_a(&meta.name, model))
            .map_or(model, |meta| meta.name.as_str())
    }
}
