//! Relation specification types.
//!
//! A [`RelationSpec`] is what a model declares; keys it leaves out are
//! inferred by the catalog, which hands out fully resolved [`Association`]s.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::types::{OrderBy, OrderByField};

/// Type of relation between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// One-to-one relation (e.g., User has one Profile).
    OneToOne,
    /// One-to-many relation (e.g., User has many Posts).
    OneToMany,
    /// Many-to-one relation (e.g., Post belongs to User).
    ManyToOne,
}

impl RelationType {
    /// Check if this relation returns multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany)
    }

    /// Check if this relation returns a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Check if the foreign key column lives on the related table.
    pub fn key_on_target(&self) -> bool {
        matches!(self, Self::OneToMany | Self::OneToOne)
    }
}

/// Filter and ordering always applied when loading a relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationScope {
    /// Predicate layered onto the key filter.
    pub filter: Filter,
    /// Ordering of the related rows.
    pub order_by: OrderBy,
}

impl RelationScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; repeated calls are combined with AND.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter.into());
        self
    }

    /// Append an ordering field.
    pub fn order_by(mut self, field: OrderByField) -> Self {
        self.order_by = std::mem::take(&mut self.order_by).then(field);
        self
    }

    /// Check if the scope neither filters nor orders.
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.order_by.is_empty()
    }
}

/// Specification for a relation as declared on a model.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
    /// Name of the relation (field name).
    pub name: String,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Name of the related model.
    pub related_model: String,
    /// Key column on the declaring model's table (inferred when `None`).
    pub source_key: Option<String>,
    /// Key column on the related model's table (inferred when `None`).
    pub target_key: Option<String>,
    /// Scope applied whenever the relation is loaded.
    pub scope: Option<RelationScope>,
}

impl RelationSpec {
    fn new(
        name: impl Into<String>,
        relation_type: RelationType,
        related_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type,
            related_model: related_model.into(),
            source_key: None,
            target_key: None,
            scope: None,
        }
    }

    /// Create a one-to-one relation spec.
    pub fn one_to_one(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        Self::new(name, RelationType::OneToOne, related_model)
    }

    /// Create a one-to-many relation spec.
    pub fn one_to_many(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        Self::new(name, RelationType::OneToMany, related_model)
    }

    /// Create a many-to-one relation spec.
    pub fn many_to_one(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        Self::new(name, RelationType::ManyToOne, related_model)
    }

    /// Set the key column on the declaring model's table.
    pub fn source_key(mut self, column: impl Into<String>) -> Self {
        self.source_key = Some(column.into());
        self
    }

    /// Set the key column on the related model's table.
    pub fn target_key(mut self, column: impl Into<String>) -> Self {
        self.target_key = Some(column.into());
        self
    }

    /// Set the foreign key column, on whichever side it lives for this relation type.
    pub fn foreign_key(self, column: impl Into<String>) -> Self {
        if self.relation_type.key_on_target() {
            self.target_key(column)
        } else {
            self.source_key(column)
        }
    }

    /// Attach a scope.
    pub fn scope(mut self, scope: RelationScope) -> Self {
        self.scope = (!scope.is_empty()).then_some(scope);
        self
    }
}

/// A relation with every key resolved, as consumed by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// Name of the relation.
    pub name: String,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Concrete model the relation was looked up on.
    pub owner_model: String,
    /// Name of the related model.
    pub related_model: String,
    /// Table of the related model.
    pub related_table: String,
    /// Primary key of the related model.
    pub related_primary_key: String,
    /// Key column read from parent records.
    pub source_key: String,
    /// Key column filtered on, and grouped by, in the related table.
    pub target_key: String,
    /// Scope applied to the batch query.
    pub scope: Option<RelationScope>,
}

impl Association {
    /// The foreign key column of this relation.
    pub fn foreign_key(&self) -> &str {
        if self.relation_type.key_on_target() {
            &self.target_key
        } else {
            &self.source_key
        }
    }

    /// The foreign key column when it lives on the related table.
    pub fn target_foreign_key(&self) -> Option<&str> {
        self.relation_type
            .key_on_target()
            .then_some(self.target_key.as_str())
    }
}

/// Registry of relation specifications for a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationRegistry {
    relations: IndexMap<String, RelationSpec>,
}

impl RelationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation, replacing any previous one with the same name.
    pub fn register(&mut self, spec: RelationSpec) {
        self.relations.insert(spec.name.clone(), spec);
    }

    /// Get a relation by name.
    pub fn get(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// Get all relations, in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &RelationSpec> {
        self.relations.values()
    }

    /// Names of all relations, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Check if there are no relations.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
