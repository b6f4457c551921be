//! Configuration file parsing for `prax-preload.toml`.
//!
//! The file carries debug flags and the model catalog:
//!
//! ```toml
//! [debug]
//! log_queries = true
//!
//! [models.User]
//! table = "users"
//! columns = ["id", "name", "email"]
//!
//! [models.User.relations.posts]
//! kind = "one_to_many"
//! model = "Post"
//! target_key = "author_id"
//! scope = { where = { published = true }, order_by = [{ column = "id", order = "desc" }] }
//!
//! [models.Admin]
//! extends = "User"
//! ```
//!
//! `${VAR}` references are replaced with environment values before parsing.

use std::path::Path;

use indexmap::IndexMap;
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ModelMeta};
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::relations::{RelationRegistry, RelationScope, RelationSpec, RelationType};
use crate::types::{OrderByField, SortOrder};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreloadConfig {
    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Model catalog, keyed by model name.
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
}

impl PreloadConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("cannot read {}: {}", path.display(), e))
                .with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content)?;

        toml::from_str(&expanded)
            .map_err(|e| QueryError::configuration(e.to_string()).with_source(e))
    }

    /// Build the model catalog.
    ///
    /// Fails if a model extends, or a relation targets, a model that is not
    /// configured.
    pub fn catalog(&self) -> QueryResult<Catalog> {
        let mut catalog = Catalog::new();
        for (name, model) in &self.models {
            if let Some(parent) = &model.extends {
                if !self.models.contains_key(parent) {
                    return Err(QueryError::configuration(format!(
                        "model {} extends unknown model {}",
                        name, parent
                    ))
                    .with_model(name));
                }
            }
            for (relation, config) in &model.relations {
                if !self.models.contains_key(&config.model) {
                    return Err(QueryError::configuration(format!(
                        "relation {}.{} targets unknown model {}",
                        name, relation, config.model
                    ))
                    .with_model(name)
                    .with_field(relation));
                }
            }
            catalog.register(model.to_meta(name));
        }
        Ok(catalog)
    }
}

/// Debug and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log the SQL of every root query.
    #[serde(default)]
    pub log_queries: bool,

    /// Slow load threshold in milliseconds.
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            slow_query_threshold: default_slow_query_threshold(),
        }
    }
}

fn default_slow_query_threshold() -> u64 {
    1000
}

/// A model entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Table name; inherited, or derived from the model name, when absent.
    pub table: Option<String>,

    /// Primary key column.
    pub primary_key: Option<String>,

    /// Columns declared by this model.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Parent model (single-table inheritance).
    pub extends: Option<String>,

    /// Column naming the concrete model of a row.
    pub discriminator: Option<String>,

    /// Discriminator value selecting this model.
    pub discriminator_value: Option<String>,

    /// Relations, keyed by name.
    #[serde(default)]
    pub relations: IndexMap<String, RelationConfig>,
}

impl ModelConfig {
    fn to_meta(&self, name: &str) -> ModelMeta {
        let mut meta = ModelMeta {
            name: name.to_string(),
            table: self.table.clone(),
            primary_key: self.primary_key.clone(),
            columns: self.columns.clone(),
            relations: RelationRegistry::new(),
            extends: self.extends.clone(),
            discriminator: self.discriminator.clone(),
            discriminator_value: self.discriminator_value.clone(),
        };

        for (relation, config) in &self.relations {
            meta = meta.relation(config.to_spec(relation));
        }
        meta
    }
}

/// A relation entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelationConfig {
    /// Relation kind.
    pub kind: RelationType,

    /// Related model.
    pub model: String,

    /// Key column on the declaring model's table.
    pub source_key: Option<String>,

    /// Key column on the related model's table.
    pub target_key: Option<String>,

    /// Filter and ordering applied on every load.
    pub scope: Option<ScopeConfig>,
}

impl RelationConfig {
    fn to_spec(&self, name: &str) -> RelationSpec {
        let mut spec = RelationSpec {
            name: name.to_string(),
            relation_type: self.kind,
            related_model: self.model.clone(),
            source_key: self.source_key.clone(),
            target_key: self.target_key.clone(),
            scope: None,
        };
        if let Some(scope) = &self.scope {
            spec = spec.scope(scope.to_scope());
        }
        spec
    }
}

/// A relation scope entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    /// Column equalities, combined with AND.
    #[serde(default, rename = "where")]
    pub filter: IndexMap<String, FilterValue>,

    /// Ordering of the related rows.
    #[serde(default)]
    pub order_by: Vec<OrderConfig>,
}

impl ScopeConfig {
    fn to_scope(&self) -> RelationScope {
        let filter = Filter::and(
            self.filter
                .iter()
                .map(|(column, value)| Filter::equals(column.clone(), value.clone())),
        );
        self.order_by.iter().fold(RelationScope::new().r#where(filter), |scope, order| {
            scope.order_by(OrderByField::new(order.column.clone(), order.order))
        })
    }
}

/// An ordering entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrderConfig {
    /// Column to order by.
    pub column: String,

    /// Sort order.
    #[serde(default)]
    pub order: SortOrder,
}

/// Expand `${VAR}` references from the environment. Unset variables are left as is.
fn expand_env_vars(content: &str) -> QueryResult<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| QueryError::internal(e.to_string()))?;
    let expanded = re.replace_all(content, |caps: &Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    Ok(expanded.into_owned())
}
