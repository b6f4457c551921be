//! # prax-preload
//!
//! Selective-column relation preloading for the Prax ORM.
//!
//! Loading an association graph eagerly normally fetches every column of
//! every related row. This crate lets a caller name the columns it wants
//! (or the ones it does not) per relation, at any depth, while keeping the
//! load N+1 safe: one batched query per relation per nesting level,
//! whatever the number of parent records.
//!
//! - `with_columns` / `without_columns` on [`FindManyOperation`]
//! - Whitelist or blacklist per relation, with nested relations
//! - Primary, foreign and discriminator keys are always fetched
//! - Relation scopes (filter and ordering) applied to every batch
//! - Single-table inheritance: mixed-model batches load per concrete model
//! - A model catalog built in code or from `prax-preload.toml`
//!
//! ## Column specs
//!
//! ```rust
//! use prax_preload::{ColumnSpec, ColumnSpecs};
//!
//! // comments: body only; each comment's author: name only
//! let specs = ColumnSpecs::new().relation(
//!     "comments",
//!     ColumnSpec::columns(["body"]).include("author", ["name"]),
//! );
//! assert_eq!(specs.names().collect::<Vec<_>>(), vec!["comments"]);
//!
//! // The same spec from JSON
//! let json = ColumnSpecs::from_json_str(
//!     r#"{"comments": {"columns": ["body"], "include": {"author": ["name"]}}}"#,
//! )
//! .unwrap();
//! assert_eq!(json, specs);
//! ```
//!
//! ## Loading
//!
//! ```rust
//! use prax_preload::{
//!     Catalog, ColumnSpecs, MemoryEngine, ModelMeta, QueryBuilder, RelationSpec, row,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> prax_preload::QueryResult<()> {
//! let catalog = Catalog::new()
//!     .with(
//!         ModelMeta::new("Post", "posts")
//!             .columns(["id", "title"])
//!             .relation(RelationSpec::one_to_many("comments", "Comment")),
//!     )
//!     .with(ModelMeta::new("Comment", "comments").columns(["id", "post_id", "body", "ip"]));
//!
//! let engine = MemoryEngine::new()
//!     .with_table("posts", ["id", "title"])
//!     .with_table("comments", ["id", "post_id", "body", "ip"]);
//! engine.insert("posts", row! {"id" => 1, "title" => "Hello"})?;
//! engine.insert("comments", row! {"id" => 1, "post_id" => 1, "body" => "Hi", "ip" => "10.0.0.1"})?;
//!
//! let client = QueryBuilder::new(engine, catalog);
//! let posts = client
//!     .find_many("Post")
//!     .without_columns(ColumnSpecs::new().relation("comments", ["ip"]))?
//!     .exec()
//!     .await?;
//!
//! let comment = &posts[0].many("comments")[0];
//! assert_eq!(comment.field_names().collect::<Vec<_>>(), vec!["id", "post_id", "body"]);
//! assert_eq!(client.engine().query_count(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use prax_preload::{Catalog, ErrorCode, MemoryEngine, ModelMeta, QueryBuilder, ColumnSpecs};
//!
//! let catalog = Catalog::new().with(ModelMeta::new("User", "users"));
//! let client = QueryBuilder::new(MemoryEngine::new(), catalog);
//! let err = client
//!     .find_many("User")
//!     .with_columns(ColumnSpecs::new().relation("posts", ["title"]))
//!     .err()
//!     .unwrap();
//! assert_eq!(err.code, ErrorCode::UnknownRelation);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
#[macro_use]
pub mod macros;
pub mod memory;
pub mod operations;
pub mod pagination;
pub mod query;
pub mod record;
pub mod relations;
pub mod sql;
pub mod traits;
pub mod types;

pub use catalog::{Catalog, ModelMeta};
pub use config::{DebugConfig, ModelConfig, PreloadConfig, RelationConfig, ScopeConfig};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{Filter, FilterValue, ValueKey};
pub use memory::MemoryEngine;
pub use operations::FindManyOperation;
pub use pagination::Pagination;
pub use query::QueryBuilder;
pub use record::{Loaded, Record, Row};
pub use relations::{
    Association, Batch, BatchLoader, ColumnInclude, ColumnIncludes, ColumnResolver, ColumnSelector,
    ColumnSpec, ColumnSpecs, IncludeSpec, NestedSpec, Preloader, RelationRegistry, RelationScope,
    RelationSpec, RelationType, SelectionMode,
};
pub use sql::SelectQuery;
pub use traits::{BoxFuture, QueryEngine};
pub use types::{OrderBy, OrderByField, Select, SortOrder};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::{Catalog, ModelMeta};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::operations::*;
    pub use crate::query::QueryBuilder;
    pub use crate::record::{Record, Row};
    pub use crate::relations::{ColumnSpec, ColumnSpecs, IncludeSpec, RelationScope, RelationSpec};
    pub use crate::traits::QueryEngine;
    pub use crate::types::{OrderBy, OrderByField, Select, SortOrder};
    pub use crate::row;
}
