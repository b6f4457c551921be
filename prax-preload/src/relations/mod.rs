//! Relation loading with per-relation column selection.
//!
//! This module provides the pieces of a selective preload:
//! - `ColumnSpec` / `ColumnInclude` for describing which relations and columns to load
//! - `ColumnResolver` for turning a selection into the columns of a batch query
//! - `BatchLoader` and the assign functions for one association level
//! - `Preloader` for walking a nested spec level by level
//!
//! ## Example
//!
//! ```rust,ignore
//! // Load posts, their comments (body only) and each comment's author (name only)
//! let posts = client
//!     .find_many("Post")
//!     .with_columns(ColumnSpecs::new().relation(
//!         "comments",
//!         ColumnSpec::columns(["body"]).include("author", ["name"]),
//!     ))?
//!     .exec()
//!     .await?;
//! ```

mod assign;
mod include;
mod loader;
mod preload;
mod select;
mod spec;

pub use assign::{assign, assign_one};
pub use include::{ColumnInclude, ColumnIncludes, ColumnSpec, ColumnSpecs, IncludeSpec, NestedSpec};
pub use loader::{Batch, BatchLoader, collect_keys};
pub use preload::Preloader;
pub use select::{ColumnResolver, ColumnSelector, SelectionMode};
pub use spec::{Association, RelationRegistry, RelationScope, RelationSpec, RelationType};
