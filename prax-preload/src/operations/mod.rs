//! Query operations for the fluent API.
//!
//! - `FindManyOperation` - Find multiple records and preload their relations

mod find_many;

pub use find_many::FindManyOperation;
