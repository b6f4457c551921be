//! Entity records and their relation slots.
//!
//! A [`Record`] holds exactly the columns its query projected, plus one slot
//! per relation that has been loaded. A relation missing from the slot map is
//! not loaded; a loaded slot never triggers another fetch.
//!
//! ```rust
//! use prax_preload::{FilterValue, Loaded, Record};
//!
//! let mut post = Record::new("Post").with("id", 1).with("author_id", FilterValue::Null);
//! assert!(!post.is_loaded("author"));
//!
//! post.set_relation("author", Loaded::One(None));
//! assert!(post.is_loaded("author"));
//! assert!(post.one("author").is_none());
//! ```

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use smol_str::SmolStr;

use crate::filter::FilterValue;

/// A raw result row: column name to value, in projection order.
pub type Row = IndexMap<String, FilterValue>;

static NULL_VALUE: FilterValue = FilterValue::Null;

/// The value of a loaded relation slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// A single related record, or `None` when absent.
    One(Option<Box<Record>>),
    /// Every related record, possibly none.
    Many(Vec<Record>),
}

impl Loaded {
    /// Number of related records held by this slot.
    pub fn len(&self) -> usize {
        match self {
            Self::One(record) => usize::from(record.is_some()),
            Self::Many(records) => records.len(),
        }
    }

    /// Check if the slot holds no record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live entity record of a concrete model.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: SmolStr,
    fields: Row,
    relations: IndexMap<String, Loaded>,
}

impl Record {
    /// Create an empty record of the given model.
    pub fn new(model: impl Into<SmolStr>) -> Self {
        Self {
            model: model.into(),
            fields: Row::new(),
            relations: IndexMap::new(),
        }
    }

    /// Create a record from a fetched row.
    pub fn from_row(model: impl Into<SmolStr>, row: Row) -> Self {
        Self {
            model: model.into(),
            fields: row,
            relations: IndexMap::new(),
        }
    }

    /// Set a column value, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Name of the concrete model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get a column value if the column was fetched.
    pub fn get(&self, column: &str) -> Option<&FilterValue> {
        self.fields.get(column)
    }

    /// Get a column value, reading unfetched columns as null.
    pub fn value(&self, column: &str) -> &FilterValue {
        self.fields.get(column).unwrap_or(&NULL_VALUE)
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        self.fields.insert(column.into(), value.into());
    }

    /// All fetched columns.
    pub fn fields(&self) -> &Row {
        &self.fields
    }

    /// Names of the fetched columns, in projection order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Check if a relation slot has been loaded.
    pub fn is_loaded(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    /// Get a loaded relation slot.
    pub fn relation(&self, relation: &str) -> Option<&Loaded> {
        self.relations.get(relation)
    }

    /// Get the record held by a loaded single-valued relation.
    pub fn one(&self, relation: &str) -> Option<&Record> {
        match self.relations.get(relation) {
            Some(Loaded::One(record)) => record.as_deref(),
            _ => None,
        }
    }

    /// Get the records held by a loaded collection relation; empty when not loaded.
    pub fn many(&self, relation: &str) -> &[Record] {
        match self.relations.get(relation) {
            Some(Loaded::Many(records)) => records,
            _ => &[],
        }
    }

    /// Fill a relation slot and mark it loaded.
    pub fn set_relation(&mut self, relation: impl Into<String>, value: Loaded) {
        self.relations.insert(relation.into(), value);
    }

    /// Names of the loaded relations.
    pub fn loaded_relations(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Mutable access to every record held by a loaded relation slot.
    pub(crate) fn related_mut(&mut self, relation: &str) -> Vec<&mut Record> {
        match self.relations.get_mut(relation) {
            Some(Loaded::Many(records)) => records.iter_mut().collect(),
            Some(Loaded::One(Some(record))) => vec![record.as_mut()],
            _ => Vec::new(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.relations.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        for (relation, loaded) in &self.relations {
            match loaded {
                Loaded::One(record) => map.serialize_entry(relation, record)?,
                Loaded::Many(records) => map.serialize_entry(relation, records)?,
            }
        }
        map.end()
    }
}
