//! Wiring batch results onto parent records.
//!
//! Every parent gets its slot filled, matched or not, so a loaded relation
//! is never fetched again. A null key, and a key with no match, both yield
//! an empty collection or an absent record.

use super::loader::Batch;
use super::spec::{Association, RelationType};
use crate::record::{Loaded, Record};

/// Fill `parent`'s slot for `association` from `batch`.
pub fn assign_one(parent: &mut Record, association: &Association, batch: &Batch) {
    let key = parent.value(&association.source_key).key();
    let loaded = match association.relation_type {
        RelationType::OneToMany => {
            Loaded::Many(key.map(|k| batch.many(&k).to_vec()).unwrap_or_default())
        }
        RelationType::OneToOne | RelationType::ManyToOne => {
            Loaded::One(key.and_then(|k| batch.first(&k).cloned()).map(Box::new))
        }
    };
    parent.set_relation(association.name.clone(), loaded);
}

/// Fill the slot for `association` on every parent.
pub fn assign<'r>(
    parents: impl IntoIterator<Item = &'r mut Record>,
    association: &Association,
    batch: &Batch,
) {
    for parent in parents {
        assign_one(parent, association, batch);
    }
}
