//! The unit-of-work intent buffer.

use crate::document::{EntityKey, EntityRef};
use std::collections::{HashMap, HashSet};

/// A buffered commit intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Insert a freshly identified entity.
    Create,
    /// Re-write the full projected state of an existing entity.
    Update,
    /// Delete the entity's document.
    Delete,
}

/// Buffers commit intents keyed by entity identity until a flush
/// drains them.
///
/// Scheduling the same entity twice overwrites the pending intent;
/// the draining order is unspecified. During a flush the buffer also
/// tracks which (identity, intent) pairs have already been committed,
/// so cascade cycles cannot re-commit an entity.
#[derive(Default)]
pub struct UnitOfWork {
    pending: HashMap<EntityKey, (EntityRef, Intent)>,
    committed: HashSet<(EntityKey, Intent)>,
}

impl UnitOfWork {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an intent for an entity, replacing any pending one.
    pub fn schedule(&mut self, entity: EntityRef, intent: Intent) {
        self.pending.insert(entity.key(), (entity, intent));
    }

    /// Removes and returns any one pending entry.
    pub fn pop(&mut self) -> Option<(EntityRef, Intent)> {
        let key = *self.pending.keys().next()?;
        self.pending.remove(&key)
    }

    /// Returns the number of pending intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Starts a new flush, forgetting the previous committed set.
    pub fn begin_flush(&mut self) {
        self.committed.clear();
    }

    /// Marks an (identity, intent) pair as committed in this flush.
    pub fn mark_committed(&mut self, key: EntityKey, intent: Intent) {
        self.committed.insert((key, intent));
    }

    /// Returns true if the pair was already committed in this flush.
    #[must_use]
    pub fn was_committed(&self, key: EntityKey, intent: Intent) -> bool {
        self.committed.contains(&(key, intent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, FieldDecl};
    use crate::mapping;
    use docbind_driver::ObjectId;

    #[derive(Default)]
    struct Thing {
        id: ObjectId,
    }

    impl Document for Thing {
        fn mapping() -> Vec<FieldDecl> {
            mapping! { Thing {
                id: id, "_id", "";
            }}
        }
    }

    #[test]
    fn schedule_dedupes_by_identity() {
        let mut uow = UnitOfWork::new();
        let entity = EntityRef::new(Thing::default());

        uow.schedule(entity.clone(), Intent::Create);
        uow.schedule(entity.clone(), Intent::Update);
        assert_eq!(uow.len(), 1);

        let (_, intent) = uow.pop().unwrap();
        assert_eq!(intent, Intent::Update);
        assert!(uow.is_empty());
    }

    #[test]
    fn delete_overwrites_pending_create() {
        let mut uow = UnitOfWork::new();
        let entity = EntityRef::new(Thing::default());

        uow.schedule(entity.clone(), Intent::Create);
        uow.schedule(entity.clone(), Intent::Delete);

        let (_, intent) = uow.pop().unwrap();
        assert_eq!(intent, Intent::Delete);
    }

    #[test]
    fn distinct_entities_keep_distinct_entries() {
        let mut uow = UnitOfWork::new();
        uow.schedule(EntityRef::new(Thing::default()), Intent::Create);
        uow.schedule(EntityRef::new(Thing::default()), Intent::Create);
        assert_eq!(uow.len(), 2);
    }

    #[test]
    fn committed_set_tracks_per_intent() {
        let mut uow = UnitOfWork::new();
        let entity = EntityRef::new(Thing::default());
        let key = entity.key();

        uow.begin_flush();
        uow.mark_committed(key, Intent::Create);
        assert!(uow.was_committed(key, Intent::Create));
        assert!(!uow.was_committed(key, Intent::Delete));

        uow.begin_flush();
        assert!(!uow.was_committed(key, Intent::Create));
    }

    #[test]
    fn pop_drains_to_empty() {
        let mut uow = UnitOfWork::new();
        for _ in 0..5 {
            uow.schedule(EntityRef::new(Thing::default()), Intent::Create);
        }
        let mut drained = 0;
        while uow.pop().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 5);
    }
}
