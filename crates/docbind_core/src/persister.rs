//! The persistence engine: `do_persist` and `do_remove`.
//!
//! Both run inside the flush loop. They ensure indexes, substitute
//! identifier scalars/arrays for owning relations, enqueue cascade
//! intents, and issue the driver upsert or delete.

use crate::document::{Accessor, EntityRef};
use crate::error::{OdmError, OdmResult};
use crate::manager::DocumentManager;
use crate::metadata::{RelationKind, RelationSide};
use crate::projection::project;
use crate::uow::Intent;
use docbind_driver::{DriverError, ObjectId, Value};
use tracing::debug;

impl DocumentManager {
    /// Commits one create/update intent.
    pub(crate) fn do_persist(&mut self, entity: &EntityRef) -> OdmResult<()> {
        let spec = self.registry.spec_for(entity)?;
        let mut record = project(&spec, entity);
        let collection = self.driver.collection(&spec.collection);

        if spec.has_indexed() {
            for index in spec.indexes() {
                collection.ensure_index(&index)?;
            }
        }
        if let Some(composite) = spec.composite_index() {
            collection.ensure_index(&composite)?;
        }

        for (field, relation) in spec.fields_with_relation() {
            if relation.side == RelationSide::Mapped {
                continue;
            }
            let target_spec = self.registry.by_collection(&relation.target_collection).ok();
            match relation.kind {
                RelationKind::Many => {
                    let mut ids = Vec::new();
                    if let (Some(target_spec), Accessor::Many { get, .. }) =
                        (&target_spec, field.accessor)
                    {
                        for related in get(entity) {
                            let Ok(mut id) = target_spec.id_of(&related) else {
                                continue;
                            };
                            if id.is_zero() {
                                id = ObjectId::new();
                                target_spec.set_id(&related, id)?;
                            }
                            ids.push(id);
                            if relation.cascade.includes_persist() {
                                self.uow.schedule(related, Intent::Create);
                            }
                        }
                    }
                    record.set(field.key.clone(), Value::from(ids));
                }
                RelationKind::One => {
                    if let (Some(target_spec), Accessor::One { get, .. }) =
                        (&target_spec, field.accessor)
                    {
                        if let Some(related) = get(entity) {
                            let Ok(mut id) = target_spec.id_of(&related) else {
                                continue;
                            };
                            if id.is_zero() {
                                id = ObjectId::new();
                                target_spec.set_id(&related, id)?;
                            }
                            record.set(field.key.clone(), id);
                            if relation.cascade.includes_persist() {
                                self.uow.schedule(related, Intent::Create);
                            }
                        }
                    }
                }
            }
        }

        let id = record.id().ok_or(OdmError::IdFieldNotFound)?;
        let mut set = record;
        set.remove("_id");
        collection.upsert_id(id, &set)?;
        debug!(collection = %spec.collection, %id, "persisted document");
        Ok(())
    }

    /// Commits one delete intent.
    pub(crate) fn do_remove(&mut self, entity: &EntityRef) -> OdmResult<()> {
        let spec = self.registry.spec_for(entity)?;
        let record = project(&spec, entity);

        for (field, relation) in spec.fields_with_relation() {
            if relation.side == RelationSide::Mapped || !relation.cascade.includes_remove() {
                continue;
            }
            let Ok(target_spec) = self.registry.by_collection(&relation.target_collection) else {
                continue;
            };
            match (field.accessor, relation.kind) {
                (Accessor::Many { get, .. }, RelationKind::Many) => {
                    for related in get(entity) {
                        if matches!(target_spec.id_of(&related), Ok(id) if !id.is_zero()) {
                            self.uow.schedule(related, Intent::Delete);
                        }
                    }
                }
                (Accessor::One { get, .. }, RelationKind::One) => {
                    if let Some(related) = get(entity) {
                        if matches!(target_spec.id_of(&related), Ok(id) if !id.is_zero()) {
                            self.uow.schedule(related, Intent::Delete);
                        }
                    }
                }
                _ => {}
            }
        }

        let id = record.id().ok_or(OdmError::IdFieldNotFound)?;
        let collection = self.driver.collection(&spec.collection);
        // Deleting a document that never reached the store is fine: a
        // delete can win over a pending create within the same flush.
        match collection.remove_id(id) {
            Ok(()) | Err(DriverError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }
        spec.set_id(entity, ObjectId::zero())?;
        debug!(collection = %spec.collection, %id, "removed document");
        Ok(())
    }
}
