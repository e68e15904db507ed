//! Process-lifetime registry of compiled entity metadata.

use crate::document::{Document, EntityRef};
use crate::error::{OdmError, OdmResult};
use crate::metadata::annotation;
use crate::metadata::spec::EntitySpec;
use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;

/// Maps registered entity types to their compiled specs, with a
/// reverse lookup by collection name.
///
/// Registration is idempotent per (type, collection) pair. A failed
/// compilation or a collection-name conflict leaves the registry
/// unchanged.
#[derive(Default)]
pub struct MetadataRegistry {
    by_type: HashMap<TypeId, Rc<EntitySpec>>,
    by_collection: HashMap<String, TypeId>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers a document type under a collection name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAnnotation` when the mapping does not compile,
    /// or `CollectionTaken` when the collection name belongs to a
    /// different registered type.
    pub fn register<T: Document>(&mut self, collection: &str) -> OdmResult<()> {
        let type_id = TypeId::of::<T>();
        if let Some(&owner) = self.by_collection.get(collection) {
            if owner == type_id {
                return Ok(());
            }
            return Err(OdmError::collection_taken(collection));
        }

        let spec = Rc::new(annotation::compile::<T>(collection)?);
        // Re-registering a type under a new name releases the old one.
        if let Some(previous) = self.by_type.insert(type_id, spec) {
            self.by_collection.remove(&previous.collection);
        }
        self.by_collection.insert(collection.to_string(), type_id);
        Ok(())
    }

    /// Looks up the spec for a type token.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types.
    pub fn get(&self, type_id: TypeId) -> OdmResult<Rc<EntitySpec>> {
        self.by_type
            .get(&type_id)
            .cloned()
            .ok_or(OdmError::DocumentNotRegistered)
    }

    /// Looks up the spec for a live entity.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for entities of unknown types.
    pub fn spec_for(&self, entity: &EntityRef) -> OdmResult<Rc<EntitySpec>> {
        self.get(entity.entity_type())
    }

    /// Looks up the spec registered under a collection name.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown collections.
    pub fn by_collection(&self, name: &str) -> OdmResult<Rc<EntitySpec>> {
        let type_id = self
            .by_collection
            .get(name)
            .ok_or(OdmError::DocumentNotRegistered)?;
        self.get(*type_id)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
