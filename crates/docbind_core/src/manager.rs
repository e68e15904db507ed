//! The document manager facade.

use crate::document::{Document, EntityRef, Handle};
use crate::error::OdmResult;
use crate::metadata::MetadataRegistry;
use crate::query::QueryBuilder;
use crate::uow::{Intent, UnitOfWork};
use docbind_driver::{Driver, ObjectId, Query};
use std::any::TypeId;
use tracing::debug;

/// The mapper's public entry point.
///
/// A document manager owns one driver handle, the metadata registry and
/// the unit-of-work. `persist` and `remove` only record intents; nothing
/// reaches the store until [`DocumentManager::flush`]. Every read
/// operation returns its target hydrated by the relation resolver.
///
/// The manager is single-threaded and cooperative: no internal
/// concurrency, no guards around the intent buffer. Use independent
/// managers over independent driver handles for parallel work.
///
/// # Example
///
/// ```ignore
/// let mut manager = DocumentManager::new(Box::new(MemoryDriver::new()));
/// manager.register::<Author>("authors")?;
/// manager.register::<Book>("books")?;
///
/// let author = Rc::new(RefCell::new(Author::default()));
/// manager.persist(&author)?;
/// manager.flush()?;
///
/// let id = author.borrow().id;
/// let found = manager.find_id::<Author>(id)?;
/// ```
pub struct DocumentManager {
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) registry: MetadataRegistry,
    pub(crate) uow: UnitOfWork,
}

impl DocumentManager {
    /// Creates a document manager over a driver handle.
    #[must_use]
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            registry: MetadataRegistry::new(),
            uow: UnitOfWork::new(),
        }
    }

    /// Returns the underlying driver.
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Registers a document type under a collection name.
    ///
    /// Use [`crate::register_many!`] to register several types at once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAnnotation` when the type's mapping does not
    /// compile, or `CollectionTaken` on a collection-name conflict.
    pub fn register<T: Document>(&mut self, collection: &str) -> OdmResult<()> {
        self.registry.register::<T>(collection)?;
        debug!(collection, "registered document type");
        Ok(())
    }

    /// Schedules a save of the entity.
    ///
    /// An entity with a zero identifier is assigned a fresh one and
    /// recorded as a create; otherwise it is recorded as an update.
    /// Nothing is sent to the store until [`DocumentManager::flush`].
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` or `IdFieldNotFound`.
    pub fn persist<T: Document>(&mut self, document: &Handle<T>) -> OdmResult<()> {
        let entity = EntityRef::from_handle(document);
        let spec = self.registry.spec_for(&entity)?;
        if spec.id_of(&entity)?.is_zero() {
            spec.set_id(&entity, ObjectId::new())?;
            self.uow.schedule(entity, Intent::Create);
        } else {
            self.uow.schedule(entity, Intent::Update);
        }
        Ok(())
    }

    /// Schedules a delete of the entity.
    ///
    /// Delete takes priority over any pending create or update of the
    /// same entity. Nothing is sent to the store until
    /// [`DocumentManager::flush`].
    pub fn remove<T: Document>(&mut self, document: &Handle<T>) {
        self.uow
            .schedule(EntityRef::from_handle(document), Intent::Delete);
    }

    /// Drains the intent buffer, committing every pending intent.
    ///
    /// Cascades may enqueue further intents; the loop runs until
    /// quiescence. Draining order is unspecified. Within one flush each
    /// (entity, intent kind) pair is committed at most once.
    ///
    /// # Errors
    ///
    /// Aborts at the first failure, leaving the remaining intents in
    /// the buffer. Partial commits are not rolled back.
    pub fn flush(&mut self) -> OdmResult<()> {
        self.uow.begin_flush();
        while let Some((entity, intent)) = self.uow.pop() {
            let key = entity.key();
            if self.uow.was_committed(key, intent) {
                continue;
            }
            match intent {
                Intent::Delete => self.do_remove(&entity)?,
                Intent::Create | Intent::Update => self.do_persist(&entity)?,
            }
            self.uow.mark_committed(key, intent);
        }
        Ok(())
    }

    /// Finds a document by identifier, fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types, or a driver
    /// error. A missing document is `Ok(None)`.
    pub fn find_id<T: Document>(&self, id: ObjectId) -> OdmResult<Option<Handle<T>>> {
        let spec = self.registry.get(TypeId::of::<T>())?;
        let Some(record) = self.driver.collection(&spec.collection).find_id(id)? else {
            return Ok(None);
        };
        let entity = spec.hydrate(&record);
        self.resolve_refs(std::slice::from_ref(&entity), &[])?;
        Ok(entity.downcast::<T>())
    }

    /// Finds a single document matching a query, fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types, or a driver
    /// error. No match is `Ok(None)`.
    pub fn find_one<T: Document>(&self, query: &Query) -> OdmResult<Option<Handle<T>>> {
        self.fetch_one_resolved(query, &[])
    }

    /// Finds all documents matching a query, fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types, or a driver
    /// error.
    pub fn find_by<T: Document>(&self, query: &Query) -> OdmResult<Vec<Handle<T>>> {
        self.fetch_resolved(query, &[])
    }

    /// Finds every document in the type's collection, fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types, or a driver
    /// error.
    pub fn find_all<T: Document>(&self) -> OdmResult<Vec<Handle<T>>> {
        self.fetch_resolved(&Query::new(), &[])
    }

    /// Resolves relations on already-loaded entities.
    ///
    /// `fields` restricts resolution to the named relation-bearing
    /// fields; empty means all. Lazy relations on the given roots are
    /// resolved; recursion beyond them follows the eager/lazy rules.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered`, `MappedFieldNotFound` or a
    /// driver error.
    pub fn resolve_relations<T: Document>(
        &self,
        documents: &[Handle<T>],
        fields: &[&str],
    ) -> OdmResult<()> {
        let batch: Vec<EntityRef> = documents.iter().map(EntityRef::from_handle).collect();
        self.resolve_refs(&batch, fields)
    }

    /// Starts a composed query against the store.
    #[must_use]
    pub fn create_query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    pub(crate) fn fetch_resolved<T: Document>(
        &self,
        query: &Query,
        fields: &[&str],
    ) -> OdmResult<Vec<Handle<T>>> {
        let spec = self.registry.get(TypeId::of::<T>())?;
        let records = self.driver.collection(&spec.collection).find(query, None)?;
        let batch: Vec<EntityRef> = records.iter().map(|record| spec.hydrate(record)).collect();
        self.resolve_refs(&batch, fields)?;
        batch
            .iter()
            .map(|entity| entity.typed::<T>())
            .collect::<OdmResult<Vec<_>>>()
    }

    pub(crate) fn fetch_one_resolved<T: Document>(
        &self,
        query: &Query,
        fields: &[&str],
    ) -> OdmResult<Option<Handle<T>>> {
        let spec = self.registry.get(TypeId::of::<T>())?;
        let Some(record) = self.driver.collection(&spec.collection).find_one(query)? else {
            return Ok(None);
        };
        let entity = spec.hydrate(&record);
        self.resolve_refs(std::slice::from_ref(&entity), fields)?;
        Ok(entity.downcast::<T>())
    }
}

impl std::fmt::Debug for DocumentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentManager")
            .field("registered_types", &self.registry.len())
            .field("pending_intents", &self.uow.len())
            .finish()
    }
}
