//! Driver trait definitions.

use crate::error::DriverResult;
use crate::id::ObjectId;
use crate::index::IndexSpec;
use crate::query::{Projection, Query};
use crate::record::Record;

/// Outcome of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeInfo {
    /// Number of existing documents updated (0 or 1 for an upsert by id).
    pub matched: usize,
    /// The identifier of the newly inserted document, if one was created.
    pub upserted: Option<ObjectId>,
}

/// A handle to one named collection of a document store.
///
/// Collections are **flat bags of records** keyed by [`ObjectId`]. The
/// driver does not understand entities, relations or cascades; all
/// mapping intelligence lives above it in `docbind_core`.
///
/// # Invariants
///
/// - `upsert_id` merges the given record into the document with that id,
///   creating it when absent (`$set` semantics)
/// - `remove_id` of an absent document returns the `NotFound` sentinel
/// - `find` of no matches returns an empty vector, never an error
pub trait DriverCollection: Send + Sync {
    /// Finds the records matching a query.
    ///
    /// When a projection is given, returned records are restricted to
    /// the projected keys (plus `_id`).
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. No matches is `Ok(vec![])`.
    fn find(&self, query: &Query, projection: Option<&Projection>) -> DriverResult<Vec<Record>>;

    /// Finds a single record matching a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. No match is `Ok(None)`.
    fn find_one(&self, query: &Query) -> DriverResult<Option<Record>>;

    /// Finds a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. No match is `Ok(None)`.
    fn find_id(&self, id: ObjectId) -> DriverResult<Option<Record>>;

    /// Merges a record into the document with the given identifier,
    /// creating it when absent.
    ///
    /// The record is the `$set` payload and must not contain `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    fn upsert_id(&self, id: ObjectId, set: &Record) -> DriverResult<ChangeInfo>;

    /// Deletes the document with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DriverError::NotFound`] when no such document
    /// exists, or another error if the store fails.
    fn remove_id(&self, id: ObjectId) -> DriverResult<()>;

    /// Ensures an index exists on this collection.
    ///
    /// Ensuring the same index twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    fn ensure_index(&self, index: &IndexSpec) -> DriverResult<()>;
}

/// A document store exposing named collections.
///
/// # Implementors
///
/// - [`crate::MemoryDriver`] - in-memory store for tests
pub trait Driver: Send + Sync {
    /// Returns a handle to the named collection, creating it lazily.
    fn collection(&self, name: &str) -> Box<dyn DriverCollection>;
}
