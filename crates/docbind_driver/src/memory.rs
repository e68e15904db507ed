//! In-memory driver for testing.

use crate::driver::{ChangeInfo, Driver, DriverCollection};
use crate::error::{DriverError, DriverResult};
use crate::id::ObjectId;
use crate::index::IndexSpec;
use crate::query::{Projection, Query};
use crate::record::Record;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A driver call observed by [`MemoryDriver`].
///
/// The operation log lets tests assert on what reached the store, e.g.
/// that a flush issued exactly three upserts or no upsert at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// A `find` or `find_one` on a collection.
    Find {
        /// Collection name.
        collection: String,
    },
    /// A `find_id` on a collection.
    FindId {
        /// Collection name.
        collection: String,
        /// The identifier looked up.
        id: ObjectId,
    },
    /// An `upsert_id` on a collection.
    Upsert {
        /// Collection name.
        collection: String,
        /// The identifier written.
        id: ObjectId,
    },
    /// A `remove_id` on a collection.
    Remove {
        /// Collection name.
        collection: String,
        /// The identifier deleted.
        id: ObjectId,
    },
    /// An `ensure_index` on a collection.
    EnsureIndex {
        /// Collection name.
        collection: String,
        /// The requested index.
        index: IndexSpec,
    },
}

#[derive(Default)]
struct CollectionData {
    records: BTreeMap<ObjectId, Record>,
    indexes: Vec<IndexSpec>,
}

#[derive(Default)]
struct DriverInner {
    collections: RwLock<BTreeMap<String, CollectionData>>,
    ops: RwLock<Vec<Op>>,
}

/// An in-memory document store.
///
/// Suitable for unit and integration tests. Collections are created
/// lazily on first access; every driver call is appended to an
/// inspectable operation log.
///
/// # Example
///
/// ```
/// use docbind_driver::{Driver, MemoryDriver, ObjectId, Record};
///
/// let driver = MemoryDriver::new();
/// let users = driver.collection("users");
///
/// let id = ObjectId::new();
/// let mut set = Record::new();
/// set.set("name", "Alice");
/// users.upsert_id(id, &set).unwrap();
///
/// assert_eq!(driver.upsert_count("users"), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryDriver {
    inner: Arc<DriverInner>,
}

impl MemoryDriver {
    /// Creates an empty in-memory driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the operation log.
    #[must_use]
    pub fn ops(&self) -> Vec<Op> {
        self.inner.ops.read().clone()
    }

    /// Clears the operation log, keeping stored data.
    pub fn clear_ops(&self) {
        self.inner.ops.write().clear();
    }

    /// Counts the upserts observed on a collection.
    #[must_use]
    pub fn upsert_count(&self, collection: &str) -> usize {
        self.inner
            .ops
            .read()
            .iter()
            .filter(|op| matches!(op, Op::Upsert { collection: c, .. } if c == collection))
            .count()
    }

    /// Counts the removes observed on a collection.
    #[must_use]
    pub fn remove_count(&self, collection: &str) -> usize {
        self.inner
            .ops
            .read()
            .iter()
            .filter(|op| matches!(op, Op::Remove { collection: c, .. } if c == collection))
            .count()
    }

    /// Returns a stored record by collection and identifier.
    #[must_use]
    pub fn record(&self, collection: &str, id: ObjectId) -> Option<Record> {
        self.inner
            .collections
            .read()
            .get(collection)
            .and_then(|data| data.records.get(&id).cloned())
    }

    /// Returns the number of documents in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .get(collection)
            .map_or(0, |data| data.records.len())
    }

    /// Returns true if the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Returns the indexes ensured on a collection.
    #[must_use]
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.inner
            .collections
            .read()
            .get(collection)
            .map_or_else(Vec::new, |data| data.indexes.clone())
    }

    fn log(&self, op: Op) {
        self.inner.ops.write().push(op);
    }
}

impl Driver for MemoryDriver {
    fn collection(&self, name: &str) -> Box<dyn DriverCollection> {
        Box::new(MemoryCollection {
            name: name.to_string(),
            driver: self.clone(),
        })
    }
}

struct MemoryCollection {
    name: String,
    driver: MemoryDriver,
}

impl DriverCollection for MemoryCollection {
    fn find(&self, query: &Query, projection: Option<&Projection>) -> DriverResult<Vec<Record>> {
        self.driver.log(Op::Find {
            collection: self.name.clone(),
        });
        let collections = self.driver.inner.collections.read();
        let Some(data) = collections.get(&self.name) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for record in data.records.values() {
            if query.matches(record) {
                out.push(match projection {
                    Some(projection) => projection.apply(record),
                    None => record.clone(),
                });
            }
        }
        Ok(out)
    }

    fn find_one(&self, query: &Query) -> DriverResult<Option<Record>> {
        self.driver.log(Op::Find {
            collection: self.name.clone(),
        });
        let collections = self.driver.inner.collections.read();
        let Some(data) = collections.get(&self.name) else {
            return Ok(None);
        };
        Ok(data.records.values().find(|r| query.matches(r)).cloned())
    }

    fn find_id(&self, id: ObjectId) -> DriverResult<Option<Record>> {
        self.driver.log(Op::FindId {
            collection: self.name.clone(),
            id,
        });
        let collections = self.driver.inner.collections.read();
        Ok(collections
            .get(&self.name)
            .and_then(|data| data.records.get(&id).cloned()))
    }

    fn upsert_id(&self, id: ObjectId, set: &Record) -> DriverResult<ChangeInfo> {
        self.driver.log(Op::Upsert {
            collection: self.name.clone(),
            id,
        });
        let mut collections = self.driver.inner.collections.write();
        let data = collections.entry(self.name.clone()).or_default();
        match data.records.get_mut(&id) {
            Some(existing) => {
                existing.merge(set);
                Ok(ChangeInfo {
                    matched: 1,
                    upserted: None,
                })
            }
            None => {
                let mut fresh = Record::new();
                fresh.set("_id", id);
                fresh.merge(set);
                data.records.insert(id, fresh);
                Ok(ChangeInfo {
                    matched: 0,
                    upserted: Some(id),
                })
            }
        }
    }

    fn remove_id(&self, id: ObjectId) -> DriverResult<()> {
        self.driver.log(Op::Remove {
            collection: self.name.clone(),
            id,
        });
        let mut collections = self.driver.inner.collections.write();
        let data = collections.entry(self.name.clone()).or_default();
        match data.records.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DriverError::NotFound),
        }
    }

    fn ensure_index(&self, index: &IndexSpec) -> DriverResult<()> {
        self.driver.log(Op::EnsureIndex {
            collection: self.name.clone(),
            index: index.clone(),
        });
        let mut collections = self.driver.inner.collections.write();
        let data = collections.entry(self.name.clone()).or_default();
        if !data.indexes.contains(index) {
            data.indexes.push(index.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use crate::value::Value;

    fn driver_and_collection() -> (MemoryDriver, Box<dyn DriverCollection>) {
        let driver = MemoryDriver::new();
        let collection = driver.collection("users");
        (driver, collection)
    }

    #[test]
    fn upsert_creates_then_merges() {
        let (driver, users) = driver_and_collection();
        let id = ObjectId::new();

        let mut set = Record::new();
        set.set("name", "Alice");
        let info = users.upsert_id(id, &set).unwrap();
        assert_eq!(info.upserted, Some(id));
        assert_eq!(info.matched, 0);

        let mut set = Record::new();
        set.set("age", 30i64);
        let info = users.upsert_id(id, &set).unwrap();
        assert_eq!(info.matched, 1);
        assert!(info.upserted.is_none());

        let stored = driver.record("users", id).unwrap();
        assert_eq!(stored.get("name"), Some(&Value::Text("Alice".into())));
        assert_eq!(stored.get("age"), Some(&Value::Int(30)));
        assert_eq!(stored.id(), Some(id));
    }

    #[test]
    fn find_id_and_missing() {
        let (_, users) = driver_and_collection();
        let id = ObjectId::new();
        assert!(users.find_id(id).unwrap().is_none());

        users.upsert_id(id, &Record::new()).unwrap();
        assert_eq!(users.find_id(id).unwrap().unwrap().id(), Some(id));
    }

    #[test]
    fn find_filters_and_projects() {
        let (_, users) = driver_and_collection();
        for (name, age) in [("Alice", 30i64), ("Bob", 25), ("Carol", 30)] {
            let mut set = Record::new();
            set.set("name", name);
            set.set("age", age);
            users.upsert_id(ObjectId::new(), &set).unwrap();
        }

        let thirty = users
            .find(
                &Query::new().filter("age", Filter::Eq(Value::Int(30))),
                Some(&Projection::keys(["name"])),
            )
            .unwrap();
        assert_eq!(thirty.len(), 2);
        for record in &thirty {
            assert!(record.contains("_id"));
            assert!(record.contains("name"));
            assert!(!record.contains("age"));
        }
    }

    #[test]
    fn find_no_match_is_empty() {
        let (_, users) = driver_and_collection();
        let result = users
            .find(&Query::new().eq("name", "nobody"), None)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn remove_missing_is_not_found() {
        let (_, users) = driver_and_collection();
        let err = users.remove_id(ObjectId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn remove_deletes() {
        let (driver, users) = driver_and_collection();
        let id = ObjectId::new();
        users.upsert_id(id, &Record::new()).unwrap();
        users.remove_id(id).unwrap();
        assert!(driver.is_empty("users"));
    }

    #[test]
    fn ensure_index_dedupes() {
        let (driver, users) = driver_and_collection();
        let index = IndexSpec::on("email", true);
        users.ensure_index(&index).unwrap();
        users.ensure_index(&index).unwrap();
        assert_eq!(driver.indexes("users"), vec![index]);
    }

    #[test]
    fn ops_are_recorded() {
        let (driver, users) = driver_and_collection();
        let id = ObjectId::new();
        users.upsert_id(id, &Record::new()).unwrap();
        users.remove_id(id).unwrap();

        assert_eq!(driver.upsert_count("users"), 1);
        assert_eq!(driver.remove_count("users"), 1);

        driver.clear_ops();
        assert!(driver.ops().is_empty());
    }

    #[test]
    fn collections_are_independent() {
        let driver = MemoryDriver::new();
        let users = driver.collection("users");
        let books = driver.collection("books");

        users.upsert_id(ObjectId::new(), &Record::new()).unwrap();
        books.upsert_id(ObjectId::new(), &Record::new()).unwrap();

        assert_eq!(driver.len("users"), 1);
        assert_eq!(driver.len("books"), 1);
        assert_eq!(driver.upsert_count("users"), 1);
        assert_eq!(driver.upsert_count("books"), 1);
    }
}
