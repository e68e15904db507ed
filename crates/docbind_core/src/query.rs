//! Composed queries against the store.

use crate::document::{Document, Handle};
use crate::error::OdmResult;
use crate::manager::DocumentManager;
use docbind_driver::{Filter, Query, Value};

/// A composed query built from [`DocumentManager::create_query`].
///
/// Conditions delegate to the driver unchanged; results go through the
/// same post-fetch relation resolution as every other read.
///
/// # Example
///
/// ```ignore
/// let adults: Vec<Handle<User>> = manager
///     .create_query()
///     .eq("country", "fr")
///     .all()?;
/// ```
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    manager: &'a DocumentManager,
    query: Query,
    fields: Vec<String>,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(manager: &'a DocumentManager) -> Self {
        Self {
            manager,
            query: Query::new(),
            fields: Vec::new(),
        }
    }

    /// Adds a condition on a stored key.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, filter: Filter) -> Self {
        self.query = self.query.filter(key, filter);
        self
    }

    /// Shorthand for an equality condition.
    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query = self.query.eq(key, value);
        self
    }

    /// Restricts relation resolution to the named fields.
    ///
    /// Empty (the default) resolves all relation-bearing fields.
    #[must_use]
    pub fn resolve_only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the query, returning all matches fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types, or a driver
    /// error.
    pub fn all<T: Document>(self) -> OdmResult<Vec<Handle<T>>> {
        let fields: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        self.manager.fetch_resolved(&self.query, &fields)
    }

    /// Runs the query, returning one match fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotRegistered` for unknown types, or a driver
    /// error. No match is `Ok(None)`.
    pub fn one<T: Document>(self) -> OdmResult<Option<Handle<T>>> {
        let fields: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        self.manager.fetch_one_resolved(&self.query, &fields)
    }
}
