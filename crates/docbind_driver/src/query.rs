//! Query primitives.

use crate::record::Record;
use crate::value::Value;
use std::collections::BTreeMap;

/// A single-field condition.
///
/// Following document-store semantics, a condition on an array-valued
/// field matches when any element of the array satisfies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Field equals the value (or the array field contains it).
    Eq(Value),
    /// Field is one of the values.
    In(Vec<Value>),
    /// Field is none of the values.
    Nin(Vec<Value>),
    /// Field is present (or absent, for `Exists(false)`).
    Exists(bool),
}

impl Filter {
    /// Evaluates this condition against a field value.
    ///
    /// `field` is `None` when the record has no such key.
    #[must_use]
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Filter::Eq(expected) => match field {
                Some(Value::Array(items)) if !matches!(expected, Value::Array(_)) => {
                    items.contains(expected)
                }
                Some(actual) => actual == expected,
                None => false,
            },
            Filter::In(allowed) => match field {
                Some(Value::Array(items)) => items.iter().any(|item| allowed.contains(item)),
                Some(actual) => allowed.contains(actual),
                None => false,
            },
            Filter::Nin(denied) => match field {
                Some(Value::Array(items)) => !items.iter().any(|item| denied.contains(item)),
                Some(actual) => !denied.contains(actual),
                None => true,
            },
            Filter::Exists(wanted) => field.is_some() == *wanted,
        }
    }
}

/// A conjunction of per-field conditions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    filters: BTreeMap<String, Filter>,
}

impl Query {
    /// Creates a query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition on a field.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, filter: Filter) -> Self {
        self.filters.insert(key.into(), filter);
        self
    }

    /// Shorthand for an equality condition.
    #[must_use]
    pub fn eq(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(key, Filter::Eq(value.into()))
    }

    /// Returns true if the query has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates the query against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(key, filter)| filter.matches(record.get(key)))
    }
}

/// An inclusion list of record keys returned by a find.
///
/// The `_id` field is always included.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    keys: Vec<String>,
}

impl Projection {
    /// Creates a projection over the given keys.
    #[must_use]
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Applies the projection to a record.
    #[must_use]
    pub fn apply(&self, record: &Record) -> Record {
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        record.project(&keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn eq_matches_scalar() {
        let rec = record(&[("name", Value::from("Alice"))]);
        assert!(Query::new().eq("name", "Alice").matches(&rec));
        assert!(!Query::new().eq("name", "Bob").matches(&rec));
        assert!(!Query::new().eq("missing", "x").matches(&rec));
    }

    #[test]
    fn eq_matches_array_element() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let rec = record(&[("ids", Value::from(vec![a, b]))]);
        assert!(Filter::Eq(Value::Id(a)).matches(rec.get("ids")));
        assert!(!Filter::Eq(Value::Id(ObjectId::new())).matches(rec.get("ids")));
    }

    #[test]
    fn in_matches_scalar_and_array() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let scalar = record(&[("owner", Value::Id(a))]);
        let array = record(&[("owner", Value::from(vec![a]))]);

        let filter = Filter::In(vec![Value::Id(a), Value::Id(b)]);
        assert!(filter.matches(scalar.get("owner")));
        assert!(filter.matches(array.get("owner")));
        assert!(!filter.matches(None));
    }

    #[test]
    fn nin_rejects_listed_values() {
        let a = ObjectId::new();
        let rec = record(&[("_id", Value::Id(a))]);
        assert!(!Filter::Nin(vec![Value::Id(a)]).matches(rec.get("_id")));
        assert!(Filter::Nin(vec![Value::Id(ObjectId::new())]).matches(rec.get("_id")));
        // A missing field is not in any list.
        assert!(Filter::Nin(vec![Value::Id(a)]).matches(None));
    }

    #[test]
    fn exists_checks_presence() {
        let rec = record(&[("set", Value::Int(1))]);
        assert!(Filter::Exists(true).matches(rec.get("set")));
        assert!(!Filter::Exists(true).matches(rec.get("unset")));
        assert!(Filter::Exists(false).matches(rec.get("unset")));
    }

    #[test]
    fn conjunction() {
        let rec = record(&[("a", Value::Int(1)), ("b", Value::Int(2))]);
        let query = Query::new().eq("a", 1i64).eq("b", 2i64);
        assert!(query.matches(&rec));
        let query = Query::new().eq("a", 1i64).eq("b", 3i64);
        assert!(!query.matches(&rec));
    }

    #[test]
    fn empty_query_matches_all() {
        assert!(Query::new().matches(&Record::new()));
    }

    #[test]
    fn projection_applies_inclusion() {
        let rec = record(&[
            ("_id", Value::Id(ObjectId::new())),
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
        ]);
        let projected = Projection::keys(["a"]).apply(&rec);
        assert!(projected.contains("_id"));
        assert!(projected.contains("a"));
        assert!(!projected.contains("b"));
    }
}
