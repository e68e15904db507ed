//! Index directives.

/// A request that a collection maintain an index.
///
/// Single-field indexes carry one key; a composite unique index carries
/// the keys of every participating field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Record keys covered by the index, in order.
    pub keys: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates an index over the given keys.
    #[must_use]
    pub fn new<I, S>(keys: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            unique,
        }
    }

    /// Creates a single-field index.
    #[must_use]
    pub fn on(key: impl Into<String>, unique: bool) -> Self {
        Self {
            keys: vec![key.into()],
            unique,
        }
    }
}
