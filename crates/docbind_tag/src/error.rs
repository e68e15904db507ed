//! Error types for the tag crate.

use thiserror::Error;

/// Result type for tag parsing.
pub type TagResult<T> = Result<T, TagError>;

/// Errors that can occur while tokenizing an annotation string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The annotation ended in the middle of a definition.
    #[error("unexpected end of annotation")]
    UnexpectedEof,

    /// An unexpected character was found.
    #[error("unexpected character '{found}' at byte {pos}: expected {expected}")]
    UnexpectedChar {
        /// Byte offset of the offending character.
        pos: usize,
        /// The character that was found.
        found: char,
        /// What the parser expected instead.
        expected: &'static str,
    },

    /// A parameter value was empty.
    #[error("empty value for parameter '{key}' at byte {pos}")]
    EmptyValue {
        /// Byte offset where the value should have started.
        pos: usize,
        /// The parameter key.
        key: String,
    },
}

impl TagError {
    /// Creates an unexpected character error.
    pub fn unexpected_char(pos: usize, found: char, expected: &'static str) -> Self {
        Self::UnexpectedChar {
            pos,
            found,
            expected,
        }
    }

    /// Creates an empty value error.
    pub fn empty_value(pos: usize, key: impl Into<String>) -> Self {
        Self::EmptyValue {
            pos,
            key: key.into(),
        }
    }
}
