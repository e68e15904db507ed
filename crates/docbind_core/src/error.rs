//! Error types for the mapper.

use docbind_driver::DriverError;
use docbind_tag::TagError;
use thiserror::Error;

/// Result type for mapper operations.
pub type OdmResult<T> = Result<T, OdmError>;

/// Errors that can occur in mapper operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OdmError {
    /// The document type was not registered with the document manager.
    #[error("document type not registered with the document manager")]
    DocumentNotRegistered,

    /// The document type declares no identifier field.
    ///
    /// Raised lazily, when identifier access is first requested.
    #[error("no identifier field defined for the document type")]
    IdFieldNotFound,

    /// A `mappedBy` annotation names a field that does not resolve on
    /// the target document type.
    #[error("mapped field not found, check the mappedBy annotation")]
    MappedFieldNotFound,

    /// Field metadata was requested and not found.
    #[error("field metadata not found: {name}")]
    FieldNotFound {
        /// The requested field name.
        name: String,
    },

    /// An ODM annotation could not be compiled.
    #[error("invalid ODM annotation: {message}")]
    InvalidAnnotation {
        /// Description of the offending annotation.
        message: String,
    },

    /// The collection name is already registered to another type.
    #[error("collection '{collection}' is already registered to another document type")]
    CollectionTaken {
        /// The contested collection name.
        collection: String,
    },

    /// The driver failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl OdmError {
    /// Creates an invalid annotation error.
    pub fn invalid_annotation(message: impl Into<String>) -> Self {
        Self::InvalidAnnotation {
            message: message.into(),
        }
    }

    /// Creates a field not found error.
    pub fn field_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound { name: name.into() }
    }

    /// Creates a collection taken error.
    pub fn collection_taken(collection: impl Into<String>) -> Self {
        Self::CollectionTaken {
            collection: collection.into(),
        }
    }
}

impl From<TagError> for OdmError {
    fn from(err: TagError) -> Self {
        Self::InvalidAnnotation {
            message: err.to_string(),
        }
    }
}
