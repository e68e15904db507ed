//! # DocBind Core
//!
//! An object-document mapper for BSON-like document stores.
//!
//! This crate provides:
//! - Metadata compilation from per-field annotations
//! - A process-lifetime registry of compiled entity specs
//! - A unit-of-work buffering create/update/delete intents
//! - A persistence engine handling cascades and index creation
//! - A cycle-safe relation resolver hydrating entity graphs on read
//!
//! ## Declaring entities
//!
//! Entities are plain structs. The [`mapping!`] macro declares the
//! field table; relations are held as `Option<Handle<T>>` or
//! `Vec<Handle<T>>`:
//!
//! ```ignore
//! #[derive(Default)]
//! struct Author {
//!     id: ObjectId,
//!     name: String,
//!     books: Vec<Handle<Book>>,
//! }
//!
//! impl Document for Author {
//!     fn mapping() -> Vec<FieldDecl> {
//!         mapping! { Author {
//!             id: id, "_id", "id";
//!             name: scalar, "", "";
//!             books: many, "", "referenceMany(targetDocument=books, cascade=all)";
//!         }}
//!     }
//! }
//! ```
//!
//! ## Working with the manager
//!
//! ```ignore
//! let mut manager = DocumentManager::new(Box::new(driver));
//! register_many!(manager, { "authors" => Author, "books" => Book })?;
//!
//! manager.persist(&author)?;
//! manager.flush()?;
//!
//! let loaded = manager.find_id::<Author>(id)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod macros;
mod manager;
pub mod metadata;
mod persister;
mod projection;
mod query;
mod resolver;
mod uow;

pub use document::{Accessor, Document, EntityKey, EntityRef, FieldDecl, FieldValue, Handle};
pub use error::{OdmError, OdmResult};
pub use manager::DocumentManager;
pub use metadata::{
    Cascade, EntitySpec, FieldSpec, Load, MetadataRegistry, RelationKind, RelationSide,
    RelationSpec,
};
pub use projection::project;
pub use query::QueryBuilder;
pub use uow::{Intent, UnitOfWork};

pub use docbind_driver::{
    ChangeInfo, Driver, DriverCollection, DriverError, Filter, IndexSpec, ObjectId, Projection,
    Query, Record, Value,
};
