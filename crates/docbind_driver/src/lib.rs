//! # DocBind Driver
//!
//! Driver abstraction for DocBind.
//!
//! A driver exposes collection-level primitives over a BSON-like document
//! store: `find`, `find_id`, `upsert_id`, `remove_id` and `ensure_index`.
//! The mapper in `docbind_core` is written against the [`Driver`] and
//! [`DriverCollection`] traits and never touches a concrete store.
//!
//! This crate also provides:
//! - [`ObjectId`] - the opaque 12-byte document identifier
//! - [`Value`] and [`Record`] - the flat document representation
//! - [`Query`], [`Filter`] and [`Projection`] - the query primitives
//! - [`MemoryDriver`] - an in-memory driver for tests

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod id;
mod index;
mod memory;
mod query;
mod record;
mod value;

pub use driver::{ChangeInfo, Driver, DriverCollection};
pub use error::{DriverError, DriverResult};
pub use id::ObjectId;
pub use index::IndexSpec;
pub use memory::{MemoryDriver, Op};
pub use query::{Filter, Projection, Query};
pub use record::Record;
pub use value::Value;
