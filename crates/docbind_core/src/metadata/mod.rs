//! Metadata compilation and the process-lifetime registry.
//!
//! `Register` compiles an entity's declared mapping into an
//! [`EntitySpec`]: the normalized schema capturing its collection,
//! identifier, indexes and relations. Specs are immutable once built
//! and shared behind `Rc`.

mod annotation;
mod registry;
mod spec;

pub use registry::MetadataRegistry;
pub use spec::{Cascade, EntitySpec, FieldSpec, Load, RelationKind, RelationSide, RelationSpec};
