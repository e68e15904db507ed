//! Compiled entity metadata.

use crate::document::{Accessor, Document, EntityRef};
use crate::error::{OdmError, OdmResult};
use docbind_driver::{IndexSpec, ObjectId, Record, Value};
use std::any::TypeId;

/// Whether a relation points at one related entity or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `referenceOne`: a single related entity.
    One,
    /// `referenceMany`: a sequence of related entities.
    Many,
}

/// Which side of the relation physically stores the identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationSide {
    /// This field's record stores the related identifier(s).
    Owning,
    /// The other side stores them; this field is computed on read.
    Mapped,
}

/// Propagation of persist/remove across a relation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cascade {
    /// No propagation.
    #[default]
    None,
    /// Committing the owner also commits related entities.
    Persist,
    /// Removing the owner also removes related entities.
    Remove,
    /// Both.
    All,
}

impl Cascade {
    /// Returns true if persisting the owner cascades.
    #[must_use]
    pub fn includes_persist(&self) -> bool {
        matches!(self, Cascade::Persist | Cascade::All)
    }

    /// Returns true if removing the owner cascades.
    #[must_use]
    pub fn includes_remove(&self) -> bool {
        matches!(self, Cascade::Remove | Cascade::All)
    }
}

/// When a relation is resolved during recursive hydration.
///
/// Top-level roots always have their relations resolved; on recursive
/// levels only `Eager` fields are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Load {
    /// Resolved on the root batch only.
    #[default]
    Lazy,
    /// Resolved on every recursion level.
    Eager,
}

/// A relation declared on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// One or many.
    pub kind: RelationKind,
    /// Owning or mapped side.
    pub side: RelationSide,
    /// Collection name of the related entity type.
    pub target_collection: String,
    /// Field on the other side; meaningful on the mapped side.
    pub mapped_field: Option<String>,
    /// Cascade policy.
    pub cascade: Cascade,
    /// Load policy.
    pub load: Load,
    /// Name of the sibling field whose storage key holds the ids.
    pub store_id_field: Option<String>,
}

/// Compiled metadata for one declared field.
#[derive(Debug)]
pub struct FieldSpec {
    /// In-memory field name.
    pub name: String,
    /// Stored document key.
    pub key: String,
    /// Elide zero values from the projected record.
    pub omit_empty: bool,
    /// Field is invisible to the mapper.
    pub ignore: bool,
    /// Single-field index directive.
    pub indexed: bool,
    /// The single-field index enforces uniqueness.
    pub unique: bool,
    /// Participates in the type's composite unique index.
    pub composite: bool,
    /// Relation carried by the field, if any.
    pub relation: Option<RelationSpec>,
    /// Compiled accessors.
    pub accessor: Accessor,
}

impl FieldSpec {
    /// Returns true if the field carries a relation.
    #[must_use]
    pub fn has_relation(&self) -> bool {
        self.relation.is_some()
    }
}

/// Compiled metadata for one registered entity type.
///
/// Created on register, never mutated afterwards.
#[derive(Debug)]
pub struct EntitySpec {
    /// Target collection name.
    pub collection: String,
    /// Name of the identifier field, if one was declared.
    pub id_field: Option<String>,
    /// Field metadata in declaration order.
    pub fields: Vec<FieldSpec>,
    type_id: TypeId,
    new_instance: fn() -> EntityRef,
}

impl EntitySpec {
    pub(crate) fn new<T: Document>(
        collection: &str,
        id_field: Option<String>,
        fields: Vec<FieldSpec>,
    ) -> Self {
        fn instantiate<T: Document>() -> EntityRef {
            EntityRef::new(T::default())
        }
        Self {
            collection: collection.to_string(),
            id_field,
            fields,
            type_id: TypeId::of::<T>(),
            new_instance: instantiate::<T>,
        }
    }

    /// Returns the type token of the entity type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns true if any field carries a relation.
    #[must_use]
    pub fn has_relations(&self) -> bool {
        self.fields.iter().any(|f| !f.ignore && f.has_relation())
    }

    /// Returns true if any field carries a single-field index.
    #[must_use]
    pub fn has_indexed(&self) -> bool {
        self.fields.iter().any(|f| !f.ignore && f.indexed)
    }

    /// Returns true if any field participates in the composite index.
    #[must_use]
    pub fn has_composite(&self) -> bool {
        self.fields.iter().any(|f| !f.ignore && f.composite)
    }

    /// Iterates the relation-bearing fields in declaration order.
    pub fn fields_with_relation(&self) -> impl Iterator<Item = (&FieldSpec, &RelationSpec)> {
        self.fields
            .iter()
            .filter(|f| !f.ignore)
            .filter_map(|f| f.relation.as_ref().map(|r| (f, r)))
    }

    /// Finds a field by in-memory name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns a field by in-memory name.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` when no such field is declared.
    pub fn field(&self, name: &str) -> OdmResult<&FieldSpec> {
        self.find_field(name)
            .ok_or_else(|| OdmError::field_not_found(name))
    }

    /// Returns true if the field is the identifier field.
    #[must_use]
    pub fn is_id_field(&self, field: &FieldSpec) -> bool {
        self.id_field.as_deref() == Some(field.name.as_str())
    }

    /// Returns the identifier field's metadata.
    ///
    /// # Errors
    ///
    /// Returns `IdFieldNotFound` when the type declares no identifier.
    pub fn id_spec(&self) -> OdmResult<&FieldSpec> {
        self.id_field
            .as_deref()
            .and_then(|name| self.find_field(name))
            .ok_or(OdmError::IdFieldNotFound)
    }

    /// Reads an entity's identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdFieldNotFound` when the type declares no identifier.
    pub fn id_of(&self, entity: &EntityRef) -> OdmResult<ObjectId> {
        match self.id_spec()?.accessor {
            Accessor::Id { get, .. } => Ok(get(entity)),
            _ => Err(OdmError::IdFieldNotFound),
        }
    }

    /// Writes an entity's identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdFieldNotFound` when the type declares no identifier.
    pub fn set_id(&self, entity: &EntityRef, id: ObjectId) -> OdmResult<()> {
        match self.id_spec()?.accessor {
            Accessor::Id { set, .. } => {
                set(entity, id);
                Ok(())
            }
            _ => Err(OdmError::IdFieldNotFound),
        }
    }

    /// Creates a fresh entity from a stored record.
    ///
    /// Scalar fields and the identifier are copied in; relation fields
    /// are left at their defaults for the resolver to wire.
    #[must_use]
    pub fn hydrate(&self, record: &Record) -> EntityRef {
        let entity = (self.new_instance)();
        for field in &self.fields {
            if field.ignore || field.has_relation() {
                continue;
            }
            match field.accessor {
                Accessor::Id { set, .. } => {
                    let key = if self.is_id_field(field) {
                        "_id"
                    } else {
                        field.key.as_str()
                    };
                    if let Some(id) = record.get(key).and_then(Value::as_id) {
                        set(&entity, id);
                    }
                }
                Accessor::Scalar { set, .. } => {
                    if let Some(value) = record.get(&field.key) {
                        set(&entity, value.clone());
                    }
                }
                Accessor::One { .. } | Accessor::Many { .. } => {}
            }
        }
        entity
    }

    /// Derives the single-field index directives.
    #[must_use]
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.fields
            .iter()
            .filter(|f| !f.ignore && f.indexed)
            .map(|f| IndexSpec::on(f.key.clone(), f.unique))
            .collect()
    }

    /// Derives the composite unique index over all composite-tagged
    /// fields, if any are declared.
    #[must_use]
    pub fn composite_index(&self) -> Option<IndexSpec> {
        let keys: Vec<String> = self
            .fields
            .iter()
            .filter(|f| !f.ignore && f.composite)
            .map(|f| f.key.clone())
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(IndexSpec::new(keys, true))
        }
    }
}
