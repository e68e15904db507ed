//! The entity contract: declared mappings and type-erased handles.
//!
//! DocBind has no runtime reflection. Each entity type declares its
//! field table once - name, storage tag, ODM annotation and a set of
//! compiled accessors - and the registry turns that table into an
//! [`crate::metadata::EntitySpec`] at registration time. The
//! [`crate::mapping!`] macro generates the table from a terse per-field
//! syntax.

use crate::error::{OdmError, OdmResult};
use docbind_driver::{ObjectId, Value};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared, mutable handle to an entity.
///
/// Entity graphs are cyclic by nature (owning and mapped sides of the
/// same relation), so entities are held behind `Rc<RefCell<_>>` and
/// wired together by reference. The document manager is single-threaded
/// by contract; handles never cross threads.
pub type Handle<T> = Rc<RefCell<T>>;

/// A persistable entity type.
///
/// Implementors describe their fields through [`Document::mapping`];
/// everything else - projection, identity access, relation wiring - is
/// derived from that table. `Default` provides the zero instance the
/// resolver hydrates fetched records into.
pub trait Document: Any + Default {
    /// Returns the field table, in declaration order.
    fn mapping() -> Vec<FieldDecl>;
}

/// One declared field: annotations plus compiled accessors.
pub struct FieldDecl {
    /// In-memory field name.
    pub name: &'static str,
    /// Storage tag: `<key>[,omitempty]`, `-` to ignore, `_id` for the
    /// identifier field, or empty for the default key.
    pub storage: &'static str,
    /// ODM annotation string, tokenized by `docbind_tag`.
    pub annotation: &'static str,
    /// Compiled accessors for this field.
    pub accessor: Accessor,
}

/// Compiled accessors reading and writing one field through a
/// type-erased [`EntityRef`].
///
/// All variants hold plain function pointers; a mapping table carries
/// no captured state and is cheap to clone into the compiled spec.
#[derive(Clone, Copy)]
pub enum Accessor {
    /// An identifier field.
    Id {
        /// Reads the identifier.
        get: fn(&EntityRef) -> ObjectId,
        /// Writes the identifier.
        set: fn(&EntityRef, ObjectId),
    },
    /// A scalar-persisted field.
    Scalar {
        /// Reads the field as a dynamic value.
        get: fn(&EntityRef) -> Value,
        /// Writes the field from a dynamic value; values of the wrong
        /// shape are ignored.
        set: fn(&EntityRef, Value),
    },
    /// A reference-one relation field (`Option<Handle<T>>`).
    One {
        /// Reads the related entity, if set.
        get: fn(&EntityRef) -> Option<EntityRef>,
        /// Wires a related entity into the field.
        set: fn(&EntityRef, EntityRef),
    },
    /// A reference-many relation field (`Vec<Handle<T>>`).
    Many {
        /// Reads the related entities in field order.
        get: fn(&EntityRef) -> Vec<EntityRef>,
        /// Appends a related entity to the field.
        push: fn(&EntityRef, EntityRef),
    },
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Accessor::Id { .. } => "Id",
            Accessor::Scalar { .. } => "Scalar",
            Accessor::One { .. } => "One",
            Accessor::Many { .. } => "Many",
        };
        f.debug_struct("Accessor").field("kind", &kind).finish()
    }
}

/// A type-erased reference to a live entity.
///
/// Internally an `Rc` over the entity's `RefCell`, tagged with the
/// entity's `TypeId`. Cloning shares the underlying entity.
#[derive(Clone)]
pub struct EntityRef {
    cell: Rc<dyn Any>,
    type_id: TypeId,
}

impl EntityRef {
    /// Wraps a fresh entity.
    pub fn new<T: Document>(document: T) -> Self {
        Self::from_handle(&Rc::new(RefCell::new(document)))
    }

    /// Wraps an existing handle, sharing the entity.
    pub fn from_handle<T: Document>(handle: &Handle<T>) -> Self {
        let cell: Rc<dyn Any> = handle.clone();
        Self {
            cell,
            type_id: TypeId::of::<T>(),
        }
    }

    /// Recovers the typed handle.
    ///
    /// Returns `None` when `T` is not the entity's concrete type.
    #[must_use]
    pub fn downcast<T: Document>(&self) -> Option<Handle<T>> {
        Rc::clone(&self.cell).downcast::<RefCell<T>>().ok()
    }

    /// Recovers the typed handle or fails with `DocumentNotRegistered`.
    pub fn typed<T: Document>(&self) -> OdmResult<Handle<T>> {
        self.downcast().ok_or(OdmError::DocumentNotRegistered)
    }

    /// Returns the entity's concrete type token.
    #[must_use]
    pub fn entity_type(&self) -> TypeId {
        self.type_id
    }

    /// Returns the identity key of this entity.
    ///
    /// Identity is the shared allocation's address: two `EntityRef`s
    /// compare equal exactly when they point at the same entity value.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey {
            addr: Rc::as_ptr(&self.cell) as *const () as usize,
            type_id: self.type_id,
        }
    }

    /// Returns true if both references point at the same entity value.
    #[must_use]
    pub fn same_entity(&self, other: &EntityRef) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("type_id", &self.type_id)
            .field("addr", &(Rc::as_ptr(&self.cell) as *const ()))
            .finish()
    }
}

/// Identity of an entity in the intent buffer: allocation address plus
/// type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    addr: usize,
    type_id: TypeId,
}

/// Conversion between concrete field types and dynamic [`Value`]s.
///
/// Implemented for the scalar shapes DocBind persists; `Option<T>`
/// maps absence to `Value::Null`.
pub trait FieldValue: Sized {
    /// Converts the field into a dynamic value.
    fn to_value(&self) -> Value;
    /// Converts a dynamic value back, or `None` on a shape mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
    fn from_value(value: Value) -> Option<Self> {
        value.as_int()
    }
}

impl FieldValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }
    fn from_value(value: Value) -> Option<Self> {
        value.as_int().and_then(|n| i32::try_from(n).ok())
    }
}

impl FieldValue for u32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }
    fn from_value(value: Value) -> Option<Self> {
        value.as_int().and_then(|n| u32::try_from(n).ok())
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl FieldValue for ObjectId {
    fn to_value(&self) -> Value {
        Value::Id(*self)
    }
    fn from_value(value: Value) -> Option<Self> {
        value.as_id()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        id: ObjectId,
        name: String,
    }

    impl Document for Probe {
        fn mapping() -> Vec<FieldDecl> {
            crate::mapping! { Probe {
                id: id, "_id", "id";
                name: scalar, "", "";
            }}
        }
    }

    #[test]
    fn identity_follows_the_allocation() {
        let handle = Rc::new(RefCell::new(Probe::default()));
        let a = EntityRef::from_handle(&handle);
        let b = EntityRef::from_handle(&handle);
        let c = EntityRef::new(Probe::default());

        assert!(a.same_entity(&b));
        assert!(!a.same_entity(&c));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn downcast_recovers_the_handle() {
        let handle = Rc::new(RefCell::new(Probe {
            id: ObjectId::new(),
            name: "x".into(),
        }));
        let entity = EntityRef::from_handle(&handle);

        let back = entity.downcast::<Probe>().unwrap();
        assert!(Rc::ptr_eq(&handle, &back));
        assert_eq!(back.borrow().name, "x");
    }

    #[test]
    fn accessors_read_and_write() {
        let entity = EntityRef::new(Probe::default());
        let mapping = Probe::mapping();

        let Accessor::Id { get, set } = mapping[0].accessor else {
            panic!("expected id accessor");
        };
        let id = ObjectId::new();
        set(&entity, id);
        assert_eq!(get(&entity), id);

        let Accessor::Scalar { get, set } = mapping[1].accessor else {
            panic!("expected scalar accessor");
        };
        set(&entity, Value::from("Ada"));
        assert_eq!(get(&entity), Value::from("Ada"));
        // A shape mismatch leaves the field alone.
        set(&entity, Value::Int(5));
        assert_eq!(get(&entity), Value::from("Ada"));
    }

    #[test]
    fn option_field_value_roundtrip() {
        let value = Some("x".to_string()).to_value();
        assert_eq!(value, Value::Text("x".into()));
        assert_eq!(
            <Option<String>>::from_value(Value::Null),
            Some(None)
        );
        assert_eq!(
            <Option<String>>::from_value(Value::Text("y".into())),
            Some(Some("y".into()))
        );
    }
}
