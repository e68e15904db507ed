//! Declarative helpers for entity mappings and bulk registration.

/// Builds a [`crate::FieldDecl`] table for a [`crate::Document`] impl.
///
/// Each line declares one field as `name: kind, storage_tag, odm_tag;`
/// where `kind` is one of `id`, `scalar`, `one`, `many`. The macro
/// generates the accessor functions; relation fields must be declared
/// as `Option<Handle<T>>` (for `one`) or `Vec<Handle<T>>` (for `many`).
///
/// ```ignore
/// impl Document for Author {
///     fn mapping() -> Vec<FieldDecl> {
///         mapping! { Author {
///             id: id, "_id", "id";
///             name: scalar, "", "index(unique)";
///             books: many, "", "referenceMany(targetDocument=books, cascade=persist)";
///         }}
///     }
/// }
/// ```
#[macro_export]
macro_rules! mapping {
    ($ty:ty { $( $field:ident : $kind:ident, $storage:expr, $annotation:expr );+ $(;)? }) => {
        ::std::vec![
            $( $crate::mapping!(@field $ty, $field, $kind, $storage, $annotation) ),+
        ]
    };

    (@field $ty:ty, $field:ident, id, $storage:expr, $annotation:expr) => {
        $crate::FieldDecl {
            name: stringify!($field),
            storage: $storage,
            annotation: $annotation,
            accessor: $crate::Accessor::Id {
                get: |entity| $crate::mapping!(@cell $ty, entity).borrow().$field,
                set: |entity, id| {
                    $crate::mapping!(@cell $ty, entity).borrow_mut().$field = id;
                },
            },
        }
    };

    (@field $ty:ty, $field:ident, scalar, $storage:expr, $annotation:expr) => {
        $crate::FieldDecl {
            name: stringify!($field),
            storage: $storage,
            annotation: $annotation,
            accessor: $crate::Accessor::Scalar {
                get: |entity| {
                    $crate::FieldValue::to_value(
                        &$crate::mapping!(@cell $ty, entity).borrow().$field,
                    )
                },
                set: |entity, value| {
                    if let ::std::option::Option::Some(value) = $crate::FieldValue::from_value(value)
                    {
                        $crate::mapping!(@cell $ty, entity).borrow_mut().$field = value;
                    }
                },
            },
        }
    };

    (@field $ty:ty, $field:ident, one, $storage:expr, $annotation:expr) => {
        $crate::FieldDecl {
            name: stringify!($field),
            storage: $storage,
            annotation: $annotation,
            accessor: $crate::Accessor::One {
                get: |entity| {
                    $crate::mapping!(@cell $ty, entity)
                        .borrow()
                        .$field
                        .as_ref()
                        .map($crate::EntityRef::from_handle)
                },
                set: |entity, target| {
                    let handle = target.downcast().expect("relation target type mismatch");
                    $crate::mapping!(@cell $ty, entity).borrow_mut().$field =
                        ::std::option::Option::Some(handle);
                },
            },
        }
    };

    (@field $ty:ty, $field:ident, many, $storage:expr, $annotation:expr) => {
        $crate::FieldDecl {
            name: stringify!($field),
            storage: $storage,
            annotation: $annotation,
            accessor: $crate::Accessor::Many {
                get: |entity| {
                    $crate::mapping!(@cell $ty, entity)
                        .borrow()
                        .$field
                        .iter()
                        .map($crate::EntityRef::from_handle)
                        .collect()
                },
                push: |entity, target| {
                    let handle = target.downcast().expect("relation target type mismatch");
                    $crate::mapping!(@cell $ty, entity).borrow_mut().$field.push(handle);
                },
            },
        }
    };

    (@cell $ty:ty, $entity:expr) => {
        $entity
            .downcast::<$ty>()
            .expect("entity type mismatch in accessor")
    };
}

/// Registers several document types at once; the first error aborts.
///
/// ```ignore
/// register_many!(manager, {
///     "authors" => Author,
///     "books" => Book,
/// })?;
/// ```
#[macro_export]
macro_rules! register_many {
    ($manager:expr, { $( $collection:expr => $ty:ty ),+ $(,)? }) => {{
        (|| -> $crate::OdmResult<()> {
            $( $manager.register::<$ty>($collection)?; )+
            ::std::result::Result::Ok(())
        })()
    }};
}
