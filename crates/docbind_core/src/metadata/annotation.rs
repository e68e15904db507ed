//! Compiles declared mappings into entity metadata.
//!
//! Each field carries two annotation channels: a storage tag
//! (`<key>[,omitempty]`, with `-` marking ignore and `_id` marking the
//! identifier) and an ODM tag tokenized by `docbind_tag`. Recognized
//! definition names are `id`, `omitempty`, `index`, `composite`,
//! `referenceOne` and `referenceMany`; anything else fails compilation.

use crate::document::{Accessor, Document};
use crate::error::{OdmError, OdmResult};
use crate::metadata::spec::{
    Cascade, EntitySpec, FieldSpec, Load, RelationKind, RelationSide, RelationSpec,
};

/// Compiles the declared mapping of `T` into an [`EntitySpec`].
///
/// # Errors
///
/// Returns `InvalidAnnotation` on an unknown definition name, an
/// unknown relation parameter, a malformed tag, or a `storeid` that
/// does not resolve to a plain sibling field.
pub(crate) fn compile<T: Document>(collection: &str) -> OdmResult<EntitySpec> {
    let mut id_field = None;
    let mut fields = Vec::new();

    for decl in T::mapping() {
        let mut field = FieldSpec {
            name: decl.name.to_string(),
            key: decl.name.to_lowercase(),
            omit_empty: false,
            ignore: false,
            indexed: false,
            unique: false,
            composite: false,
            relation: None,
            accessor: decl.accessor,
        };

        // Storage tag channel.
        let mut parts = decl.storage.splitn(2, ',');
        let storage_key = parts.next().unwrap_or("").trim();
        if !storage_key.is_empty() {
            field.key = storage_key.to_string();
            if storage_key == "_id" {
                id_field = Some(field.name.clone());
            }
            if storage_key == "-" {
                field.ignore = true;
                fields.push(field);
                continue;
            }
        }
        if parts.next().map(str::trim) == Some("omitempty") {
            field.omit_empty = true;
        }

        // ODM tag channel.
        if decl.annotation.trim() == "-" {
            field.ignore = true;
            fields.push(field);
            continue;
        }
        for definition in docbind_tag::parse(decl.annotation)? {
            match definition.name.as_str() {
                "id" => id_field = Some(field.name.clone()),
                "omitempty" => field.omit_empty = true,
                "index" => {
                    field.indexed = true;
                    for param in &definition.params {
                        if param.key.eq_ignore_ascii_case("unique") {
                            field.unique = true;
                        }
                    }
                }
                "composite" => field.composite = true,
                name @ ("referenceone" | "referencemany") => {
                    let kind = if name == "referencemany" {
                        RelationKind::Many
                    } else {
                        RelationKind::One
                    };
                    field.key = match kind {
                        RelationKind::Many => format!("odm:{}ids", decl.name.to_lowercase()),
                        RelationKind::One => format!("odm:{}id", decl.name.to_lowercase()),
                    };
                    field.relation = Some(compile_relation(kind, &definition)?);
                }
                other => {
                    return Err(OdmError::invalid_annotation(format!(
                        "unknown annotation '{other}' on field '{}'",
                        decl.name
                    )))
                }
            }
        }

        // A relation field never carries a single-field index.
        if field.indexed && field.has_relation() {
            field.indexed = false;
        }

        fields.push(field);
    }

    resolve_store_id_keys(&mut fields)?;

    if let Some(name) = &id_field {
        let declared = fields.iter().find(|f| f.name == *name);
        if !matches!(
            declared.map(|f| &f.accessor),
            Some(Accessor::Id { .. })
        ) {
            return Err(OdmError::invalid_annotation(format!(
                "identifier field '{name}' must use an id accessor"
            )));
        }
    }

    Ok(EntitySpec::new::<T>(collection, id_field, fields))
}

/// Compiles one `referenceOne`/`referenceMany` definition.
///
/// `mappedBy` and `inversedBy` are mutually exclusive; the last one
/// wins within a single declaration.
fn compile_relation(
    kind: RelationKind,
    definition: &docbind_tag::Definition,
) -> OdmResult<RelationSpec> {
    let mut relation = RelationSpec {
        kind,
        side: RelationSide::Owning,
        target_collection: String::new(),
        mapped_field: None,
        cascade: Cascade::None,
        load: Load::Lazy,
        store_id_field: None,
    };
    for param in &definition.params {
        match param.key.to_ascii_lowercase().as_str() {
            "mappedby" => {
                relation.side = RelationSide::Mapped;
                relation.mapped_field = Some(param.value.clone());
            }
            "inversedby" => {
                relation.side = RelationSide::Owning;
                relation.mapped_field = Some(param.value.clone());
            }
            "targetdocument" => relation.target_collection = param.value.clone(),
            "cascade" => {
                relation.cascade = match param.value.to_ascii_lowercase().as_str() {
                    "persist" => Cascade::Persist,
                    "remove" => Cascade::Remove,
                    "all" => Cascade::All,
                    _ => relation.cascade,
                }
            }
            "load" => {
                if param.value.eq_ignore_ascii_case("eager") {
                    relation.load = Load::Eager;
                }
            }
            "storeid" => relation.store_id_field = Some(param.value.clone()),
            other => {
                return Err(OdmError::invalid_annotation(format!(
                    "unknown relation parameter '{other}'"
                )))
            }
        }
    }
    Ok(relation)
}

/// Redirects relation keys through their `storeid` fields.
///
/// Runs after the full field walk because the named field may be
/// declared later than the relation.
fn resolve_store_id_keys(fields: &mut [FieldSpec]) -> OdmResult<()> {
    let mut redirects = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        if let Some(target) = field
            .relation
            .as_ref()
            .and_then(|r| r.store_id_field.clone())
        {
            redirects.push((index, target));
        }
    }
    for (index, target) in redirects {
        let Some(target_field) = fields.iter().find(|f| f.name == target) else {
            return Err(OdmError::invalid_annotation(format!(
                "storeid names unknown field '{target}'"
            )));
        };
        if target_field.has_relation() {
            return Err(OdmError::invalid_annotation(format!(
                "storeid must not name the relation-bearing field '{target}'"
            )));
        }
        let key = if target_field.ignore {
            target_field.name.to_lowercase()
        } else {
            target_field.key.clone()
        };
        fields[index].key = key;
    }
    Ok(())
}
