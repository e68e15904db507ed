//! Entity-to-record projection.

use crate::document::{Accessor, EntityRef};
use crate::metadata::EntitySpec;
use docbind_driver::Record;

/// Projects an entity into the flat record written to storage.
///
/// Ignored fields and relation-bearing fields are skipped; the
/// persistence engine substitutes identifier scalars/arrays for the
/// latter afterwards. Zero values of omit-empty fields are elided. The
/// identifier is always written under `_id`.
#[must_use]
pub fn project(spec: &EntitySpec, entity: &EntityRef) -> Record {
    let mut record = Record::new();
    for field in &spec.fields {
        if field.ignore || field.has_relation() {
            continue;
        }
        match field.accessor {
            Accessor::Id { get, .. } => {
                let id = get(entity);
                if spec.is_id_field(field) {
                    record.set("_id", id);
                } else if !(field.omit_empty && id.is_zero()) {
                    record.set(field.key.clone(), id);
                }
            }
            Accessor::Scalar { get, .. } => {
                let value = get(entity);
                if field.omit_empty && value.is_empty() {
                    continue;
                }
                record.set(field.key.clone(), value);
            }
            Accessor::One { .. } | Accessor::Many { .. } => {}
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, FieldDecl, Handle};
    use crate::mapping;
    use crate::metadata::MetadataRegistry;
    use docbind_driver::{ObjectId, Value};

    #[derive(Default)]
    struct Article {
        id: ObjectId,
        title: String,
        draft: bool,
        views: i64,
        notes: String,
        author: Option<Handle<Article>>,
    }

    impl Document for Article {
        fn mapping() -> Vec<FieldDecl> {
            mapping! { Article {
                id: id, "_id", "";
                title: scalar, "", "";
                draft: scalar, "", "omitempty";
                views: scalar, "hits,omitempty", "";
                notes: scalar, "-", "";
                author: one, "", "referenceOne(targetDocument=articles)";
            }}
        }
    }

    fn spec() -> std::rc::Rc<crate::metadata::EntitySpec> {
        let mut registry = MetadataRegistry::new();
        registry.register::<Article>("articles").unwrap();
        registry.by_collection("articles").unwrap()
    }

    #[test]
    fn id_is_written_under_underscore_id() {
        let id = ObjectId::new();
        let entity = EntityRef::new(Article {
            id,
            ..Article::default()
        });
        let record = project(&spec(), &entity);
        assert_eq!(record.id(), Some(id));
        assert!(!record.contains("id"));
    }

    #[test]
    fn omit_empty_elides_zero_values() {
        let entity = EntityRef::new(Article {
            id: ObjectId::new(),
            title: String::new(),
            draft: false,
            views: 0,
            ..Article::default()
        });
        let record = project(&spec(), &entity);
        // Plain fields keep their zero values, omit-empty ones do not.
        assert_eq!(record.get("title"), Some(&Value::Text(String::new())));
        assert!(!record.contains("draft"));
        assert!(!record.contains("hits"));
    }

    #[test]
    fn omit_empty_keeps_non_zero_values() {
        let entity = EntityRef::new(Article {
            id: ObjectId::new(),
            draft: true,
            views: 9,
            ..Article::default()
        });
        let record = project(&spec(), &entity);
        assert_eq!(record.get("draft"), Some(&Value::Bool(true)));
        assert_eq!(record.get("hits"), Some(&Value::Int(9)));
    }

    #[test]
    fn ignored_and_relation_fields_are_skipped() {
        let entity = EntityRef::new(Article {
            id: ObjectId::new(),
            notes: "private".into(),
            ..Article::default()
        });
        let record = project(&spec(), &entity);
        assert!(!record.contains("notes"));
        assert!(!record.contains("odm:authorid"));
        assert!(!record.contains("author"));
    }
}
