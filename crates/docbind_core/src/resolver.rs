//! The relation resolver: post-fetch hydration of entity graphs.
//!
//! Given a batch of loaded root entities, the resolver fetches and
//! wires their related entities, handling both the owning and mapped
//! sides of each relation. It is a breadth-first recursion carrying a
//! shared `identifier -> entity` table that prevents re-fetching and
//! breaks cycles: an entity already in the table is wired by reference,
//! preserving structural identity across the graph.

use crate::document::{Accessor, EntityRef};
use crate::error::{OdmError, OdmResult};
use crate::manager::DocumentManager;
use crate::metadata::{EntitySpec, FieldSpec, Load, RelationKind, RelationSide, RelationSpec};
use docbind_driver::{Filter, ObjectId, Projection, Query, Value};
use std::collections::HashMap;
use tracing::trace;

type Fetched = HashMap<ObjectId, EntityRef>;

impl DocumentManager {
    /// Resolves relations on a type-erased root batch.
    pub(crate) fn resolve_refs(&self, batch: &[EntityRef], fields: &[&str]) -> OdmResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut fetched = Fetched::new();
        self.do_resolve_relations(batch, &mut fetched, fields)
    }

    /// One level of the breadth-first recursion.
    ///
    /// `fetched` is seeded with the batch before any field is visited,
    /// so a cycle back into the batch resolves to the same instances.
    /// The `fields` restriction only applies at the top level; on
    /// recursive levels lazy relations are skipped instead.
    fn do_resolve_relations(
        &self,
        batch: &[EntityRef],
        fetched: &mut Fetched,
        fields: &[&str],
    ) -> OdmResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let top = fetched.is_empty();
        let spec = self.registry.spec_for(&batch[0])?;
        trace!(collection = %spec.collection, batch = batch.len(), top, "resolving relations");

        let mut roots = Vec::with_capacity(batch.len());
        for entity in batch {
            let id = spec.id_of(entity)?;
            fetched.insert(id, entity.clone());
            roots.push((id, entity.clone()));
        }
        if !spec.has_relations() {
            return Ok(());
        }
        let root_ids: Vec<Value> = roots.iter().map(|(id, _)| Value::Id(*id)).collect();

        for (field, relation) in spec.fields_with_relation() {
            if !fields.is_empty() && !fields.contains(&field.name.as_str()) {
                continue;
            }
            if !top && relation.load == Load::Lazy {
                continue;
            }
            trace!(field = %field.name, kind = ?relation.kind, side = ?relation.side, "resolving field");
            match (relation.kind, relation.side) {
                (RelationKind::Many, RelationSide::Mapped) => {
                    self.resolve_many_mapped(field, relation, &roots, &root_ids, fetched)?;
                }
                (RelationKind::Many, RelationSide::Owning) => {
                    self.resolve_many_owning(&spec, field, relation, &roots, &root_ids, fetched)?;
                }
                (RelationKind::One, RelationSide::Mapped) => {
                    self.resolve_one_mapped(field, relation, &roots, &root_ids, fetched)?;
                }
                (RelationKind::One, RelationSide::Owning) => {
                    self.resolve_one_owning(&spec, field, relation, &roots, &root_ids, fetched)?;
                }
            }
        }
        Ok(())
    }

    /// referenceMany, mapped side: the owning field on the target
    /// collection stores our identifiers. Find target records whose
    /// owning field contains a root id, and append each to its root.
    fn resolve_many_mapped(
        &self,
        field: &FieldSpec,
        relation: &RelationSpec,
        roots: &[(ObjectId, EntityRef)],
        root_ids: &[Value],
        fetched: &mut Fetched,
    ) -> OdmResult<()> {
        let target_spec = self.registry.by_collection(&relation.target_collection)?;
        let (owner_field, _) = mapped_owner(&target_spec, relation)?;
        let collection = self.driver.collection(&target_spec.collection);

        let summaries = collection.find(
            &Query::new().filter(owner_field.key.clone(), Filter::In(root_ids.to_vec())),
            Some(&Projection::keys(["_id", owner_field.key.as_str()])),
        )?;

        // Whether the owning side stores an id array (referenceMany) or
        // a scalar id (referenceOne), Value::ids covers both shapes.
        let mut by_source: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        let mut missing: Vec<ObjectId> = Vec::new();
        for summary in &summaries {
            let Some(target_id) = summary.id() else {
                continue;
            };
            if !fetched.contains_key(&target_id) && !missing.contains(&target_id) {
                missing.push(target_id);
            }
            let linked = summary.get(&owner_field.key).map(Value::ids).unwrap_or_default();
            for source_id in linked {
                by_source.entry(source_id).or_default().push(target_id);
            }
        }

        let fresh = self.fetch_batch(&target_spec, &missing)?;
        let fresh_by_id = index_by_id(&target_spec, &fresh)?;
        if let Accessor::Many { push, .. } = field.accessor {
            for (root_id, root) in roots {
                let Some(target_ids) = by_source.get(root_id) else {
                    continue;
                };
                for target_id in target_ids {
                    if let Some(target) =
                        fetched.get(target_id).or_else(|| fresh_by_id.get(target_id))
                    {
                        push(root, target.clone());
                    }
                }
            }
        }
        self.do_resolve_relations(&fresh, fetched, &[])
    }

    /// referenceMany, owning side: the identifier array lives under the
    /// field's key on the roots' own records. Wire targets in stored
    /// id order.
    fn resolve_many_owning(
        &self,
        spec: &EntitySpec,
        field: &FieldSpec,
        relation: &RelationSpec,
        roots: &[(ObjectId, EntityRef)],
        root_ids: &[Value],
        fetched: &mut Fetched,
    ) -> OdmResult<()> {
        let collection = self.driver.collection(&spec.collection);
        let results = collection.find(
            &Query::new().filter("_id", Filter::In(root_ids.to_vec())),
            Some(&Projection::keys(["_id", field.key.as_str()])),
        )?;

        let mut links: Vec<(ObjectId, Vec<ObjectId>)> = Vec::new();
        let mut missing: Vec<ObjectId> = Vec::new();
        for result in &results {
            let Some(root_id) = result.id() else {
                continue;
            };
            let ids = result.get(&field.key).map(Value::ids).unwrap_or_default();
            for id in &ids {
                if !fetched.contains_key(id) && !missing.contains(id) {
                    missing.push(*id);
                }
            }
            links.push((root_id, ids));
        }

        let mut fresh = Vec::new();
        let mut fresh_by_id = Fetched::new();
        if !missing.is_empty() {
            let target_spec = self.registry.by_collection(&relation.target_collection)?;
            fresh = self.fetch_batch(&target_spec, &missing)?;
            fresh_by_id = index_by_id(&target_spec, &fresh)?;
        }

        let by_root: HashMap<ObjectId, &EntityRef> =
            roots.iter().map(|(id, entity)| (*id, entity)).collect();
        if let Accessor::Many { push, .. } = field.accessor {
            for (root_id, ids) in &links {
                let Some(root) = by_root.get(root_id) else {
                    continue;
                };
                for id in ids {
                    if let Some(target) = fetched.get(id).or_else(|| fresh_by_id.get(id)) {
                        push(root, target.clone());
                    }
                }
            }
        }
        self.do_resolve_relations(&fresh, fetched, &[])
    }

    /// referenceOne, mapped side: symmetric to the many/mapped case but
    /// each root accepts at most one target. Targets that are
    /// themselves roots are excluded from the query.
    fn resolve_one_mapped(
        &self,
        field: &FieldSpec,
        relation: &RelationSpec,
        roots: &[(ObjectId, EntityRef)],
        root_ids: &[Value],
        fetched: &mut Fetched,
    ) -> OdmResult<()> {
        let target_spec = self.registry.by_collection(&relation.target_collection)?;
        let (owner_field, _) = mapped_owner(&target_spec, relation)?;
        let collection = self.driver.collection(&target_spec.collection);

        let summaries = collection.find(
            &Query::new()
                .filter("_id", Filter::Nin(root_ids.to_vec()))
                .filter(owner_field.key.clone(), Filter::In(root_ids.to_vec())),
            Some(&Projection::keys(["_id", owner_field.key.as_str()])),
        )?;

        let mut by_source: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut missing: Vec<ObjectId> = Vec::new();
        for summary in &summaries {
            let Some(target_id) = summary.id() else {
                continue;
            };
            if !fetched.contains_key(&target_id) && !missing.contains(&target_id) {
                missing.push(target_id);
            }
            let linked = summary.get(&owner_field.key).map(Value::ids).unwrap_or_default();
            for source_id in linked {
                by_source.insert(source_id, target_id);
            }
        }

        let fresh = self.fetch_batch(&target_spec, &missing)?;
        let fresh_by_id = index_by_id(&target_spec, &fresh)?;
        if let Accessor::One { set, .. } = field.accessor {
            for (root_id, root) in roots {
                let Some(target_id) = by_source.get(root_id) else {
                    continue;
                };
                if let Some(target) = fetched.get(target_id).or_else(|| fresh_by_id.get(target_id))
                {
                    set(root, target.clone());
                }
            }
        }
        self.do_resolve_relations(&fresh, fetched, &[])
    }

    /// referenceOne, owning side: a scalar identifier lives under the
    /// field's key on the roots' own records.
    fn resolve_one_owning(
        &self,
        spec: &EntitySpec,
        field: &FieldSpec,
        relation: &RelationSpec,
        roots: &[(ObjectId, EntityRef)],
        root_ids: &[Value],
        fetched: &mut Fetched,
    ) -> OdmResult<()> {
        let collection = self.driver.collection(&spec.collection);
        let results = collection.find(
            &Query::new()
                .filter("_id", Filter::In(root_ids.to_vec()))
                .filter(field.key.clone(), Filter::Exists(true)),
            Some(&Projection::keys(["_id", field.key.as_str()])),
        )?;

        let mut links: Vec<(ObjectId, ObjectId)> = Vec::new();
        let mut missing: Vec<ObjectId> = Vec::new();
        for result in &results {
            let Some(root_id) = result.id() else {
                continue;
            };
            let Some(target_id) = result.get(&field.key).and_then(Value::as_id) else {
                continue;
            };
            if !fetched.contains_key(&target_id) && !missing.contains(&target_id) {
                missing.push(target_id);
            }
            links.push((root_id, target_id));
        }

        let mut fresh = Vec::new();
        let mut fresh_by_id = Fetched::new();
        if !missing.is_empty() {
            let target_spec = self.registry.by_collection(&relation.target_collection)?;
            fresh = self.fetch_batch(&target_spec, &missing)?;
            fresh_by_id = index_by_id(&target_spec, &fresh)?;
        }

        let by_root: HashMap<ObjectId, &EntityRef> =
            roots.iter().map(|(id, entity)| (*id, entity)).collect();
        if let Accessor::One { set, .. } = field.accessor {
            for (root_id, target_id) in &links {
                let Some(root) = by_root.get(root_id) else {
                    continue;
                };
                if let Some(target) = fetched.get(target_id).or_else(|| fresh_by_id.get(target_id))
                {
                    set(root, target.clone());
                }
            }
        }
        self.do_resolve_relations(&fresh, fetched, &[])
    }

    /// Fetches and hydrates the given identifiers from a collection.
    fn fetch_batch(&self, spec: &EntitySpec, ids: &[ObjectId]) -> OdmResult<Vec<EntityRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Value> = ids.iter().copied().map(Value::Id).collect();
        let records = self
            .driver
            .collection(&spec.collection)
            .find(&Query::new().filter("_id", Filter::In(values)), None)?;
        Ok(records.iter().map(|record| spec.hydrate(record)).collect())
    }
}

/// Looks up the owning field a mapped relation points at.
fn mapped_owner<'a>(
    target_spec: &'a EntitySpec,
    relation: &RelationSpec,
) -> OdmResult<(&'a FieldSpec, &'a RelationSpec)> {
    let name = relation
        .mapped_field
        .as_deref()
        .ok_or(OdmError::MappedFieldNotFound)?;
    let field = target_spec
        .find_field(name)
        .ok_or(OdmError::MappedFieldNotFound)?;
    let owner_relation = field
        .relation
        .as_ref()
        .ok_or(OdmError::MappedFieldNotFound)?;
    Ok((field, owner_relation))
}

/// Indexes a hydrated batch by identifier.
fn index_by_id(spec: &EntitySpec, batch: &[EntityRef]) -> OdmResult<Fetched> {
    let mut by_id = Fetched::with_capacity(batch.len());
    for entity in batch {
        by_id.insert(spec.id_of(entity)?, entity.clone());
    }
    Ok(by_id)
}
