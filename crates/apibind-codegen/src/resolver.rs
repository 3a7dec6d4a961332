//! Fixed-point type resolution.
//!
//! Types are resolved in passes over the still-unresolved names, in name
//! order. A type is resolved as soon as everything it mentions is: basic,
//! special, skipped, already in the registry, or a reference that closes a
//! cycle through an optional or array field. A pass that makes no progress
//! aborts the run with [`CodegenError::ResolutionStalled`].

mod cycles;
mod unions;

pub use cycles::CycleIndex;

use crate::basic::{BasicType, is_basic};
use crate::error::{CodegenError, GenerationWarning, Result};
use crate::overrides::{OverrideTables, UnionReadiness, UnknownTypes};
use crate::registry::{
    FieldType, ResolvedField, ResolvedKind, StructDescriptor, TypeRegistry, UnionDescriptor,
    UnionOrigin,
};
use crate::schema::{Schema, SchemaField, SchemaType, TypeRef};
use crate::union_registry::OptionSet;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Output of a successful resolution run
#[derive(Debug, Clone)]
pub struct Resolution {
    pub registry: TypeRegistry,
    pub warnings: Vec<GenerationWarning>,
    /// Passes needed to reach the fixed point
    pub passes: usize,
    /// Undefined names emitted as `serde_json::Value` aliases
    pub placeholders: BTreeSet<SmolStr>,
}

/// Resolve every type of a schema
pub fn resolve(schema: &Schema, overrides: &OverrideTables) -> Result<Resolution> {
    BuildContext::new(schema, overrides).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefStatus {
    Ready,
    /// Unresolved, but on a cycle with the holder through a cuttable edge
    Indirect,
    Pending,
    Unknown,
}

/// State threaded through one resolution run
pub struct BuildContext<'a> {
    schema: &'a Schema,
    overrides: &'a OverrideTables,
    registry: TypeRegistry,
    warnings: Vec<GenerationWarning>,
    cycles: CycleIndex,
    placeholders: BTreeSet<SmolStr>,
    /// Normalized subtype sets of schema unions
    schema_unions: BTreeMap<OptionSet, SmolStr>,
}

impl<'a> BuildContext<'a> {
    pub fn new(schema: &'a Schema, overrides: &'a OverrideTables) -> Self {
        let mut schema_unions = BTreeMap::new();
        for (name, ty) in schema.iter() {
            if ty.is_union() && !overrides.is_skipped(name) && overrides.special(name).is_none() {
                let set = ty.subtypes.iter().map(|s| overrides.renamed(s)).collect();
                schema_unions.entry(set).or_insert_with(|| name.clone());
            }
        }

        Self {
            schema,
            overrides,
            registry: TypeRegistry::new(),
            warnings: Vec::new(),
            cycles: CycleIndex::build(schema, overrides),
            placeholders: BTreeSet::new(),
            schema_unions,
        }
    }

    pub fn run(mut self) -> Result<Resolution> {
        let _span = tracing::debug_span!("resolve", types = self.schema.len()).entered();

        let mut unresolved: Vec<SmolStr> = self.schema.types.keys().cloned().collect();
        let mut passes = 0;

        while !unresolved.is_empty() {
            let mut remaining = Vec::new();
            let mut resolved = 0;

            for name in unresolved {
                if self.is_resolvable(&name) {
                    self.resolve_type(&name)?;
                    resolved += 1;
                } else {
                    remaining.push(name);
                }
            }

            if resolved == 0 {
                return Err(CodegenError::ResolutionStalled {
                    unresolved: remaining,
                    passes,
                });
            }

            passes += 1;
            tracing::debug!(
                pass = passes,
                resolved,
                remaining = remaining.len(),
                "resolution pass"
            );
            unresolved = remaining;
        }

        Ok(Resolution {
            registry: self.registry,
            warnings: self.warnings,
            passes,
            placeholders: self.placeholders,
        })
    }

    fn warn(&mut self, warning: GenerationWarning) {
        warning.emit();
        self.warnings.push(warning);
    }

    fn is_record(&self, name: &str) -> bool {
        !is_basic(name)
            && !self.overrides.is_skipped(name)
            && self.overrides.special(name).is_none()
            && self.schema.get(name).is_some_and(|t| !t.is_union())
    }

    fn ref_status(&self, holder: &str, r: &TypeRef, cuttable: bool) -> RefStatus {
        let name = r.base.as_str();
        if is_basic(name)
            || self.overrides.special(name).is_some()
            || self.overrides.is_skipped(name)
            || self.registry.contains(name)
        {
            RefStatus::Ready
        } else if self.schema.contains(name) {
            if (cuttable || r.is_array()) && self.cycles.same_cycle(holder, name) {
                RefStatus::Indirect
            } else {
                RefStatus::Pending
            }
        } else {
            RefStatus::Unknown
        }
    }

    fn is_ready(&self, status: RefStatus) -> bool {
        match status {
            RefStatus::Ready | RefStatus::Indirect => true,
            RefStatus::Pending => false,
            RefStatus::Unknown => self.overrides.unknown_types == UnknownTypes::Placeholder,
        }
    }

    fn is_resolvable(&self, name: &str) -> bool {
        if is_basic(name) || self.overrides.is_skipped(name) || self.overrides.special(name).is_some()
        {
            return true;
        }
        let Some(ty) = self.schema.get(name) else {
            return true;
        };

        if ty.is_union() {
            // Union options are boxed in the emitted enum, so union edges always cut cycles
            let status = |s: &SmolStr| self.ref_status(name, &TypeRef::parse(s), true);
            if ty.subtypes.iter().any(|s| status(s) == RefStatus::Unknown)
                && self.overrides.unknown_types == UnknownTypes::Stall
            {
                return false;
            }
            match self.overrides.union_readiness {
                UnionReadiness::FirstOption => {
                    ty.subtypes.first().is_none_or(|s| self.is_ready(status(s)))
                }
                UnionReadiness::AllOptions => ty.subtypes.iter().all(|s| self.is_ready(status(s))),
            }
        } else {
            ty.fields.iter().all(|f| self.is_field_ready(name, f))
        }
    }

    fn is_field_ready(&self, holder: &str, field: &SchemaField) -> bool {
        let refs = field.type_refs();
        if refs.len() > 1 {
            if self.overrides.special(&joined_key(field)).is_some() {
                return true;
            }
            // Alternatives naming a schema union wait for it so it gets reused
            if let Some(key) = self.schema_union_for(&refs) {
                if !self.registry.contains(key) && !self.cycles.same_cycle(holder, key) {
                    return false;
                }
            }
        }
        refs.iter()
            .all(|r| self.is_ready(self.ref_status(holder, r, !field.required)))
    }

    fn resolve_type(&mut self, name: &SmolStr) -> Result<()> {
        let kind = if self.overrides.is_skipped(name) {
            ResolvedKind::Skipped {
                name: self.overrides.renamed(name),
            }
        } else if let Some(special) = self.overrides.special(name) {
            ResolvedKind::Special(special.clone())
        } else if let Some(basic) = BasicType::from_schema_name(name) {
            ResolvedKind::Basic(basic)
        } else {
            let schema = self.schema;
            let ty = schema
                .get(name)
                .ok_or_else(|| CodegenError::other(format!("Type {} is not in the schema", name)))?;
            if ty.is_union() {
                let descriptor = self.resolve_union(name, ty);
                return self.register_union(descriptor);
            }
            ResolvedKind::Struct(self.resolve_struct(name, ty)?)
        };

        self.registry.insert(name.clone(), kind)
    }

    fn resolve_union(&mut self, name: &SmolStr, ty: &SchemaType) -> UnionDescriptor {
        let mut options = Vec::new();
        for subtype in &ty.subtypes {
            if self.is_record(subtype) {
                options.push(subtype.clone());
            } else if !self.schema.contains(subtype) && !self.overrides.is_skipped(subtype) {
                self.unresolved(name, subtype);
            } else {
                tracing::warn!(union = %name, option = %subtype, "dropping non-record union option");
            }
        }

        UnionDescriptor {
            key: name.clone(),
            name: self.overrides.renamed(name),
            options,
            accessor_prefix: None,
            origin: UnionOrigin::Schema,
            description: ty.doc(),
        }
    }

    fn resolve_struct(&mut self, name: &SmolStr, ty: &SchemaType) -> Result<StructDescriptor> {
        let mut fields = Vec::with_capacity(ty.fields.len());
        for field in &ty.fields {
            fields.push(self.resolve_field(name, field)?);
        }

        Ok(StructDescriptor {
            key: name.clone(),
            name: self.overrides.renamed(name),
            description: ty.doc(),
            fields,
        })
    }

    fn resolve_field(&mut self, holder: &SmolStr, field: &SchemaField) -> Result<ResolvedField> {
        let refs = field.type_refs();
        let (ty, array_depth, indirect) = match refs.as_slice() {
            [] => (FieldType::Dynamic, 0, false),
            [single] => self.resolve_single(holder, single),
            _ => self.resolve_alternatives(holder, field, &refs)?,
        };

        Ok(ResolvedField {
            name: field.name.clone(),
            ty,
            array_depth,
            required: field.required,
            indirect,
            description: (!field.description.is_empty()).then(|| field.description.clone()),
        })
    }

    fn resolve_single(&mut self, holder: &SmolStr, r: &TypeRef) -> (FieldType, usize, bool) {
        let name = &r.base;
        let depth = r.array_depth;

        if let Some(basic) = BasicType::from_schema_name(name) {
            return (FieldType::Basic(basic), depth, false);
        }
        if self.overrides.special(name).is_some() {
            return (FieldType::Special(name.clone()), depth, false);
        }
        if self.overrides.is_skipped(name) {
            return (FieldType::Skipped(self.overrides.renamed(name)), depth, false);
        }

        match self.registry.get(name) {
            Some(ResolvedKind::Struct(_)) => (FieldType::Struct(name.clone()), depth, false),
            Some(ResolvedKind::Union(_)) => (FieldType::Union(name.clone()), depth, false),
            Some(ResolvedKind::Basic(basic)) => (FieldType::Basic(*basic), depth, false),
            Some(ResolvedKind::Special(_)) => (FieldType::Special(name.clone()), depth, false),
            Some(ResolvedKind::Skipped { name }) => (FieldType::Skipped(name.clone()), depth, false),
            None => match self.schema.get(name) {
                Some(target) if target.is_union() => (FieldType::Union(name.clone()), depth, true),
                Some(_) => (FieldType::Struct(name.clone()), depth, true),
                None => {
                    self.unresolved(holder, name);
                    (FieldType::Unresolved(name.clone()), depth, false)
                }
            },
        }
    }

    fn unresolved(&mut self, referrer: &SmolStr, name: &SmolStr) {
        self.placeholders.insert(name.clone());
        self.warn(GenerationWarning::UnknownBasicType {
            name: name.clone(),
            referrer: referrer.clone(),
        });
    }

    fn normalize<'r>(&self, names: impl IntoIterator<Item = &'r SmolStr>) -> OptionSet {
        names.into_iter().map(|n| self.overrides.renamed(n)).collect()
    }

    fn schema_union_for(&self, refs: &[TypeRef]) -> Option<&SmolStr> {
        if refs.iter().any(|r| is_basic(&r.base)) {
            return None;
        }
        self.schema_unions.get(&self.normalize(refs.iter().map(|r| &r.base)))
    }

    /// Record a union in the registry and in the option set index
    fn register_union(&mut self, descriptor: UnionDescriptor) -> Result<()> {
        let key = descriptor.key.clone();
        let set = self.normalize(&descriptor.options);
        self.registry.insert(key.clone(), ResolvedKind::Union(descriptor))?;
        if let Some(existing) = self.registry.unions_mut().register(key.clone(), set) {
            tracing::debug!(union = %key, %existing, "union options already registered");
        }
        Ok(())
    }
}

/// Specials key for a field with several alternatives
fn joined_key(field: &SchemaField) -> String {
    field.types.join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Schema, OverrideTables) {
        let schema = Schema::load_from_file("tests/fixtures/schema.json").expect("load schema");
        let overrides =
            OverrideTables::load_from_file("tests/fixtures/overrides.kdl").expect("load overrides");
        (schema, overrides)
    }

    fn field<'r>(resolution: &'r Resolution, ty: &str, name: &str) -> &'r ResolvedField {
        resolution
            .registry
            .get_struct(ty)
            .and_then(|s| s.field(name))
            .unwrap_or_else(|| panic!("{ty}.{name} should be resolved"))
    }

    #[test]
    fn test_fixture_resolves_every_type() {
        let (schema, overrides) = fixture();
        let resolution = resolve(&schema, &overrides).expect("resolution");

        for name in schema.types.keys() {
            assert!(resolution.registry.contains(name), "{name} unresolved");
        }
        assert!(resolution.passes >= 2);
        assert!(resolution.warnings.is_empty());
        assert!(matches!(
            resolution.registry.get("InternalOnly"),
            Some(ResolvedKind::Skipped { .. })
        ));
    }

    #[test]
    fn test_alternatives_share_one_union() {
        let (schema, overrides) = fixture();
        let resolution = resolve(&schema, &overrides).expect("resolution");

        let guest = field(&resolution, "Kennel", "guest");
        let visitors = field(&resolution, "Aquarium", "visitors");
        assert_eq!(guest.ty, FieldType::Union("EitherBirdFish".into()));
        assert_eq!(visitors.ty, guest.ty);
        assert_eq!(guest.array_depth, 0);
        assert_eq!(visitors.array_depth, 1);

        let synthesized = resolution
            .registry
            .unions()
            .filter(|u| u.origin == UnionOrigin::Synthesized)
            .count();
        assert_eq!(synthesized, 1);

        let either = resolution
            .registry
            .get_union("EitherBirdFish")
            .expect("synthesized union");
        assert_eq!(either.accessor_prefix.as_deref(), Some("either_bird_fish"));
        assert_eq!(either.options, vec![SmolStr::new("Bird"), SmolStr::new("Fish")]);
    }

    #[test]
    fn test_alternatives_reuse_schema_union() {
        let (schema, overrides) = fixture();
        let resolution = resolve(&schema, &overrides).expect("resolution");

        assert_eq!(
            field(&resolution, "Owner", "favorite").ty,
            FieldType::Union("Animal".into())
        );
        let pets = field(&resolution, "Owner", "pets");
        assert_eq!(pets.ty, FieldType::Union("Animal".into()));
        assert_eq!(pets.array_depth, 1);
    }

    #[test]
    fn test_specials_and_skips() {
        let (schema, overrides) = fixture();
        let resolution = resolve(&schema, &overrides).expect("resolution");

        assert_eq!(
            field(&resolution, "Owner", "chat_id").ty,
            FieldType::Special("Integer or String".into())
        );
        assert_eq!(
            field(&resolution, "Owner", "avatar").ty,
            FieldType::Special("InputFile or String".into())
        );
        assert_eq!(
            field(&resolution, "Owner", "secret").ty,
            FieldType::Skipped("InternalOnly".into())
        );
    }

    #[test]
    fn test_self_reference_is_boxed() {
        let (schema, overrides) = fixture();
        let resolution = resolve(&schema, &overrides).expect("resolution");

        let reply = field(&resolution, "Message", "reply_to_message");
        assert!(reply.indirect);
        assert!(reply.is_boxed());

        let pinned = field(&resolution, "Message", "pinned_message");
        assert_eq!(pinned.ty, FieldType::Union("MaybeInaccessibleMessage".into()));
        assert!(!pinned.is_boxed());

        assert!(!field(&resolution, "Message", "from").indirect);
    }

    #[test]
    fn test_scalar_mapping_is_stable() {
        let (schema, overrides) = fixture();
        let resolution = resolve(&schema, &overrides).expect("resolution");

        for descriptor in resolution.registry.structs() {
            let ty = schema.get(&descriptor.key).expect("schema type");
            for (resolved, original) in descriptor.fields.iter().zip(&ty.fields) {
                if original.types == ["Integer"] {
                    assert_eq!(resolved.ty, FieldType::Basic(BasicType::Integer));
                }
            }
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (schema, overrides) = fixture();
        let first = resolve(&schema, &overrides).expect("first run");
        let second = resolve(&schema, &overrides).expect("second run");

        assert_eq!(
            first.registry.resolution_order(),
            second.registry.resolution_order()
        );
        let first_structs: Vec<_> = first.registry.structs().collect();
        let second_structs: Vec<_> = second.registry.structs().collect();
        assert_eq!(first_structs, second_structs);
    }

    #[test]
    fn test_undefined_reference_stalls() {
        // Without the specials table `InputFile` is undefined
        let (schema, _) = fixture();
        let err = resolve(&schema, &OverrideTables::default()).expect_err("stall");

        match err {
            CodegenError::ResolutionStalled { unresolved, .. } => {
                assert_eq!(unresolved, vec![SmolStr::new("Owner")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_required_cycle_stalls_on_first_pass() {
        let schema = Schema::from_json(
            r#"{"types": {
                "A": {"name": "A", "fields": [{"name": "b", "types": ["B"], "required": true}]},
                "B": {"name": "B", "fields": [{"name": "a", "types": ["A"], "required": true}]},
                "C": {"name": "C", "fields": [{"name": "n", "types": ["Integer"], "required": true}]}
            }}"#,
        )
        .expect("schema");

        let err = resolve(&schema, &OverrideTables::default()).expect_err("stall");
        match err {
            CodegenError::ResolutionStalled { unresolved, passes } => {
                assert_eq!(unresolved, vec![SmolStr::new("A"), SmolStr::new("B")]);
                assert_eq!(passes, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_union_readiness_policies() {
        let schema = Schema::from_json(
            r#"{"types": {
                "U": {"name": "U", "subtypes": ["A", "B"]},
                "A": {"name": "A", "fields": [{"name": "x", "types": ["Integer"], "required": true}]},
                "B": {"name": "B", "fields": [{"name": "c", "types": ["C"], "required": true}]},
                "C": {"name": "C", "fields": [{"name": "y", "types": ["Integer"], "required": true}]}
            }}"#,
        )
        .expect("schema");

        let position = |resolution: &Resolution, name: &str| {
            resolution
                .registry
                .resolution_order()
                .iter()
                .position(|n| n == name)
                .expect("resolved")
        };

        let first = resolve(&schema, &OverrideTables::default()).expect("first-option");
        assert!(position(&first, "U") < position(&first, "B"));

        let overrides = OverrideTables::from_kdl("union-readiness \"all-options\"").expect("kdl");
        let all = resolve(&schema, &overrides).expect("all-options");
        assert!(position(&all, "U") > position(&all, "B"));
    }

    #[test]
    fn test_placeholder_policy() {
        let schema = Schema::from_json(
            r#"{"types": {
                "A": {"name": "A", "fields": [{"name": "file", "types": ["Blob"], "required": true}]}
            }}"#,
        )
        .expect("schema");
        let overrides = OverrideTables::from_kdl("unknown-types \"placeholder\"").expect("kdl");

        let resolution = resolve(&schema, &overrides).expect("resolution");
        assert_eq!(
            field(&resolution, "A", "file").ty,
            FieldType::Unresolved("Blob".into())
        );
        assert!(resolution.placeholders.contains("Blob"));
        assert!(matches!(
            resolution.warnings.as_slice(),
            [GenerationWarning::UnknownBasicType { .. }]
        ));
    }

    #[test]
    fn test_union_alternative_degrades_to_dynamic() {
        let schema = Schema::from_json(
            r#"{"types": {
                "U": {"name": "U", "subtypes": ["A"]},
                "A": {"name": "A", "fields": [{"name": "x", "types": ["Integer"], "required": true}]},
                "B": {"name": "B", "fields": [{"name": "y", "types": ["Integer"], "required": true}]},
                "H": {"name": "H", "fields": [{"name": "mixed", "types": ["U", "B"], "required": false}]}
            }}"#,
        )
        .expect("schema");

        let resolution = resolve(&schema, &OverrideTables::default()).expect("resolution");
        assert_eq!(field(&resolution, "H", "mixed").ty, FieldType::Dynamic);
        assert!(matches!(
            resolution.warnings.as_slice(),
            [GenerationWarning::NonRecordAlternatives { .. }]
        ));
    }

    #[test]
    fn test_value_or_array_alternatives_degrade_to_dynamic() {
        let schema = Schema::from_json(
            r#"{"types": {
                "A": {"name": "A", "fields": [{"name": "x", "types": ["Integer"], "required": true}]},
                "B": {"name": "B", "fields": [{"name": "y", "types": ["Integer"], "required": true}]},
                "H": {"name": "H", "fields": [
                    {"name": "one_or_many", "types": ["A", "Array of A"], "required": false},
                    {"name": "a_or_bs", "types": ["A", "Array of B"], "required": false},
                    {"name": "many", "types": ["Array of A", "Array of B"], "required": false}
                ]}
            }}"#,
        )
        .expect("schema");

        let resolution = resolve(&schema, &OverrideTables::default()).expect("resolution");
        assert_eq!(field(&resolution, "H", "one_or_many").ty, FieldType::Dynamic);
        assert_eq!(field(&resolution, "H", "one_or_many").array_depth, 0);
        assert_eq!(field(&resolution, "H", "a_or_bs").ty, FieldType::Dynamic);

        let many = field(&resolution, "H", "many");
        assert_eq!(many.ty, FieldType::Union("EitherAB".into()));
        assert_eq!(many.array_depth, 1);

        let mixed = resolution
            .warnings
            .iter()
            .filter(|w| matches!(w, GenerationWarning::MixedArrayAlternatives { .. }))
            .count();
        assert_eq!(mixed, 2);
    }

    #[test]
    fn test_renames_feed_synthesized_names() {
        let (schema, _) = fixture();
        let mut overrides =
            OverrideTables::load_from_file("tests/fixtures/overrides.kdl").expect("overrides");
        overrides.renames.insert("Bird".into(), "Avian".into());

        let resolution = resolve(&schema, &overrides).expect("resolution");
        assert_eq!(
            field(&resolution, "Kennel", "guest").ty,
            FieldType::Union("EitherAvianFish".into())
        );
        assert_eq!(
            resolution.registry.emitted_name("Bird").map(|n| n.as_str()),
            Some("Avian")
        );
    }
}
