use super::{BuildContext, joined_key};
use crate::basic::is_basic;
use crate::error::{GenerationWarning, Result};
use crate::registry::{FieldType, UnionDescriptor, UnionOrigin};
use crate::schema::{SchemaField, TypeRef};
use heck::ToSnakeCase;
use itertools::Itertools;
use smol_str::{SmolStr, format_smolstr};

impl BuildContext<'_> {
    /// Resolve a field declaring several alternative types
    pub(super) fn resolve_alternatives(
        &mut self,
        holder: &SmolStr,
        field: &SchemaField,
        refs: &[TypeRef],
    ) -> Result<(FieldType, usize, bool)> {
        let joined = joined_key(field);
        if self.overrides.special(&joined).is_some() {
            return Ok((FieldType::Special(SmolStr::new(joined)), 0, false));
        }

        if refs.iter().any(|r| is_basic(&r.base)) {
            tracing::debug!(holder = %holder, field = %field.name, "primitive alternatives decode as raw JSON");
            return Ok((FieldType::Dynamic, 0, false));
        }

        let candidates: Vec<SmolStr> = refs.iter().map(|r| r.base.clone()).unique().collect();

        if candidates.iter().any(|c| !self.is_record(c)) {
            self.warn(GenerationWarning::NonRecordAlternatives {
                holder: holder.clone(),
                field: field.name.clone(),
                alternatives: field.types.join(", "),
            });
            return Ok((FieldType::Dynamic, 0, false));
        }

        // A value and an array of values cannot share one Rust type
        let Ok(array_depth) = refs.iter().map(|r| r.array_depth).all_equal_value() else {
            self.warn(GenerationWarning::MixedArrayAlternatives {
                holder: holder.clone(),
                field: field.name.clone(),
                alternatives: field.types.join(", "),
            });
            return Ok((FieldType::Dynamic, 0, false));
        };

        if let [only] = candidates.as_slice() {
            let indirect = !self.registry.contains(only);
            return Ok((FieldType::Struct(only.clone()), array_depth, indirect));
        }

        let key = self.union_for(&candidates)?;
        Ok((FieldType::Union(key), array_depth, false))
    }

    /// Find the union whose options equal the candidates, or synthesize one
    fn union_for(&mut self, candidates: &[SmolStr]) -> Result<SmolStr> {
        let set = self.normalize(candidates);

        if let Some(existing) = self.registry.union_index().find(&set) {
            return Ok(existing.key.clone());
        }
        // A schema union on the holder's cycle may not be resolved yet
        if let Some(key) = self.schema_unions.get(&set) {
            return Ok(key.clone());
        }

        let name = format_smolstr!(
            "{}{}",
            self.overrides.union_prefix,
            candidates.iter().map(|c| self.overrides.renamed(c)).join("")
        );
        tracing::debug!(union = %name, options = candidates.len(), "synthesized union");

        self.register_union(UnionDescriptor {
            key: name.clone(),
            name: name.clone(),
            options: candidates.to_vec(),
            accessor_prefix: Some(SmolStr::new(name.to_snake_case())),
            origin: UnionOrigin::Synthesized,
            description: None,
        })?;
        Ok(name)
    }
}
