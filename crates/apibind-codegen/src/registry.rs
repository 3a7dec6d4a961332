//! Resolved type registry.
//!
//! Every schema type name, plus every union fabricated from field
//! alternatives, maps to exactly one [`ResolvedKind`]. Entries are written once
//! by the resolver and only read afterwards.

use crate::basic::BasicType;
use crate::error::{CodegenError, Result};
use crate::overrides::SpecialType;
use crate::union_registry::UnionRegistry;
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// The resolved type of a field, after array wrapping has been peeled off
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Basic(BasicType),
    /// Registry key of a struct
    Struct(SmolStr),
    /// Registry key of a union
    Union(SmolStr),
    /// Key into the specials table
    Special(SmolStr),
    /// A type excluded from generation, referenced by its emitted name
    Skipped(SmolStr),
    /// Alternatives mixing primitives that no special covers
    Dynamic,
    /// A reference nothing resolves, emitted as a placeholder
    Unresolved(SmolStr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Name as it appears in the payload
    pub name: SmolStr,
    pub ty: FieldType,
    pub array_depth: usize,
    pub required: bool,
    /// Closes a reference cycle and needs a `Box` when not wrapped in an array
    pub indirect: bool,
    pub description: Option<String>,
}

impl ResolvedField {
    /// The union this field holds, if any
    pub fn union_key(&self) -> Option<&SmolStr> {
        match &self.ty {
            FieldType::Union(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_union(&self) -> bool {
        self.union_key().is_some()
    }

    /// Whether the emitted field is boxed
    pub fn is_boxed(&self) -> bool {
        self.indirect && self.array_depth == 0 && matches!(self.ty, FieldType::Struct(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    /// Registry key (the schema name)
    pub key: SmolStr,
    /// Emitted type name
    pub name: SmolStr,
    pub description: Option<String>,
    pub fields: Vec<ResolvedField>,
}

impl StructDescriptor {
    pub fn has_union_fields(&self) -> bool {
        self.fields.iter().any(ResolvedField::is_union)
    }

    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionOrigin {
    /// Declared in the schema through a subtype list
    Schema,
    /// Fabricated from the alternatives of a field
    Synthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDescriptor {
    /// Registry key
    pub key: SmolStr,
    /// Emitted type name
    pub name: SmolStr,
    /// Registry keys of the options, in schema order
    pub options: Vec<SmolStr>,
    /// Prefix for accessor method names, set for synthesized unions
    pub accessor_prefix: Option<SmolStr>,
    pub origin: UnionOrigin,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Basic(BasicType),
    Struct(StructDescriptor),
    Union(UnionDescriptor),
    Special(SpecialType),
    Skipped { name: SmolStr },
}

impl ResolvedKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Struct(_) => "struct",
            Self::Union(_) => "union",
            Self::Special(_) => "special",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Write-once map from type name to resolved kind
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    kinds: BTreeMap<SmolStr, ResolvedKind>,
    /// Keys in the order they were resolved
    order: Vec<SmolStr>,
    unions: UnionRegistry,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolution. A second insert for the same key is an error.
    pub fn insert(&mut self, key: SmolStr, kind: ResolvedKind) -> Result<()> {
        if self.kinds.contains_key(&key) {
            return Err(CodegenError::DuplicateResolution { name: key });
        }
        tracing::trace!(name = %key, kind = kind.kind_name(), "resolved");
        self.order.push(key.clone());
        self.kinds.insert(key, kind);
        Ok(())
    }

    pub(crate) fn unions_mut(&mut self) -> &mut UnionRegistry {
        &mut self.unions
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedKind> {
        self.kinds.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.kinds.contains_key(key)
    }

    pub fn get_struct(&self, key: &str) -> Option<&StructDescriptor> {
        match self.kinds.get(key) {
            Some(ResolvedKind::Struct(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_union(&self, key: &str) -> Option<&UnionDescriptor> {
        match self.kinds.get(key) {
            Some(ResolvedKind::Union(u)) => Some(u),
            _ => None,
        }
    }

    /// Structs sorted by registry key
    pub fn structs(&self) -> impl Iterator<Item = &StructDescriptor> {
        self.kinds.values().filter_map(|kind| match kind {
            ResolvedKind::Struct(s) => Some(s),
            _ => None,
        })
    }

    /// Unions sorted by registry key
    pub fn unions(&self) -> impl Iterator<Item = &UnionDescriptor> {
        self.kinds.values().filter_map(|kind| match kind {
            ResolvedKind::Union(u) => Some(u),
            _ => None,
        })
    }

    /// Set index over union options
    pub fn union_index(&self) -> &UnionRegistry {
        &self.unions
    }

    /// Keys in resolution order
    pub fn resolution_order(&self) -> &[SmolStr] {
        &self.order
    }

    /// Emitted name of a struct or union
    pub fn emitted_name(&self, key: &str) -> Option<&SmolStr> {
        match self.kinds.get(key)? {
            ResolvedKind::Struct(s) => Some(&s.name),
            ResolvedKind::Union(u) => Some(&u.name),
            ResolvedKind::Skipped { name } => Some(name),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_write_once() {
        let mut registry = TypeRegistry::new();
        registry
            .insert("Integer".into(), ResolvedKind::Basic(BasicType::Integer))
            .expect("first insert");

        let err = registry
            .insert("Integer".into(), ResolvedKind::Basic(BasicType::Float))
            .expect_err("second insert");
        assert!(matches!(err, CodegenError::DuplicateResolution { .. }));
        assert_eq!(
            registry.get("Integer"),
            Some(&ResolvedKind::Basic(BasicType::Integer))
        );
        assert_eq!(registry.resolution_order(), &[SmolStr::new("Integer")]);
    }

    #[test]
    fn test_boxing_only_for_direct_structs() {
        let mut field = ResolvedField {
            name: "reply".into(),
            ty: FieldType::Struct("Message".into()),
            array_depth: 0,
            required: false,
            indirect: true,
            description: None,
        };
        assert!(field.is_boxed());

        field.array_depth = 1;
        assert!(!field.is_boxed());

        field.array_depth = 0;
        field.ty = FieldType::Union("Maybe".into());
        assert!(!field.is_boxed());
    }
}
