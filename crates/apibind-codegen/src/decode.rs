//! Decode plans for unions and the structs that hold them.
//!
//! Every union gets a joined shadow (the union of its options' fields, all
//! nullable) and a strategy for picking an option from a decoded shadow:
//!
//! - **Discriminator**: a configured text field selects the option by literal
//!   value. A missing or unmapped literal leaves the union empty.
//! - **Structural**: options are tried from fewest to most fields, and the
//!   first option whose every field is present wins.
//!
//! The same plans are rendered to Rust by [`crate::codegen`] and interpreted
//! in-process over `serde_json::Value` by [`DecodePlans::decode_struct`] and
//! [`DecodePlans::decode_union`].

use crate::basic::BasicType;
use crate::error::{CodegenError, GenerationWarning, Result};
use crate::overrides::OverrideTables;
use crate::registry::{FieldType, ResolvedField, StructDescriptor, TypeRegistry, UnionDescriptor};
use miette::Diagnostic;
use serde::Serialize;
use serde_json::{Map, Value};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use thiserror::Error;

/// How a joined shadow carries one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowKind {
    /// Every option declaring the field agrees on its type
    Typed {
        ty: FieldType,
        array_depth: usize,
        boxed: bool,
    },
    /// Options disagree on the type, so the field stays raw JSON
    Raw,
    /// A nested union, carried as that union's own shadow
    Union { union: SmolStr, array_depth: usize },
}

impl ShadowKind {
    fn of(field: &ResolvedField) -> Self {
        match field.union_key() {
            Some(union) => Self::Union {
                union: union.clone(),
                array_depth: field.array_depth,
            },
            None => Self::Typed {
                ty: field.ty.clone(),
                array_depth: field.array_depth,
                boxed: field.is_boxed(),
            },
        }
    }

    fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Typed {
                    ty: a,
                    array_depth: x,
                    ..
                },
                Self::Typed {
                    ty: b,
                    array_depth: y,
                    ..
                },
            ) => a == b && x == y,
            (a, b) => a == b,
        }
    }

    fn is_union(&self) -> bool {
        matches!(self, Self::Union { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowField {
    pub name: SmolStr,
    pub kind: ShadowKind,
    /// Emitted name of the first option declaring the field
    pub first_option: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionPlan {
    pub key: SmolStr,
    /// Emitted struct name
    pub name: SmolStr,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Literal value of `field` to index into the union's options
    Discriminator {
        field: SmolStr,
        variants: Vec<(SmolStr, usize)>,
    },
    /// Option indices, fewest fields first
    Structural { order: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionPlan {
    pub key: SmolStr,
    pub name: SmolStr,
    /// Options in schema order
    pub options: Vec<OptionPlan>,
    /// Joined fields in order of first appearance
    pub shadow: Vec<ShadowField>,
    pub strategy: Strategy,
}

impl UnionPlan {
    pub fn shadow_field(&self, name: &str) -> Option<&ShadowField> {
        self.shadow.iter().find(|s| s.name == name)
    }
}

/// Decode plans for every union of a resolved registry
#[derive(Debug, Clone)]
pub struct DecodePlans<'r> {
    registry: &'r TypeRegistry,
    unions: BTreeMap<SmolStr, UnionPlan>,
    warnings: Vec<GenerationWarning>,
}

impl<'r> DecodePlans<'r> {
    pub fn build(registry: &'r TypeRegistry, overrides: &OverrideTables) -> Result<Self> {
        let _span = tracing::debug_span!("decode_plans").entered();

        let mut plans = Self {
            registry,
            unions: BTreeMap::new(),
            warnings: Vec::new(),
        };

        for union in overrides.discriminators.keys() {
            if registry.get_union(union).is_none() {
                plans.warn(GenerationWarning::UnknownDiscriminatorUnion {
                    union: union.clone(),
                });
            }
        }

        for descriptor in registry.unions() {
            let plan = plans.plan_union(descriptor, overrides)?;
            plans.unions.insert(descriptor.key.clone(), plan);
        }

        tracing::debug!(unions = plans.unions.len(), "built decode plans");
        Ok(plans)
    }

    pub fn union(&self, key: &str) -> Option<&UnionPlan> {
        self.unions.get(key)
    }

    /// Plans sorted by union key
    pub fn unions(&self) -> impl Iterator<Item = &UnionPlan> {
        self.unions.values()
    }

    /// Structs holding at least one union field
    pub fn hosts(&self) -> impl Iterator<Item = &'r StructDescriptor> {
        self.registry.structs().filter(|s| s.has_union_fields())
    }

    pub fn warnings(&self) -> &[GenerationWarning] {
        &self.warnings
    }

    fn warn(&mut self, warning: GenerationWarning) {
        warning.emit();
        self.warnings.push(warning);
    }

    fn plan_union(
        &mut self,
        descriptor: &UnionDescriptor,
        overrides: &OverrideTables,
    ) -> Result<UnionPlan> {
        let options = descriptor
            .options
            .iter()
            .map(|key| {
                let option = self.registry.get_struct(key).ok_or_else(|| {
                    CodegenError::other(format!(
                        "Option {} of union {} is not a struct",
                        key, descriptor.key
                    ))
                })?;
                Ok(OptionPlan {
                    key: key.clone(),
                    name: option.name.clone(),
                    fields: option.fields.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let shadow = self.join_shadow(&descriptor.name, &options)?;
        let strategy = self.strategy(descriptor, &options, &shadow, overrides);

        Ok(UnionPlan {
            key: descriptor.key.clone(),
            name: descriptor.name.clone(),
            options,
            shadow,
            strategy,
        })
    }

    fn join_shadow(&mut self, union: &SmolStr, options: &[OptionPlan]) -> Result<Vec<ShadowField>> {
        let mut shadow: Vec<ShadowField> = Vec::new();

        for option in options {
            for field in &option.fields {
                let kind = ShadowKind::of(field);
                let Some(existing) = shadow.iter_mut().find(|s| s.name == field.name) else {
                    shadow.push(ShadowField {
                        name: field.name.clone(),
                        kind,
                        first_option: option.name.clone(),
                    });
                    continue;
                };

                if existing.kind.same_type(&kind) {
                    if let (ShadowKind::Typed { boxed, .. }, ShadowKind::Typed { boxed: other, .. }) =
                        (&mut existing.kind, &kind)
                    {
                        *boxed |= *other;
                    }
                    continue;
                }
                if existing.kind.is_union() || kind.is_union() {
                    return Err(CodegenError::ShadowFieldConflict {
                        union: union.clone(),
                        field: field.name.clone(),
                        first: existing.first_option.clone(),
                        second: option.name.clone(),
                    });
                }
                if existing.kind == ShadowKind::Raw {
                    continue;
                }

                let warning = GenerationWarning::ShadowFieldConflict {
                    union: union.clone(),
                    field: field.name.clone(),
                    first: existing.first_option.clone(),
                    second: option.name.clone(),
                };
                existing.kind = ShadowKind::Raw;
                self.warn(warning);
            }
        }

        Ok(shadow)
    }

    fn strategy(
        &mut self,
        descriptor: &UnionDescriptor,
        options: &[OptionPlan],
        shadow: &[ShadowField],
        overrides: &OverrideTables,
    ) -> Strategy {
        let Some(rule) = overrides.discriminator(&descriptor.key) else {
            return structural(options);
        };

        if rule.variants.len() != options.len() {
            self.warn(GenerationWarning::DiscriminatorCoverageMismatch {
                union: descriptor.key.clone(),
                mapped: rule.variants.len(),
                options: options.len(),
            });
        }

        let usable = shadow.iter().any(|s| {
            s.name == rule.field
                && matches!(
                    s.kind,
                    ShadowKind::Typed {
                        ty: FieldType::Basic(basic),
                        array_depth: 0,
                        ..
                    } if basic.is_text()
                )
        });
        if !usable {
            self.warn(GenerationWarning::DiscriminatorFieldUnusable {
                union: descriptor.key.clone(),
                field: rule.field.clone(),
            });
            return structural(options);
        }

        let mut variants = Vec::with_capacity(rule.variants.len());
        for (literal, option) in &rule.variants {
            match options
                .iter()
                .position(|o| o.key == *option || o.name == *option)
            {
                Some(index) => variants.push((literal.clone(), index)),
                None => {
                    tracing::warn!(union = %descriptor.key, %option, "discriminator names an option the union does not have")
                }
            }
        }

        Strategy::Discriminator {
            field: rule.field.clone(),
            variants,
        }
    }
}

fn structural(options: &[OptionPlan]) -> Strategy {
    let mut order: Vec<usize> = (0..options.len()).collect();
    order.sort_by_key(|&index| options[index].fields.len());
    Strategy::Structural { order }
}

/// A record decoded by the interpreter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Emitted struct name
    pub name: SmolStr,
    /// Non-union fields, with absent required option fields set to zero values
    pub fields: Map<String, Value>,
    pub unions: BTreeMap<SmolStr, DecodedUnion>,
}

/// The outcome of decoding one union-typed value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodedUnion {
    Empty,
    Variant(DecodedRecord),
    Seq(Vec<DecodedUnion>),
}

impl DecodedUnion {
    pub fn variant(&self) -> Option<&DecodedRecord> {
        match self {
            Self::Variant(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn items(&self) -> &[DecodedUnion] {
        match self {
            Self::Seq(items) => items,
            _ => &[],
        }
    }
}

/// Payload that does not have the shape its type requires
#[derive(Debug, Error, Diagnostic)]
pub enum DecodeError {
    #[error("no struct or union named {name}")]
    #[diagnostic(code(decode::unknown_type))]
    UnknownType { name: SmolStr },

    #[error("expected {expected} for {context}, found {found}")]
    #[diagnostic(code(decode::shape))]
    Shape {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing required field `{field}` of {name}")]
    #[diagnostic(code(decode::missing_field))]
    MissingField { name: SmolStr, field: SmolStr },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Missing {
    /// Absent required fields are errors, as in a derived decoder
    Reject,
    /// Absent required fields take their zero value, as options built from a shadow
    Fill,
}

impl DecodePlans<'_> {
    /// Decode a payload as the struct registered under `key`
    pub fn decode_struct(&self, key: &str, value: &Value) -> std::result::Result<DecodedRecord, DecodeError> {
        let descriptor = self
            .registry
            .get_struct(key)
            .ok_or_else(|| DecodeError::UnknownType { name: key.into() })?;
        let object = expect_object(value, &descriptor.name)?;
        self.record(&descriptor.name, &descriptor.fields, object, Missing::Reject)
    }

    /// Decode a payload as the union registered under `key`
    pub fn decode_union(&self, key: &str, value: &Value) -> std::result::Result<DecodedUnion, DecodeError> {
        let plan = self
            .unions
            .get(key)
            .ok_or_else(|| DecodeError::UnknownType { name: key.into() })?;
        if value.is_null() {
            return Ok(DecodedUnion::Empty);
        }
        let object = expect_object(value, &plan.name)?;

        // The whole shadow decodes before an option is picked
        for shadow in &plan.shadow {
            let Some(value) = present(object, &shadow.name) else {
                continue;
            };
            match &shadow.kind {
                ShadowKind::Typed { ty, array_depth, .. } => {
                    self.check_value(ty, *array_depth, value, &plan.name, &shadow.name)?;
                }
                ShadowKind::Union { union, array_depth } => {
                    self.union_value(union, *array_depth, Some(value), &plan.name, &shadow.name)?;
                }
                ShadowKind::Raw => {}
            }
        }

        let chosen = match &plan.strategy {
            Strategy::Discriminator { field, variants } => object
                .get(field.as_str())
                .and_then(Value::as_str)
                .and_then(|tag| variants.iter().find(|(literal, _)| literal == tag))
                .map(|(_, index)| *index),
            Strategy::Structural { order } => order.iter().copied().find(|&index| {
                plan.options[index]
                    .fields
                    .iter()
                    .all(|f| present(object, &f.name).is_some())
            }),
        };

        match chosen {
            Some(index) => {
                let option = &plan.options[index];
                self.record(&option.name, &option.fields, object, Missing::Fill)
                    .map(DecodedUnion::Variant)
            }
            None => Ok(DecodedUnion::Empty),
        }
    }

    fn record(
        &self,
        name: &SmolStr,
        fields: &[ResolvedField],
        object: &Map<String, Value>,
        missing: Missing,
    ) -> std::result::Result<DecodedRecord, DecodeError> {
        let mut record = DecodedRecord {
            name: name.clone(),
            fields: Map::new(),
            unions: BTreeMap::new(),
        };

        for field in fields {
            let value = present(object, &field.name);

            if let Some(union) = field.union_key() {
                let decoded = self.union_value(union, field.array_depth, value, name, &field.name)?;
                record.unions.insert(field.name.clone(), decoded);
                continue;
            }

            match value {
                Some(value) => {
                    self.check_value(&field.ty, field.array_depth, value, name, &field.name)?;
                    record.fields.insert(field.name.to_string(), value.clone());
                }
                None if field.required => match missing {
                    Missing::Reject => {
                        return Err(DecodeError::MissingField {
                            name: name.clone(),
                            field: field.name.clone(),
                        });
                    }
                    Missing::Fill => {
                        let zero = self.zero_value(&field.ty, field.array_depth);
                        record.fields.insert(field.name.to_string(), zero);
                    }
                },
                None => {}
            }
        }

        Ok(record)
    }

    fn union_value(
        &self,
        union: &str,
        depth: usize,
        value: Option<&Value>,
        holder: &str,
        field: &str,
    ) -> std::result::Result<DecodedUnion, DecodeError> {
        match (depth, value) {
            (0, None) => Ok(DecodedUnion::Empty),
            (0, Some(value)) => self.decode_union(union, value),
            (_, None) => Ok(DecodedUnion::Seq(Vec::new())),
            (_, Some(value)) => {
                let items = value.as_array().ok_or_else(|| DecodeError::Shape {
                    context: format!("{}.{}", holder, field),
                    expected: "array",
                    found: json_kind(value),
                })?;
                let mut decoded = Vec::with_capacity(items.len());
                for item in items.iter().filter(|item| !item.is_null()) {
                    let inner = self.union_value(union, depth - 1, Some(item), holder, field)?;
                    if !inner.is_empty() {
                        decoded.push(inner);
                    }
                }
                Ok(DecodedUnion::Seq(decoded))
            }
        }
    }

    fn check_value(
        &self,
        ty: &FieldType,
        depth: usize,
        value: &Value,
        holder: &str,
        field: &str,
    ) -> std::result::Result<(), DecodeError> {
        let shape = |expected| DecodeError::Shape {
            context: format!("{}.{}", holder, field),
            expected,
            found: json_kind(value),
        };

        if depth > 0 {
            let items = value.as_array().ok_or_else(|| shape("array"))?;
            for item in items {
                self.check_value(ty, depth - 1, item, holder, field)?;
            }
            return Ok(());
        }

        match ty {
            FieldType::Basic(BasicType::Integer) if !(value.is_i64() || value.is_u64()) => {
                Err(shape("integer"))
            }
            FieldType::Basic(BasicType::Float) if !value.is_number() => Err(shape("number")),
            FieldType::Basic(BasicType::Boolean | BasicType::True) if !value.is_boolean() => {
                Err(shape("boolean"))
            }
            FieldType::Basic(BasicType::String) if !value.is_string() => Err(shape("string")),
            FieldType::Struct(key) => self.decode_struct(key, value).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// JSON form of the value `Default::default()` produces for a field
    fn zero_value(&self, ty: &FieldType, depth: usize) -> Value {
        if depth > 0 {
            return Value::Array(Vec::new());
        }
        match ty {
            FieldType::Basic(basic) => basic.zero_value(),
            FieldType::Struct(key) => Value::Object(
                self.registry
                    .get_struct(key)
                    .map(|s| {
                        s.fields
                            .iter()
                            .filter(|f| f.required && !f.is_union())
                            .map(|f| (f.name.to_string(), self.zero_value(&f.ty, f.array_depth)))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            _ => Value::Null,
        }
    }
}

fn present<'v>(object: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
    object.get(name).filter(|v| !v.is_null())
}

fn expect_object<'v>(
    value: &'v Value,
    context: &str,
) -> std::result::Result<&'v Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| DecodeError::Shape {
        context: context.to_string(),
        expected: "object",
        found: json_kind(value),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
