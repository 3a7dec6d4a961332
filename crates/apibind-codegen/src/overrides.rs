//! Static override tables consumed by the resolver.
//!
//! The tables are KDL documents. The generator ships a default set in
//! `overrides.kdl`; users may point the CLI at their own file instead.

use crate::error::{CodegenError, Result};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const BUILTIN_OVERRIDES: &str = include_str!("../overrides.kdl");
const DEFAULT_UNION_PREFIX: &str = "Either";

/// How many subtypes of a union must be resolvable before the union itself is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnionReadiness {
    /// Only the first subtype has to be resolvable.
    #[default]
    FirstOption,
    /// Every subtype has to be resolvable.
    AllOptions,
}

/// What to do with a reference to a type no table or schema entry defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypes {
    /// The referring type never becomes resolvable and the run stalls.
    #[default]
    Stall,
    /// The reference is emitted as a `serde_json::Value` placeholder alias.
    Placeholder,
}

/// A hand-authored type that replaces a schema type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialType {
    /// Key in the specials table, either a type name or an `"A or B"` combination
    pub name: SmolStr,
    /// Rust path of the replacement, e.g. `crate::InputFile`
    pub rust_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorRule {
    /// Field whose literal value selects the option
    pub field: SmolStr,
    /// Literal value to option name, in declaration order
    pub variants: Vec<(SmolStr, SmolStr)>,
}

impl DiscriminatorRule {
    pub fn option_for(&self, value: &str) -> Option<&SmolStr> {
        self.variants
            .iter()
            .find(|(literal, _)| literal == value)
            .map(|(_, option)| option)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideTables {
    pub renames: BTreeMap<SmolStr, SmolStr>,
    pub specials: BTreeMap<SmolStr, SpecialType>,
    pub skips: BTreeSet<SmolStr>,
    pub discriminators: BTreeMap<SmolStr, DiscriminatorRule>,
    /// Prefix for the names of unions fabricated from field alternatives
    pub union_prefix: SmolStr,
    pub union_readiness: UnionReadiness,
    pub unknown_types: UnknownTypes,
}

impl Default for OverrideTables {
    fn default() -> Self {
        Self {
            renames: BTreeMap::new(),
            specials: BTreeMap::new(),
            skips: BTreeSet::new(),
            discriminators: BTreeMap::new(),
            union_prefix: SmolStr::new_static(DEFAULT_UNION_PREFIX),
            union_readiness: UnionReadiness::default(),
            unknown_types: UnknownTypes::default(),
        }
    }
}

impl OverrideTables {
    /// Tables shipped with the generator
    pub fn builtin() -> Result<Self> {
        Self::from_kdl(BUILTIN_OVERRIDES)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_kdl(&text)
    }

    pub fn from_kdl(text: &str) -> Result<Self> {
        let doc = text
            .parse::<kdl::KdlDocument>()
            .map_err(|e| CodegenError::invalid_overrides(format!("Failed to parse KDL: {}", e)))?;

        let mut tables = Self::default();

        for node in doc.nodes() {
            match node.name().value() {
                "rename" => {
                    let from = string_arg(node, 0, "rename expects a schema name")?;
                    let to = string_arg(node, 1, "rename expects a target name")?;
                    tables.renames.insert(from, to);
                }
                "skip" => {
                    for entry in node.entries().iter().filter(|e| e.name().is_none()) {
                        let name = entry.value().as_string().ok_or_else(|| {
                            CodegenError::invalid_overrides("skip expects string values")
                        })?;
                        tables.skips.insert(SmolStr::new(name));
                    }
                }
                "special" => {
                    let special = parse_special(node)?;
                    tables.specials.insert(special.name.clone(), special);
                }
                "discriminator" => {
                    let union = string_arg(node, 0, "discriminator expects a union name")?;
                    let rule = parse_discriminator(node, &union)?;
                    if tables.discriminators.insert(union.clone(), rule).is_some() {
                        return Err(CodegenError::invalid_overrides(format!(
                            "Multiple discriminators for {}",
                            union
                        )));
                    }
                }
                "union-prefix" => {
                    tables.union_prefix = string_arg(node, 0, "union-prefix expects a string value")?;
                }
                "union-readiness" => {
                    let value = string_arg(node, 0, "union-readiness expects a string value")?;
                    tables.union_readiness = match value.as_str() {
                        "first-option" => UnionReadiness::FirstOption,
                        "all-options" => UnionReadiness::AllOptions,
                        other => {
                            return Err(CodegenError::invalid_overrides(format!(
                                "Unknown union-readiness: {}",
                                other
                            )));
                        }
                    };
                }
                "unknown-types" => {
                    let value = string_arg(node, 0, "unknown-types expects a string value")?;
                    tables.unknown_types = match value.as_str() {
                        "stall" => UnknownTypes::Stall,
                        "placeholder" => UnknownTypes::Placeholder,
                        other => {
                            return Err(CodegenError::invalid_overrides(format!(
                                "Unknown unknown-types policy: {}",
                                other
                            )));
                        }
                    };
                }
                other => {
                    return Err(CodegenError::invalid_overrides(format!(
                        "Unknown override node: {}",
                        other
                    )));
                }
            }
        }

        Ok(tables)
    }

    /// Emitted name for a schema name
    pub fn renamed(&self, name: &str) -> SmolStr {
        self.renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| SmolStr::new(name))
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skips.contains(name)
    }

    pub fn special(&self, name: &str) -> Option<&SpecialType> {
        self.specials.get(name)
    }

    pub fn discriminator(&self, union: &str) -> Option<&DiscriminatorRule> {
        self.discriminators.get(union)
    }
}

fn string_arg(node: &kdl::KdlNode, index: usize, message: &str) -> Result<SmolStr> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .nth(index)
        .and_then(|e| e.value().as_string())
        .map(SmolStr::new)
        .ok_or_else(|| CodegenError::invalid_overrides(message))
}

fn parse_special(node: &kdl::KdlNode) -> Result<SpecialType> {
    let name = string_arg(node, 0, "special expects a type name as first argument")?;
    let rust_path = node
        .get("type")
        .and_then(|v| v.as_string())
        .ok_or_else(|| {
            CodegenError::invalid_overrides(format!("special {} missing type attribute", name))
        })?
        .to_string();

    if syn::parse_str::<syn::Path>(&rust_path).is_err() {
        return Err(CodegenError::invalid_overrides(format!(
            "special {} has invalid Rust path {}",
            name, rust_path
        )));
    }

    Ok(SpecialType { name, rust_path })
}

fn parse_discriminator(node: &kdl::KdlNode, union: &str) -> Result<DiscriminatorRule> {
    let field = node
        .get("field")
        .and_then(|v| v.as_string())
        .map(SmolStr::new)
        .ok_or_else(|| {
            CodegenError::invalid_overrides(format!(
                "discriminator {} missing field attribute",
                union
            ))
        })?;

    let children = node.children().ok_or_else(|| {
        CodegenError::invalid_overrides(format!("discriminator {} has no variants", union))
    })?;

    let mut variants: Vec<(SmolStr, SmolStr)> = Vec::new();
    for child in children.nodes() {
        match child.name().value() {
            "variant" => {
                let value = string_arg(child, 0, "variant expects a literal value")?;
                let option = string_arg(child, 1, "variant expects an option name")?;
                if variants.iter().any(|(existing, _)| *existing == value) {
                    return Err(CodegenError::invalid_overrides(format!(
                        "discriminator {} maps {} twice",
                        union, value
                    )));
                }
                variants.push((value, option));
            }
            other => {
                return Err(CodegenError::invalid_overrides(format!(
                    "Unknown discriminator field: {}",
                    other
                )));
            }
        }
    }

    Ok(DiscriminatorRule { field, variants })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_parse() {
        let tables = OverrideTables::builtin().expect("builtin overrides");

        assert_eq!(tables.union_prefix, "Either");
        assert_eq!(tables.union_readiness, UnionReadiness::FirstOption);
        assert_eq!(tables.unknown_types, UnknownTypes::Stall);
        assert!(tables.special("InputFile").is_some());

        let chat_member = tables.discriminator("ChatMember").expect("ChatMember rule");
        assert_eq!(chat_member.field, "status");
        assert_eq!(
            chat_member.option_for("kicked").map(|s| s.as_str()),
            Some("ChatMemberBanned")
        );
    }

    #[test]
    fn test_parse_all_nodes() {
        let tables = OverrideTables::from_kdl(
            r#"
            union-prefix "OneOf"
            union-readiness "all-options"
            unknown-types "placeholder"
            rename "Update" "BotUpdate"
            skip "Foo" "Bar"
            special "InputFile" type="crate::files::InputFile"
            discriminator "Animal" field="type" {
                variant "cat" "Cat"
                variant "dog" "Dog"
            }
            "#,
        )
        .expect("parse");

        assert_eq!(tables.union_prefix, "OneOf");
        assert_eq!(tables.union_readiness, UnionReadiness::AllOptions);
        assert_eq!(tables.unknown_types, UnknownTypes::Placeholder);
        assert_eq!(tables.renamed("Update"), "BotUpdate");
        assert_eq!(tables.renamed("Message"), "Message");
        assert!(tables.is_skipped("Foo") && tables.is_skipped("Bar"));
        assert_eq!(
            tables.special("InputFile").map(|s| s.rust_path.as_str()),
            Some("crate::files::InputFile")
        );
        let rule = tables.discriminator("Animal").expect("rule");
        assert_eq!(rule.variants.len(), 2);
        assert_eq!(rule.option_for("dog").map(|s| s.as_str()), Some("Dog"));
        assert_eq!(rule.option_for("fish"), None);
    }

    #[test]
    fn test_rejects_unknown_nodes() {
        let err = OverrideTables::from_kdl("frobnicate \"x\"").expect_err("unknown node");
        assert!(matches!(err, CodegenError::InvalidOverrides { .. }));

        let err = OverrideTables::from_kdl("special \"X\" type=\"not a path\"")
            .expect_err("bad path");
        assert!(err.to_string().contains("invalid Rust path"));
    }

    #[test]
    fn test_rejects_duplicate_literal() {
        let err = OverrideTables::from_kdl(
            r#"
            discriminator "Animal" field="type" {
                variant "cat" "Cat"
                variant "cat" "Kitten"
            }
            "#,
        )
        .expect_err("duplicate literal");
        assert!(err.to_string().contains("maps cat twice"));
    }
}
