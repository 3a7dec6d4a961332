//! In-memory model of an API description.
//!
//! The document shape is a `types` map and a `methods` map keyed by name.
//! Field types are textual references such as `"Integer"`, `"Message"` or
//! `"Array of Array of PhotoSize"`.

use crate::error::{CodegenError, Result};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

const ARRAY_PREFIX: &str = "Array of ";

/// A complete API description
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Schema {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub types: BTreeMap<SmolStr, SchemaType>,
    /// Callable operations. Only consumed by operation wrapper generators.
    #[serde(default)]
    pub methods: BTreeMap<SmolStr, SchemaMethod>,
}

/// A named type. Types with subtypes are unions, everything else is a record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SchemaType {
    pub name: SmolStr,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(default)]
    pub subtype_of: Vec<SmolStr>,
    #[serde(default)]
    pub subtypes: Vec<SmolStr>,
}

impl SchemaType {
    pub fn is_union(&self) -> bool {
        !self.subtypes.is_empty()
    }

    /// Description paragraphs joined for doc comments
    pub fn doc(&self) -> Option<String> {
        if self.description.is_empty() {
            None
        } else {
            Some(self.description.join("\n\n"))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SchemaField {
    pub name: SmolStr,
    pub types: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl SchemaField {
    /// Parsed alternative type references
    pub fn type_refs(&self) -> Vec<TypeRef> {
        self.types.iter().map(|t| TypeRef::parse(t)).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SchemaMethod {
    pub name: SmolStr,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub returns: Vec<String>,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// A type reference with its array wrapping peeled off
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    pub base: SmolStr,
    pub array_depth: usize,
}

impl TypeRef {
    /// Parse `"Array of Array of X"` into `X` with depth 2
    pub fn parse(text: &str) -> Self {
        let mut rest = text.trim();
        let mut array_depth = 0;
        while let Some(inner) = rest.strip_prefix(ARRAY_PREFIX) {
            rest = inner.trim_start();
            array_depth += 1;
        }
        Self {
            base: SmolStr::new(rest),
            array_depth,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_depth > 0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.array_depth {
            f.write_str(ARRAY_PREFIX)?;
        }
        f.write_str(&self.base)
    }
}

impl Schema {
    /// Parse a schema from JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Load a schema document from disk
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match Self::from_json(&content) {
            Ok(schema) => {
                tracing::debug!(
                    types = schema.types.len(),
                    methods = schema.methods.len(),
                    "loaded schema from {}",
                    path.display()
                );
                Ok(schema)
            }
            Err(e) => Err(CodegenError::parse_error_with_source(e, path, content)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    /// Check if a type is defined
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterate over all types in name order
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &SchemaType)> {
        self.types.iter()
    }

    /// Number of defined types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_ref() {
        assert_eq!(
            TypeRef::parse("Array of Array of PhotoSize"),
            TypeRef {
                base: "PhotoSize".into(),
                array_depth: 2
            }
        );
        assert_eq!(TypeRef::parse("Integer").array_depth, 0);
        assert_eq!(
            TypeRef::parse("Array of Message").to_string(),
            "Array of Message"
        );
    }

    #[test]
    fn test_load_fixture() {
        let schema = Schema::load_from_file("tests/fixtures/schema.json").expect("load schema");

        assert!(!schema.is_empty());
        let animal = schema.get("Animal").expect("Animal is defined");
        assert!(animal.is_union());
        assert_eq!(animal.subtypes, vec![SmolStr::new("Cat"), SmolStr::new("Dog")]);

        let cat = schema.get("Cat").expect("Cat is defined");
        assert!(!cat.is_union());
        assert_eq!(cat.subtype_of, vec![SmolStr::new("Animal")]);
        assert!(schema.methods.contains_key("getPet"));
    }

    #[test]
    fn test_parse_error_points_at_source() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\n  \"types\": [}\n").expect("write");

        let err = Schema::load_from_file(&path).expect_err("invalid json");
        match err {
            CodegenError::ParseError { src, span, .. } => {
                assert!(src.is_some());
                assert!(span.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
