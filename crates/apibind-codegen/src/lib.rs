//! # Typed Rust bindings from declarative web API schemas
//!
//! A schema names record types (fields with textual type references such as
//! `"Array of Message"` or `"Integer or String"`) and union types (a list of
//! subtypes). This crate resolves every name to a concrete Rust type, turns
//! multi-typed fields into shared union enums, and generates the structs,
//! enums and `Deserialize` impls that pick the right union option at runtime.
//!
//! ## Usage
//!
//! The `apibind-codegen` binary runs the whole pipeline:
//!
//! ```bash
//! cargo run -p apibind-codegen -- \
//!     -i ./schema.json \
//!     -o ./src/generated \
//!     -c ./overrides.kdl
//! ```
//!
//! `--dry-run` stops after resolution and prints the report, and
//! `--check <TYPE> <PAYLOAD>` decodes a JSON payload with the same decode
//! plans the generated code uses.
//!
//! ## Pipeline
//!
//! 1. [`schema::Schema`] loads the JSON description.
//! 2. [`overrides::OverrideTables`] loads the KDL override tables.
//! 3. [`resolver::resolve`] reaches a fixed point and fills a
//!    [`registry::TypeRegistry`].
//! 4. [`decode::DecodePlans`] derives the shadow and strategy of each union.
//! 5. [`codegen::CodeGenerator`] renders `types.rs`, `decode.rs` and `mod.rs`.
//!
//! ## Modules
//!
//! - [`basic`] - Scalar schema types and their Rust spelling
//! - [`codegen`] - Rust code generation from a resolved registry
//! - [`decode`] - Union decode plans and a plan interpreter
//! - [`error`] - Fatal errors and generation warnings
//! - [`overrides`] - KDL override tables
//! - [`registry`] - Resolved types, write-once
//! - [`resolver`] - Fixed-point resolution and union synthesis
//! - [`schema`] - Schema document model
//! - [`union_registry`] - Deduplicates unions by option set

pub mod basic;
pub mod codegen;
pub mod decode;
pub mod error;
pub mod overrides;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod union_registry;
