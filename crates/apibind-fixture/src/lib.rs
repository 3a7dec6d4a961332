//! Compiled bindings for the `apibind-codegen` fixture schema.
//!
//! `build.rs` runs the generator over `apibind-codegen/tests/fixtures` and the
//! output is included here, so the emitted structs, unions and decoders are
//! type-checked and can be driven with real payloads.
//!
//! The hand-written types below are the ones the fixture overrides point at:
//! `InternalOnly` is skipped by the generator, `InputFile` and `ChatId` are
//! specials.

use serde::{Deserialize, Serialize};

pub mod types {
    include!(concat!(env!("OUT_DIR"), "/generated/types.rs"));
}

mod decode {
    include!(concat!(env!("OUT_DIR"), "/generated/decode.rs"));
}

pub use types::*;

/// File upload, either a file id or the uploaded contents
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct InputFile(pub serde_json::Value);

/// Integer chat id or `@username`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct ChatId(pub serde_json::Value);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct InternalOnly {
    pub token: String,
}
