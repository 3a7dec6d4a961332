use miette::{Diagnostic, SourceSpan};
use smol_str::SmolStr;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a generation run
#[derive(Debug, Error, Diagnostic)]
pub enum CodegenError {
    /// IO error when reading the schema or writing output
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse schema JSON
    #[error("Failed to parse schema JSON in {}", path.display())]
    #[diagnostic(
        code(schema::parse_error),
        help("Check that the schema file is valid JSON with `types` and `methods` maps")
    )]
    ParseError {
        #[source]
        source: serde_json::Error,
        /// Path to the file that failed to parse
        path: PathBuf,
        /// Source text that failed to parse
        #[source_code]
        src: Option<String>,
        /// Location of the error in the source
        #[label("parse error here")]
        span: Option<SourceSpan>,
    },

    /// Failed to parse the override tables
    #[error("Invalid override tables: {message}")]
    #[diagnostic(
        code(overrides::invalid),
        help("See overrides.kdl in the apibind-codegen crate for the accepted nodes")
    )]
    InvalidOverrides { message: String },

    /// A full resolution pass made no progress
    #[error("Type resolution stalled with {} unresolved type(s): {}", unresolved.len(), unresolved.join(", "))]
    #[diagnostic(
        code(resolver::stalled),
        help(
            "These types form a cycle of required fields or reference a type that is not defined in the schema"
        )
    )]
    ResolutionStalled {
        /// Names of every type still unresolved, sorted
        unresolved: Vec<SmolStr>,
        /// Number of passes that made progress before the stall
        passes: usize,
    },

    /// A name was resolved twice
    #[error("Type {name} was resolved more than once")]
    #[diagnostic(code(resolver::duplicate))]
    DuplicateResolution { name: SmolStr },

    /// Two options of a union share a field name with incompatible union types
    #[error("Union {union} cannot join field `{field}` across its options")]
    #[diagnostic(
        code(decode::shadow_conflict),
        help("Options {first} and {second} declare `{field}` with different union types; rename one or add a discriminator")
    )]
    ShadowFieldConflict {
        union: SmolStr,
        field: SmolStr,
        first: SmolStr,
        second: SmolStr,
    },

    /// Code formatting error
    #[error("Failed to format generated code for {}", path.display())]
    #[diagnostic(code(codegen::format_error))]
    FormatError {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    /// Generic error with context
    #[error("{message}")]
    #[diagnostic(code(codegen::error))]
    Other {
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CodegenError {
    /// Create a parse error with source text
    pub fn parse_error_with_source(
        source: serde_json::Error,
        path: impl Into<PathBuf>,
        src: String,
    ) -> Self {
        let span = source.line().checked_sub(1).map(|line| {
            let offset = src
                .lines()
                .take(line)
                .map(|l| l.len() + 1)
                .sum::<usize>()
                + source.column().saturating_sub(1);
            SourceSpan::from((offset.min(src.len()), 1))
        });

        Self::ParseError {
            source,
            path: path.into(),
            src: Some(src),
            span,
        }
    }

    /// Create an override table error
    pub fn invalid_overrides(message: impl Into<String>) -> Self {
        Self::InvalidOverrides {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Problems that are reported but do not stop generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationWarning {
    /// Discriminator maps a different number of values than the union has options
    #[error(
        "discriminator for {union} maps {mapped} value(s) but the union has {options} option(s)"
    )]
    DiscriminatorCoverageMismatch {
        union: SmolStr,
        mapped: usize,
        options: usize,
    },

    /// A discriminator rule names a union the schema does not produce
    #[error("discriminator configured for unknown union {union}")]
    UnknownDiscriminatorUnion { union: SmolStr },

    /// The discriminant cannot be read as text from the joined shadow
    #[error("discriminant field `{field}` of {union} is missing or not text; using structural matching")]
    DiscriminatorFieldUnusable { union: SmolStr, field: SmolStr },

    /// A referenced type name has no resolution in any table
    #[error("type {name} referenced by {referrer} has no resolution; emitting a placeholder")]
    UnknownBasicType { name: SmolStr, referrer: SmolStr },

    /// Two options of a union declare the same field with different types
    #[error("field `{field}` of union {union} has different types in {first} and {second}; decoding it as raw JSON")]
    ShadowFieldConflict {
        union: SmolStr,
        field: SmolStr,
        first: SmolStr,
        second: SmolStr,
    },

    /// Alternative types could not be turned into a union
    #[error("field `{field}` of {holder} mixes non-record alternatives ({alternatives}); decoding it as raw JSON")]
    NonRecordAlternatives {
        holder: SmolStr,
        field: SmolStr,
        alternatives: String,
    },

    /// Alternatives nest arrays to different depths
    #[error("field `{field}` of {holder} mixes single values and arrays ({alternatives}); decoding it as raw JSON")]
    MixedArrayAlternatives {
        holder: SmolStr,
        field: SmolStr,
        alternatives: String,
    },
}

impl GenerationWarning {
    /// Log the warning through `tracing`
    pub fn emit(&self) {
        tracing::warn!("{}", self);
    }
}
