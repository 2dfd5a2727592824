//! Error types for the evaluation engine.
//!
//! Each layer of the engine has its own error enum; higher layers wrap the
//! lower ones with `#[from]` so that `?` composes across module boundaries.
//! Compilation errors are fatal to the compile call. Assertion failures at
//! evaluation time are *not* errors — they are captured in the result tree.

use thiserror::Error;

/// Errors from the URI layer.
#[derive(Debug, Error)]
pub enum UriError {
    #[error("'{value}' is not a valid URI: {reason}")]
    Malformed { value: String, reason: String },

    #[error("cannot resolve '{reference}' against non-hierarchical base '{base}'")]
    NotResolvable { reference: String, base: String },

    #[error("'{value}' must be an absolute URI")]
    NotAbsolute { value: String },
}

/// Errors from the JSON Pointer layer.
#[derive(Debug, Error)]
pub enum PointerError {
    #[error("'{value}' is not a valid JSON pointer")]
    Malformed { value: String },

    #[error("'{value}' is not a valid relative JSON pointer")]
    MalformedRelative { value: String },

    #[error("pointer '{pointer}' cannot be evaluated: {reason}")]
    Reference { pointer: String, reason: String },
}

/// Errors from the source layer (URI → raw JSON).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no resource found at '{location}'")]
    NotFound { location: String },

    #[error("failed to read '{location}': {reason}")]
    Read { location: String, reason: String },

    #[error("resource at '{location}' is not valid JSON: {reason}")]
    Parse { location: String, reason: String },
}

/// Errors raised while compiling a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("the schema's metaschema URI has not been set")]
    MissingMetaschema,

    #[error("'{uri}' is not a known metaschema")]
    UnknownMetaschema { uri: String },

    #[error("the metaschema requires an unrecognized vocabulary '{uri}'")]
    UnknownRequiredVocabulary { uri: String },

    #[error("the \"$vocabulary\" keyword must list the core vocabulary with a value of true")]
    MissingCoreVocabulary,

    #[error("illegal \"$id\" value '{value}' at {location}: {reason}")]
    IllegalId {
        value: String,
        location: String,
        reason: String,
    },

    #[error("\"{keyword}\" has an invalid value at {location}: {reason}")]
    InvalidKeywordValue {
        keyword: String,
        location: String,
        reason: String,
    },

    #[error("cyclic keyword dependencies among {keywords:?}")]
    KeywordCycle { keywords: Vec<String> },

    #[error("schema value must be a boolean or an object, found {found}")]
    NotASchema { found: String },

    #[error("'{uri}' is already registered with different content")]
    DuplicateUri { uri: String },

    #[error(transparent)]
    Uri(#[from] UriError),
}

/// Errors from catalog configuration and schema cache operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("a source is not available for '{uri}'")]
    NoSource { uri: String },

    #[error("base URI '{uri}' is invalid for a source registration: {reason}")]
    InvalidSourceBase { uri: String, reason: String },

    #[error("schema not found for '{uri}'")]
    SchemaNotFound { uri: String },

    #[error("the object referenced by '{uri}' is not a schema")]
    NotASchema { uri: String },

    #[error("'{uri}' is already registered in cache '{cache_id}' with different content")]
    DuplicateId { uri: String, cache_id: String },

    #[error("unresolved reference to '{uri}' from {location}")]
    UnresolvedReference { uri: String, location: String },

    #[error("unrecognized vocabulary URI '{uri}'")]
    UnknownVocabulary { uri: String },

    #[error("the schema referenced by '{uri}' is not a metaschema")]
    NotAMetaschema { uri: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    Pointer(#[from] PointerError),
}

/// Errors that abort an evaluation.
///
/// These are structural faults of the compiled schema graph, never
/// instance-validity outcomes.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("reference to '{uri}' was never resolved; call resolve_references first")]
    UnresolvedReference { uri: String },

    #[error("stale schema handle: {reason}")]
    StaleHandle { reason: String },
}

/// Errors from JSON Patch application.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid patch operation at index {index}: {reason}")]
    InvalidOperation { index: usize, reason: String },

    #[error("\"test\" failed at '{path}'")]
    TestFailed { path: String },

    #[error(transparent)]
    Pointer(#[from] PointerError),
}
