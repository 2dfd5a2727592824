//! A JSON Schema evaluation engine for drafts 2019-09 and 2020-12.
//!
//! Schemas are compiled into a [`Catalog`]: a URI-indexed cache of typed
//! keyword trees with resolved (`$id`, `$anchor`, `$dynamicAnchor`)
//! identifiers. Evaluation walks a compiled schema against a [`JsonNode`]
//! instance, producing a result tree of annotations and errors that reduces
//! to the standard `flag`, `basic`, `detailed`, and `verbose` output
//! formats.
//!
//! # Example
//!
//! ```
//! use json_schema_eval_core::{Catalog, CompileOptions, Draft, JsonNode, OutputFormat};
//! use serde_json::json;
//!
//! let mut catalog = Catalog::create(&[Draft::V2020_12]).unwrap();
//! let key = catalog
//!     .compile(
//!         &json!({
//!             "$schema": "https://json-schema.org/draft/2020-12/schema",
//!             "type": "object",
//!             "properties": { "name": { "type": "string" } },
//!             "required": ["name"]
//!         }),
//!         CompileOptions::default(),
//!     )
//!     .unwrap();
//!
//! let schema = catalog.schema(&key).unwrap();
//! let instance = JsonNode::from_value(&json!({ "name": "widget" }));
//! let result = schema.evaluate(&instance).unwrap();
//! assert!(result.valid());
//! let output = result.output(OutputFormat::Flag);
//! assert_eq!(output, json!({ "valid": true }));
//! ```

pub mod catalog;
pub mod compiler;
mod dialect;
pub mod error;
pub mod evaluator;
pub mod formats;
pub mod json;
pub mod keywords;
pub mod number;
pub mod output;
pub mod patch;
pub mod pointer;
pub mod schema;
pub mod source;
pub mod uri;
pub mod vocabulary;

pub use catalog::{Catalog, METASCHEMA_CACHE};
pub use compiler::{CompileOptions, Compiler, KeywordSite};
pub use error::{
    CatalogError, EvalError, PatchError, PointerError, SchemaError, SourceError, UriError,
};
pub use evaluator::{ErrorKind, EvalContext, Evaluation, ResultError, ResultKind, ResultNode};
pub use formats::{FormatRegistration, FormatValidator};
pub use json::{JsonNode, JsonType, JsonValue};
pub use keywords::Keyword;
pub use number::Number;
pub use output::OutputFormat;
pub use patch::{JsonPatch, PatchOp, PatchOperation};
pub use pointer::{JsonPointer, RelativeJsonPointer, RelativeLocation};
pub use schema::{SchemaKey, SchemaRef};
pub use source::{LocalSource, Source};
pub use uri::Uri;
pub use vocabulary::{Draft, KeywordSpec, Metaschema, Vocabulary};

#[cfg(feature = "remote")]
pub use source::RemoteSource;
