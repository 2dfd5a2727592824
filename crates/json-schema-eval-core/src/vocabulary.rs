//! Vocabularies, keyword specifications, and metaschemas.
//!
//! A [`Vocabulary`] is an identified set of [`KeywordSpec`]s. A
//! [`Metaschema`] declares (via `$vocabulary`) which vocabularies are
//! active, which in turn determines the keyword names the compiler
//! recognizes. Everything else compiles to an annotation-only collector.
//!
//! Built-in specs live in `dialect.rs` as const tables; custom keywords
//! plug in by registering additional vocabularies carrying their own specs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::{Compiler, KeywordSite};
use crate::error::SchemaError;
use crate::json::JsonType;
use crate::keywords::Keyword;
use crate::schema::SchemaIndex;
use crate::uri::Uri;

/// The supported JSON Schema drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Draft {
    #[serde(rename = "2019-09")]
    V2019_09,
    #[serde(rename = "2020-12")]
    V2020_12,
}

impl Draft {
    /// The URI of the draft's standard metaschema.
    pub fn metaschema_uri(&self) -> Uri {
        let uri = match self {
            Draft::V2019_09 => "https://json-schema.org/draft/2019-09/schema",
            Draft::V2020_12 => "https://json-schema.org/draft/2020-12/schema",
        };
        Uri::parse(uri).expect("draft metaschema URIs are valid")
    }

    /// The URI of the draft's core vocabulary.
    pub fn core_vocabulary_uri(&self) -> Uri {
        let uri = match self {
            Draft::V2019_09 => "https://json-schema.org/draft/2019-09/vocab/core",
            Draft::V2020_12 => "https://json-schema.org/draft/2020-12/vocab/core",
        };
        Uri::parse(uri).expect("draft vocabulary URIs are valid")
    }
}

/// Constructor for a keyword implementation.
///
/// Called by the compiler for every occurrence of the keyword; subschema
/// positions inside the value are compiled by calling back into the
/// [`Compiler`].
pub type KeywordFactory =
    fn(&mut Compiler<'_>, &KeywordSite<'_>, &Value) -> Result<Box<dyn Keyword>, SchemaError>;

/// Declarative description of a keyword: its name, evaluation constraints,
/// and how to compile its value.
pub struct KeywordSpec {
    pub name: &'static str,
    /// Keywords that must be evaluated before this one within a schema node.
    pub depends_on: &'static [&'static str],
    /// If set, evaluation is skipped for instances of other types.
    pub instance_types: Option<&'static [JsonType]>,
    /// Compile-time-only keywords ($id, $schema, anchors, $defs) never
    /// appear in the evaluation list.
    pub compile_only: bool,
    pub factory: KeywordFactory,
}

impl std::fmt::Debug for KeywordSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordSpec")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("compile_only", &self.compile_only)
            .finish_non_exhaustive()
    }
}

/// An identified set of keyword bindings.
#[derive(Debug)]
pub struct Vocabulary {
    pub(crate) uri: Uri,
    pub(crate) keywords: Vec<&'static KeywordSpec>,
}

impl Vocabulary {
    pub fn new(uri: Uri, keywords: Vec<&'static KeywordSpec>) -> Self {
        Self { uri, keywords }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

/// A metaschema: the keyword-name → spec binding active for schemas that
/// reference it, plus the draft it belongs to.
#[derive(Debug)]
pub struct Metaschema {
    pub(crate) uri: Uri,
    pub(crate) draft: Draft,
    pub(crate) vocabulary_uris: Vec<Uri>,
    pub(crate) kwspecs: HashMap<&'static str, &'static KeywordSpec>,
    /// The compiled metaschema document, in the metaschema cache.
    pub(crate) schema: Option<SchemaIndex>,
}

impl Metaschema {
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn draft(&self) -> Draft {
        self.draft
    }

    pub fn vocabulary_uris(&self) -> &[Uri] {
        &self.vocabulary_uris
    }

    pub(crate) fn spec(&self, keyword: &str) -> Option<&'static KeywordSpec> {
        self.kwspecs.get(keyword).copied()
    }
}
