//! Compiled schema nodes and the handles used to address them.
//!
//! Schemas are arena-allocated inside a catalog cache; all links between
//! schemas — parent, resource root, applicator subschemas, resolved
//! references — are [`SchemaIndex`] values into that arena, so recursive
//! schema graphs never form owning cycles.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::{CatalogError, EvalError};
use crate::evaluator::{evaluate_root, Evaluation};
use crate::json::{JsonNode, JsonType};
use crate::keywords::Keyword;
use crate::pointer::JsonPointer;
use crate::uri::Uri;
use crate::vocabulary::Draft;

/// Index of a schema within its cache's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaIndex(pub(crate) usize);

/// Deferred reference target, filled in by `resolve_references`.
pub(crate) type RefSlot = Arc<OnceLock<SchemaIndex>>;

#[derive(Debug)]
pub(crate) enum SchemaKind {
    Boolean(bool),
    Object,
}

/// A keyword compiled into a schema, in evaluation (topological) order.
pub(crate) struct CompiledKeyword {
    pub(crate) name: String,
    pub(crate) instance_types: Option<&'static [JsonType]>,
    pub(crate) imp: Box<dyn Keyword>,
}

impl std::fmt::Debug for CompiledKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledKeyword")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A compiled (sub)schema node.
#[derive(Debug)]
pub(crate) struct Schema {
    pub(crate) kind: SchemaKind,
    /// Canonical URI: the `$id` for resource roots, otherwise the nearest
    /// identified ancestor's URI plus a JSON Pointer fragment.
    pub(crate) uri: Uri,
    /// The resource base URI (no fragment) for resolving relative references.
    pub(crate) base_uri: Uri,
    pub(crate) metaschema_uri: Uri,
    pub(crate) draft: Draft,
    pub(crate) parent: Option<SchemaIndex>,
    /// The nearest identified ancestor (self, for resource roots).
    pub(crate) resource_root: SchemaIndex,
    /// JSON Pointer from the resource root to this node.
    pub(crate) resource_path: JsonPointer,
    /// The containing document root's URI.
    pub(crate) document_uri: Uri,
    /// JSON Pointer from the document root to this node.
    pub(crate) document_path: JsonPointer,
    /// The raw document value this node was compiled from.
    pub(crate) raw: Value,
    pub(crate) keywords: Vec<CompiledKeyword>,
    /// `$dynamicAnchor` names declared anywhere in this resource
    /// (populated on resource roots only).
    pub(crate) dynamic_anchors: HashMap<String, SchemaIndex>,
    /// Whether this resource root declares `$recursiveAnchor: true`.
    pub(crate) recursive_anchor: bool,
}

impl Schema {
    /// The absolute location of a keyword within this schema, for output.
    pub(crate) fn keyword_location(&self, keyword: &str) -> String {
        let pointer = match self.uri.fragment() {
            Some(fragment) => match JsonPointer::parse_uri_fragment(fragment) {
                Ok(p) => p.child(keyword),
                Err(_) => JsonPointer::from_tokens([keyword]),
            },
            None => JsonPointer::from_tokens([keyword]),
        };
        self.uri
            .with_fragment(Some(&pointer.to_uri_fragment()))
            .to_string()
    }
}

/// An owned, cheap handle addressing a compiled schema in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub(crate) cache_id: String,
    pub(crate) index: SchemaIndex,
}

impl SchemaKey {
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }
}

/// A borrowed view of a compiled schema, tied to its catalog.
#[derive(Clone, Copy)]
pub struct SchemaRef<'c> {
    pub(crate) catalog: &'c Catalog,
    pub(crate) cache_id: &'c str,
    pub(crate) index: SchemaIndex,
}

impl<'c> SchemaRef<'c> {
    pub(crate) fn schema(&self) -> &'c Schema {
        self.catalog.schema_at(self.cache_id, self.index)
    }

    /// The schema's canonical URI.
    pub fn uri(&self) -> &'c Uri {
        &self.schema().uri
    }

    /// The effective base URI for references declared inside the schema.
    pub fn base_uri(&self) -> &'c Uri {
        &self.schema().base_uri
    }

    pub fn metaschema_uri(&self) -> &'c Uri {
        &self.schema().metaschema_uri
    }

    pub fn draft(&self) -> Draft {
        self.schema().draft
    }

    /// The raw JSON this schema was compiled from.
    pub fn raw(&self) -> &'c Value {
        &self.schema().raw
    }

    pub fn key(&self) -> SchemaKey {
        SchemaKey {
            cache_id: self.cache_id.to_string(),
            index: self.index,
        }
    }

    /// Whether every `$ref`-family keyword in this schema's document has
    /// been bound to its target.
    pub fn references_resolved(&self) -> bool {
        self.catalog.references_resolved(self.cache_id, self.index)
    }

    /// Evaluate an instance against this schema, producing a result tree.
    ///
    /// Structural faults (an unresolved reference) are returned as errors;
    /// instance validity is reported through the returned [`Evaluation`].
    pub fn evaluate(&self, instance: &JsonNode) -> Result<Evaluation, EvalError> {
        evaluate_root(self.catalog, self.cache_id, self.index, instance)
    }

    /// Evaluate this schema's raw document against its metaschema.
    pub fn validate(&self) -> Result<Evaluation, CatalogError> {
        let metaschema_uri = self.metaschema_uri().clone();
        let meta = self
            .catalog
            .metaschema_schema(&metaschema_uri)
            .ok_or_else(|| CatalogError::NotAMetaschema {
                uri: metaschema_uri.to_string(),
            })?;
        let instance = JsonNode::from_value(self.raw());
        meta.evaluate(&instance).map_err(|e| match e {
            EvalError::UnresolvedReference { uri } => CatalogError::UnresolvedReference {
                uri,
                location: metaschema_uri.to_string(),
            },
            EvalError::StaleHandle { reason } => CatalogError::SchemaNotFound { uri: reason },
        })
    }
}
