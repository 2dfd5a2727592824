//! Recursive schema compiler.
//!
//! Turns raw JSON into arena-allocated [`Schema`] nodes: resolves `$schema`
//! and `$id`, registers canonical URIs and anchors in the cache, constructs
//! keywords through the active metaschema's specs in dependency order, and
//! records `$ref`-family targets for deferred resolution.
//!
//! Keyword factories call back into [`Compiler::subschema`] for every
//! subschema position inside their value, so all knowledge of which raw
//! positions are schemas lives with the keyword that owns them.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::catalog::{Catalog, PendingRef};
use crate::error::SchemaError;
use crate::formats::FormatRegistration;
use crate::keywords::annotation::AnnotationKeyword;
use crate::pointer::JsonPointer;
use crate::schema::{CompiledKeyword, RefSlot, Schema, SchemaIndex, SchemaKind};
use crate::uri::Uri;
use crate::vocabulary::{Draft, KeywordSpec};

/// Options for compiling a schema document (the `Schema(...)` constructor).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// The document's URI; an inner `$id` overrides it.
    pub uri: Option<Uri>,
    /// Default metaschema; an inner `$schema` always wins.
    pub metaschema_uri: Option<Uri>,
    pub cache_id: String,
    /// Resolve all deferred references after compilation (default).
    pub resolve_references: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            uri: None,
            metaschema_uri: None,
            cache_id: "default".to_string(),
            resolve_references: true,
        }
    }
}

impl CompileOptions {
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_metaschema(mut self, uri: Uri) -> Self {
        self.metaschema_uri = Some(uri);
        self
    }

    pub fn with_cache_id(mut self, cache_id: impl Into<String>) -> Self {
        self.cache_id = cache_id.into();
        self
    }

    pub fn deferred(mut self) -> Self {
        self.resolve_references = false;
        self
    }

    pub fn for_draft(self, draft: Draft) -> Self {
        self.with_metaschema(draft.metaschema_uri())
    }
}

/// The position a keyword factory is compiling at.
pub struct KeywordSite<'a> {
    /// The schema node owning the keyword.
    pub schema: SchemaIndex,
    /// The keyword name.
    pub name: &'a str,
    /// The raw schema object the keyword appears in (for keywords that
    /// inspect siblings at compile time, e.g. `additionalProperties`).
    pub parent: &'a Map<String, Value>,
}

/// Per-node compilation context threaded through the recursion.
struct NodeContext {
    parent: Option<SchemaIndex>,
    /// Tokens from the parent schema node to this node.
    tokens: Vec<String>,
    /// Explicit URI for a document root.
    explicit_uri: Option<Uri>,
    metaschema_uri: Uri,
}

/// Where a node sits within its document.
struct DocumentLocation {
    uri: Uri,
    path: JsonPointer,
}

pub struct Compiler<'c> {
    pub(crate) catalog: &'c mut Catalog,
    pub(crate) cache_id: String,
}

impl<'c> Compiler<'c> {
    pub(crate) fn new(catalog: &'c mut Catalog, cache_id: impl Into<String>) -> Self {
        Self {
            catalog,
            cache_id: cache_id.into(),
        }
    }

    /// Compile a document root.
    pub(crate) fn compile_document(
        &mut self,
        raw: &Value,
        uri: Option<Uri>,
        metaschema_uri: Option<Uri>,
    ) -> Result<SchemaIndex, SchemaError> {
        let declared = match raw {
            Value::Object(members) => match members.get("$schema") {
                Some(Value::String(s)) => Some(Uri::parse(s)?),
                Some(_) => {
                    return Err(SchemaError::InvalidKeywordValue {
                        keyword: "$schema".to_string(),
                        location: uri.map(|u| u.to_string()).unwrap_or_default(),
                        reason: "must be a string".to_string(),
                    })
                }
                None => None,
            },
            _ => None,
        };
        // "$schema" wins over the constructor-provided default.
        let metaschema_uri = declared
            .or(metaschema_uri)
            .ok_or(SchemaError::MissingMetaschema)?;
        self.catalog.ensure_metaschema(&metaschema_uri)?;

        self.compile_node(
            raw,
            NodeContext {
                parent: None,
                tokens: Vec::new(),
                explicit_uri: uri.map(|u| u.strip_fragment()),
                metaschema_uri,
            },
        )
    }

    fn compile_node(&mut self, raw: &Value, ctx: NodeContext) -> Result<SchemaIndex, SchemaError> {
        match raw {
            Value::Bool(_) | Value::Object(_) => {}
            other => {
                return Err(SchemaError::NotASchema {
                    found: json_type_name(other).to_string(),
                })
            }
        }
        let members = raw.as_object();

        // --- Metaschema for this node ($schema only at resource roots) ---
        let mut metaschema_uri = ctx.metaschema_uri.clone();
        if let Some(members) = members {
            if let Some(value) = members.get("$schema") {
                let declared = value.as_str().ok_or_else(|| SchemaError::InvalidKeywordValue {
                    keyword: "$schema".to_string(),
                    location: metaschema_uri.to_string(),
                    reason: "must be a string".to_string(),
                })?;
                if ctx.parent.is_some() && !members.contains_key("$id") {
                    return Err(SchemaError::InvalidKeywordValue {
                        keyword: "$schema".to_string(),
                        location: metaschema_uri.to_string(),
                        reason: "may only appear at a schema resource root".to_string(),
                    });
                }
                metaschema_uri = Uri::parse(declared)?;
                self.catalog.ensure_metaschema(&metaschema_uri)?;
            }
        }
        let (draft, kwspecs) = self.catalog.metaschema_bindings(&metaschema_uri)?;

        // --- Identity: $id, base URI, resource root ---
        let parent_info = ctx.parent.map(|parent| {
            let schema = self.catalog.schema_at(&self.cache_id, parent);
            (
                schema.base_uri.clone(),
                schema.resource_root,
                schema.resource_path.clone(),
            )
        });

        let mut tolerated_anchor: Option<String> = None;
        let declared_id = match members.and_then(|m| m.get("$id")) {
            Some(Value::String(id)) => {
                let resolved = match Uri::parse(id) {
                    Ok(uri) => uri,
                    Err(_) => {
                        let base = parent_info
                            .as_ref()
                            .map(|(base, _, _)| base.clone())
                            .or_else(|| ctx.explicit_uri.clone())
                            .ok_or_else(|| SchemaError::IllegalId {
                                value: id.clone(),
                                location: ctx.metaschema_uri.to_string(),
                                reason: "no base URI against which to resolve".to_string(),
                            })?;
                        base.resolve(id)?
                    }
                };
                match resolved.fragment() {
                    None | Some("") => {}
                    Some(fragment) if draft == Draft::V2019_09 && !fragment.contains('/') => {
                        // 2019-09 tolerates plain-name fragments as anchors.
                        tracing::warn!(
                            id = %id,
                            "plain-name fragment in \"$id\" treated as an anchor"
                        );
                        tolerated_anchor = Some(fragment.to_string());
                    }
                    Some(_) => {
                        return Err(SchemaError::IllegalId {
                            value: id.clone(),
                            location: resolved.to_string(),
                            reason: "must not contain a non-empty fragment".to_string(),
                        })
                    }
                }
                Some(resolved.strip_fragment())
            }
            Some(_) => {
                return Err(SchemaError::IllegalId {
                    value: String::new(),
                    location: ctx.metaschema_uri.to_string(),
                    reason: "must be a string".to_string(),
                })
            }
            None => None,
        };

        let index = SchemaIndex(self.catalog.arena_len(&self.cache_id));
        let (uri, base_uri, resource_root, resource_path) = match (&declared_id, &parent_info) {
            (Some(id), _) => (id.clone(), id.clone(), index, JsonPointer::root()),
            (None, Some((base, root, path))) => {
                let resource_path = ctx
                    .tokens
                    .iter()
                    .fold(path.clone(), |p, token| p.child(token.clone()));
                let uri = base.with_fragment(Some(&resource_path.to_uri_fragment()));
                (uri, base.clone(), *root, resource_path)
            }
            (None, None) => {
                let uri = ctx
                    .explicit_uri
                    .clone()
                    .unwrap_or_else(Uri::random_urn);
                (uri.clone(), uri, index, JsonPointer::root())
            }
        };

        let document = match ctx.parent {
            Some(parent) => {
                let schema = self.catalog.schema_at(&self.cache_id, parent);
                DocumentLocation {
                    uri: schema.document_uri.clone(),
                    path: ctx
                        .tokens
                        .iter()
                        .fold(schema.document_path.clone(), |p, token| {
                            p.child(token.clone())
                        }),
                }
            }
            None => DocumentLocation {
                uri: base_uri.clone(),
                path: JsonPointer::root(),
            },
        };

        let kind = match raw {
            Value::Bool(b) => SchemaKind::Boolean(*b),
            _ => SchemaKind::Object,
        };
        tracing::trace!(uri = %uri, "compiling schema node");
        self.catalog.push_schema(
            &self.cache_id,
            Schema {
                kind,
                uri: uri.clone(),
                base_uri: base_uri.clone(),
                metaschema_uri: metaschema_uri.clone(),
                draft,
                parent: ctx.parent,
                resource_root,
                resource_path,
                document_uri: document.uri.clone(),
                document_path: document.path.clone(),
                raw: raw.clone(),
                keywords: Vec::new(),
                dynamic_anchors: HashMap::new(),
                recursive_anchor: false,
            },
        );
        self.catalog
            .register_uri(&self.cache_id, uri.clone(), index, raw)?;

        // Secondary registration under the document-rooted pointer, so that
        // pointer references crossing an embedded resource boundary resolve.
        if ctx.parent.is_some() && declared_id.is_some() {
            let aliased = document
                .uri
                .with_fragment(Some(&document.path.to_uri_fragment()));
            self.catalog
                .register_uri(&self.cache_id, aliased, index, raw)?;
        }

        let members = match raw.as_object() {
            Some(members) => members,
            None => return Ok(index), // boolean schema: no keywords
        };

        // --- Anchors ---
        if let Some(name) = &tolerated_anchor {
            self.register_anchor(&base_uri, name, index, raw)?;
        }
        if kwspecs.contains_key("$anchor") {
            if let Some(value) = members.get("$anchor") {
                let name = anchor_name(value, "$anchor", &uri)?;
                self.register_anchor(&base_uri, &name, index, raw)?;
            }
        }
        if kwspecs.contains_key("$dynamicAnchor") {
            if let Some(value) = members.get("$dynamicAnchor") {
                let name = anchor_name(value, "$dynamicAnchor", &uri)?;
                self.register_anchor(&base_uri, &name, index, raw)?;
                self.catalog
                    .add_dynamic_anchor(&self.cache_id, resource_root, &name, index);
            }
        }
        if kwspecs.contains_key("$recursiveAnchor") {
            if let Some(value) = members.get("$recursiveAnchor") {
                if value.as_bool() == Some(true) {
                    self.catalog.set_recursive_anchor(&self.cache_id, index);
                }
            }
        }

        // --- Keyword construction ---
        const BOOTSTRAP: &[&str] = &[
            "$schema",
            "$id",
            "$anchor",
            "$dynamicAnchor",
            "$recursiveAnchor",
        ];

        let mut evaluable: Vec<(&String, Option<&'static KeywordSpec>)> = Vec::new();
        for (name, value) in members {
            match kwspecs.get(name.as_str()).copied() {
                Some(spec) if BOOTSTRAP.contains(&name.as_str()) => {
                    let _ = spec; // bootstrapped above
                }
                Some(spec) if spec.compile_only => {
                    let site = KeywordSite {
                        schema: index,
                        name,
                        parent: members,
                    };
                    (spec.factory)(self, &site, value)?;
                }
                Some(spec) => evaluable.push((name, Some(spec))),
                // Unknown keywords become annotations.
                None => evaluable.push((name, None)),
            }
        }

        let ordered = order_by_dependencies(&evaluable)?;
        let mut keywords = Vec::with_capacity(ordered.len());
        for position in ordered {
            let (name, spec) = evaluable[position];
            let value = &members[name.as_str()];
            let compiled = match spec {
                Some(spec) => {
                    let site = KeywordSite {
                        schema: index,
                        name,
                        parent: members,
                    };
                    CompiledKeyword {
                        name: name.clone(),
                        instance_types: spec.instance_types,
                        imp: (spec.factory)(self, &site, value)?,
                    }
                }
                None => CompiledKeyword {
                    name: name.clone(),
                    instance_types: None,
                    imp: Box::new(AnnotationKeyword::new(value.clone())),
                },
            };
            keywords.push(compiled);
        }
        self.catalog
            .set_keywords(&self.cache_id, index, keywords);

        Ok(index)
    }

    fn register_anchor(
        &mut self,
        base_uri: &Uri,
        name: &str,
        index: SchemaIndex,
        raw: &Value,
    ) -> Result<(), SchemaError> {
        let uri = base_uri.resolve(&format!("#{name}"))?;
        self.catalog
            .register_uri(&self.cache_id, uri, index, raw)?;
        Ok(())
    }

    // -- Factory support ---------------------------------------------------

    /// Compile a subschema at `tokens` under the owning schema node.
    pub fn subschema(
        &mut self,
        site: &KeywordSite<'_>,
        tokens: &[&str],
        raw: &Value,
    ) -> Result<SchemaIndex, SchemaError> {
        let metaschema_uri = self
            .catalog
            .schema_at(&self.cache_id, site.schema)
            .metaschema_uri
            .clone();
        self.compile_node(
            raw,
            NodeContext {
                parent: Some(site.schema),
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
                explicit_uri: None,
                metaschema_uri,
            },
        )
    }

    /// Resolve a URI reference against the owning schema's base URI.
    pub fn resolve_against_base(
        &self,
        owner: SchemaIndex,
        reference: &str,
    ) -> Result<Uri, SchemaError> {
        let base = &self.catalog.schema_at(&self.cache_id, owner).base_uri;
        Ok(base.resolve(reference)?)
    }

    /// Register a deferred reference; the returned slot is filled by
    /// `resolve_references`.
    pub fn defer_reference(&mut self, site: &KeywordSite<'_>, uri: Uri) -> RefSlot {
        let metaschema_uri = self
            .catalog
            .schema_at(&self.cache_id, site.schema)
            .metaschema_uri
            .clone();
        let slot = RefSlot::default();
        self.catalog.push_pending(
            &self.cache_id,
            PendingRef {
                owner: site.schema,
                keyword: site.name.to_string(),
                uri,
                metaschema_uri,
                slot: slot.clone(),
            },
        );
        slot
    }

    /// An `InvalidKeywordValue` error located at the compiling site.
    pub fn invalid(&self, site: &KeywordSite<'_>, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidKeywordValue {
            keyword: site.name.to_string(),
            location: self
                .catalog
                .schema_at(&self.cache_id, site.schema)
                .uri
                .to_string(),
            reason: reason.into(),
        }
    }

    /// The registration for an *enabled* format, if any.
    pub(crate) fn enabled_format(&self, name: &str) -> Option<FormatRegistration> {
        self.catalog.enabled_format(name)
    }
}

/// Stable topological order of keywords by their `depends_on` declarations.
///
/// Preserves source order among independent keywords; dependencies on
/// keywords absent from the schema are ignored.
fn order_by_dependencies(
    entries: &[(&String, Option<&'static KeywordSpec>)],
) -> Result<Vec<usize>, SchemaError> {
    let present: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    let mut emitted = vec![false; entries.len()];
    let mut order = Vec::with_capacity(entries.len());

    while order.len() < entries.len() {
        let mut progressed = false;
        for (position, (name, spec)) in entries.iter().enumerate() {
            if emitted[position] {
                continue;
            }
            let deps: &[&str] = spec.map(|s| s.depends_on).unwrap_or(&[]);
            let ready = deps.iter().all(|dep| {
                match present.iter().position(|p| p == dep) {
                    Some(dep_position) => emitted[dep_position],
                    None => true,
                }
            });
            if ready {
                emitted[position] = true;
                order.push(position);
                progressed = true;
            }
            let _ = name;
        }
        if !progressed {
            let stuck: Vec<String> = entries
                .iter()
                .enumerate()
                .filter(|(position, _)| !emitted[*position])
                .map(|(_, (name, _))| name.to_string())
                .collect();
            return Err(SchemaError::KeywordCycle { keywords: stuck });
        }
    }
    Ok(order)
}

fn anchor_name(value: &Value, keyword: &str, location: &Uri) -> Result<String, SchemaError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::InvalidKeywordValue {
            keyword: keyword.to_string(),
            location: location.to_string(),
            reason: "must be a string".to_string(),
        })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
