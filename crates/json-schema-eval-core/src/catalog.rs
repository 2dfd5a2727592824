//! The catalog: schema caches, URI sources, vocabularies, metaschemas, and
//! the format-validator registry.
//!
//! A catalog holds any number of named caches; references never cross cache
//! boundaries. Metaschemas live in the dedicated `__meta__` cache. Each
//! cache is an arena of compiled schemas plus a URI index and the list of
//! deferred references awaiting `resolve_references`.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::compiler::{CompileOptions, Compiler};
use crate::error::{CatalogError, SchemaError};
use crate::formats::{FormatRegistration, FormatValidator};
use crate::json::JsonType;
use crate::pointer::JsonPointer;
use crate::schema::{CompiledKeyword, RefSlot, Schema, SchemaIndex, SchemaKey, SchemaRef};
use crate::source::Source;
use crate::uri::Uri;
use crate::vocabulary::{Draft, KeywordSpec, Metaschema, Vocabulary};

/// The cache metaschemas are compiled into.
pub const METASCHEMA_CACHE: &str = "__meta__";

/// A deferred `$ref`-family binding.
#[derive(Clone)]
pub(crate) struct PendingRef {
    pub(crate) owner: SchemaIndex,
    pub(crate) keyword: String,
    pub(crate) uri: Uri,
    pub(crate) metaschema_uri: Uri,
    pub(crate) slot: RefSlot,
}

/// One named schema cache: arena plus URI index.
#[derive(Default)]
pub(crate) struct SchemaCache {
    pub(crate) arena: Vec<Schema>,
    pub(crate) by_uri: HashMap<Uri, SchemaIndex>,
    pub(crate) pending: Vec<PendingRef>,
}

/// Schema cache, source registry, vocabulary registry, and format registry.
pub struct Catalog {
    sources: Vec<(String, Box<dyn Source>)>,
    vocabularies: HashMap<Uri, Vocabulary>,
    metaschemas: HashMap<Uri, Metaschema>,
    caches: HashMap<String, SchemaCache>,
    formats: HashMap<String, FormatRegistration>,
    enabled_formats: HashSet<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// An empty catalog with no sources, vocabularies, or metaschemas.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            vocabularies: HashMap::new(),
            metaschemas: HashMap::new(),
            caches: HashMap::new(),
            formats: HashMap::new(),
            enabled_formats: HashSet::new(),
        }
    }

    /// A catalog initialized for the given drafts: built-in vocabularies,
    /// embedded metaschema documents, bundled format validators (disabled
    /// until [`Catalog::enable_formats`]), and the drafts' metaschemas.
    pub fn create(drafts: &[Draft]) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for draft in drafts {
            crate::dialect::register(&mut catalog, *draft)?;
        }
        for (name, registration) in crate::formats::builtin_registrations() {
            catalog.formats.insert(name.to_string(), registration);
        }
        for draft in drafts {
            catalog.create_metaschema(
                &draft.metaschema_uri(),
                Some(&draft.core_vocabulary_uri()),
                &[],
            )?;
        }
        Ok(catalog)
    }

    // -- Sources -----------------------------------------------------------

    /// Register a source for URIs under `base_uri` (which must end in `/`);
    /// `None` registers a fallback for any URI. At lookup time the longest
    /// matching prefix wins, later registrations winning ties.
    pub fn add_uri_source(
        &mut self,
        base_uri: Option<&Uri>,
        source: impl Source + 'static,
    ) -> Result<(), CatalogError> {
        let prefix = match base_uri {
            Some(uri) => {
                if uri.has_fragment() {
                    return Err(CatalogError::InvalidSourceBase {
                        uri: uri.to_string(),
                        reason: "must not carry a fragment".to_string(),
                    });
                }
                if !uri.as_str().ends_with('/') {
                    return Err(CatalogError::InvalidSourceBase {
                        uri: uri.to_string(),
                        reason: "must end with '/'".to_string(),
                    });
                }
                uri.to_string()
            }
            None => String::new(),
        };
        self.sources.push((prefix, Box::new(source)));
        Ok(())
    }

    /// Load the raw JSON document for `uri` from the registered sources.
    pub fn load_json(&self, uri: &Uri) -> Result<Value, CatalogError> {
        let target = uri.strip_fragment();
        let target = target.as_str();
        let mut best: Option<(usize, &dyn Source)> = None;
        for (prefix, source) in &self.sources {
            if target.starts_with(prefix.as_str()) {
                // >= keeps the later registration on equal length.
                if best.map_or(true, |(len, _)| prefix.len() >= len) {
                    best = Some((prefix.len(), source.as_ref()));
                }
            }
        }
        let (prefix_len, source) = best.ok_or_else(|| CatalogError::NoSource {
            uri: target.to_string(),
        })?;
        tracing::debug!(uri = target, "loading schema document");
        Ok(source.load(&target[prefix_len..])?)
    }

    // -- Vocabularies and metaschemas ---------------------------------------

    /// Register a vocabulary of keyword specs under its URI.
    pub fn create_vocabulary(&mut self, uri: Uri, keywords: Vec<&'static KeywordSpec>) {
        self.vocabularies
            .insert(uri.clone(), Vocabulary::new(uri, keywords));
    }

    pub fn get_vocabulary(&self, uri: &Uri) -> Result<&Vocabulary, CatalogError> {
        self.vocabularies
            .get(uri)
            .ok_or_else(|| CatalogError::UnknownVocabulary {
                uri: uri.to_string(),
            })
    }

    /// Load, bind, and compile a metaschema.
    ///
    /// The document's `$vocabulary` determines the active keyword set; in
    /// its absence `default_core_vocabulary` plus `default_vocabularies`
    /// apply. An unrecognized required vocabulary is an error; unrecognized
    /// optional vocabularies are ignored with a warning.
    pub fn create_metaschema(
        &mut self,
        uri: &Uri,
        default_core_vocabulary: Option<&Uri>,
        default_vocabularies: &[Uri],
    ) -> Result<(), CatalogError> {
        let document = self.load_json(&uri.strip_fragment())?;
        let declared = document.get("$vocabulary").and_then(Value::as_object);

        let core_candidates = [
            Draft::V2019_09.core_vocabulary_uri(),
            Draft::V2020_12.core_vocabulary_uri(),
        ];
        let core_uri = match declared {
            Some(map) => core_candidates
                .iter()
                .find(|candidate| {
                    map.get(candidate.as_str()).and_then(Value::as_bool) == Some(true)
                })
                .cloned()
                .ok_or(SchemaError::MissingCoreVocabulary)?,
            None => default_core_vocabulary
                .cloned()
                .ok_or(SchemaError::MissingCoreVocabulary)?,
        };
        let draft = if core_uri == Draft::V2019_09.core_vocabulary_uri() {
            Draft::V2019_09
        } else {
            Draft::V2020_12
        };

        let mut kwspecs: HashMap<&'static str, &'static KeywordSpec> = HashMap::new();
        let mut vocabulary_uris = Vec::new();
        let mut bind = |vocabulary: &Vocabulary, uris: &mut Vec<Uri>| {
            for spec in &vocabulary.keywords {
                kwspecs.insert(spec.name, *spec);
            }
            uris.push(vocabulary.uri.clone());
        };
        match declared {
            Some(map) => {
                for (vocab_uri, required) in map {
                    let vocab_uri = Uri::parse(vocab_uri).map_err(SchemaError::from)?;
                    match self.vocabularies.get(&vocab_uri) {
                        Some(vocabulary) => bind(vocabulary, &mut vocabulary_uris),
                        None if required.as_bool() == Some(true) => {
                            return Err(SchemaError::UnknownRequiredVocabulary {
                                uri: vocab_uri.to_string(),
                            }
                            .into())
                        }
                        None => {
                            tracing::warn!(
                                vocabulary = %vocab_uri,
                                "ignoring unrecognized optional vocabulary"
                            );
                        }
                    }
                }
            }
            None => {
                bind(self.get_vocabulary(&core_uri)?, &mut vocabulary_uris);
                for vocab_uri in default_vocabularies {
                    bind(self.get_vocabulary(vocab_uri)?, &mut vocabulary_uris);
                }
            }
        }

        self.metaschemas.insert(
            uri.clone(),
            Metaschema {
                uri: uri.clone(),
                draft,
                vocabulary_uris,
                kwspecs,
                schema: None,
            },
        );

        let index = {
            let mut compiler = Compiler::new(self, METASCHEMA_CACHE);
            compiler
                .compile_document(&document, Some(uri.clone()), Some(uri.clone()))
                .map_err(|e| promote(e, METASCHEMA_CACHE))?
        };
        self.resolve_references(METASCHEMA_CACHE)?;
        if let Some(metaschema) = self.metaschemas.get_mut(uri) {
            metaschema.schema = Some(index);
        }
        tracing::debug!(uri = %uri, "metaschema created");
        Ok(())
    }

    pub fn get_metaschema(&self, uri: &Uri) -> Result<&Metaschema, CatalogError> {
        self.metaschemas
            .get(uri)
            .ok_or_else(|| CatalogError::NotAMetaschema {
                uri: uri.to_string(),
            })
    }

    /// Make sure `uri` names a known metaschema, attempting to create it
    /// from sources (driven by its own `$vocabulary`) when unknown.
    pub(crate) fn ensure_metaschema(&mut self, uri: &Uri) -> Result<(), SchemaError> {
        if self.metaschemas.contains_key(uri) {
            return Ok(());
        }
        self.create_metaschema(uri, None, &[]).map_err(|error| {
            tracing::debug!(metaschema = %uri, %error, "metaschema auto-creation failed");
            SchemaError::UnknownMetaschema {
                uri: uri.to_string(),
            }
        })
    }

    pub(crate) fn metaschema_bindings(
        &self,
        uri: &Uri,
    ) -> Result<(Draft, HashMap<&'static str, &'static KeywordSpec>), SchemaError> {
        let metaschema = self
            .metaschemas
            .get(uri)
            .ok_or_else(|| SchemaError::UnknownMetaschema {
                uri: uri.to_string(),
            })?;
        Ok((metaschema.draft, metaschema.kwspecs.clone()))
    }

    pub(crate) fn metaschema_schema(&self, uri: &Uri) -> Option<SchemaRef<'_>> {
        let index = self.metaschemas.get(uri)?.schema?;
        Some(SchemaRef {
            catalog: self,
            cache_id: METASCHEMA_CACHE,
            index,
        })
    }

    // -- Formats -----------------------------------------------------------

    /// Register a format validator; it only asserts once the format is also
    /// enabled.
    pub fn register_format_validator(
        &mut self,
        name: impl Into<String>,
        instance_types: Vec<JsonType>,
        validator: FormatValidator,
    ) {
        self.formats.insert(
            name.into(),
            FormatRegistration {
                validator,
                instance_types,
            },
        );
    }

    /// Opt in to assertion behavior for the named formats.
    pub fn enable_formats(&mut self, names: &[&str]) {
        self.enabled_formats.extend(names.iter().map(|n| n.to_string()));
    }

    pub fn is_format_enabled(&self, name: &str) -> bool {
        self.enabled_formats.contains(name)
    }

    pub(crate) fn enabled_format(&self, name: &str) -> Option<FormatRegistration> {
        if self.is_format_enabled(name) {
            self.formats.get(name).cloned()
        } else {
            None
        }
    }

    // -- Compilation and lookup ----------------------------------------------

    /// Compile a raw schema document (the `Schema(...)` constructor).
    pub fn compile(
        &mut self,
        raw: &Value,
        options: CompileOptions,
    ) -> Result<SchemaKey, CatalogError> {
        let cache_id = options.cache_id.clone();
        let index = {
            let mut compiler = Compiler::new(self, cache_id.as_str());
            compiler
                .compile_document(raw, options.uri, options.metaschema_uri)
                .map_err(|e| promote(e, &cache_id))?
        };
        if options.resolve_references {
            self.resolve_references(&cache_id)?;
        }
        Ok(SchemaKey { cache_id, index })
    }

    /// Get a schema by URI, loading and compiling it from sources on a cache
    /// miss, then re-applying any fragment.
    pub fn get_schema(
        &mut self,
        uri: &Uri,
        cache_id: &str,
        metaschema_uri: Option<&Uri>,
    ) -> Result<SchemaKey, CatalogError> {
        if let Some(key) = self.lookup_schema(uri, cache_id) {
            return Ok(key);
        }
        let index = self.resolve_uri(cache_id, uri, metaschema_uri)?;
        self.resolve_references(cache_id)?;
        Ok(SchemaKey {
            cache_id: cache_id.to_string(),
            index,
        })
    }

    /// Cache-only lookup, without loading.
    pub fn lookup_schema(&self, uri: &Uri, cache_id: &str) -> Option<SchemaKey> {
        let index = self.uri_index(cache_id, uri)?;
        Some(SchemaKey {
            cache_id: cache_id.to_string(),
            index,
        })
    }

    /// Borrow a compiled schema through its key.
    pub fn schema<'a>(&'a self, key: &'a SchemaKey) -> Result<SchemaRef<'a>, CatalogError> {
        let cache = self
            .caches
            .get(&key.cache_id)
            .ok_or_else(|| CatalogError::SchemaNotFound {
                uri: format!("cache '{}'", key.cache_id),
            })?;
        if key.index.0 >= cache.arena.len() {
            return Err(CatalogError::SchemaNotFound {
                uri: format!("index {} in cache '{}'", key.index.0, key.cache_id),
            });
        }
        Ok(SchemaRef {
            catalog: self,
            cache_id: &key.cache_id,
            index: key.index,
        })
    }

    /// Resolve every deferred reference in the cache to a fixpoint,
    /// compiling newly referenced documents as they surface.
    pub fn resolve_references(&mut self, cache_id: &str) -> Result<(), CatalogError> {
        loop {
            let unresolved: Vec<PendingRef> = match self.caches.get(cache_id) {
                Some(cache) => cache
                    .pending
                    .iter()
                    .filter(|p| p.slot.get().is_none())
                    .cloned()
                    .collect(),
                None => return Ok(()),
            };
            if unresolved.is_empty() {
                return Ok(());
            }
            for pending in unresolved {
                let index = self
                    .resolve_uri(cache_id, &pending.uri, Some(&pending.metaschema_uri))
                    .map_err(|error| match error {
                        CatalogError::SchemaNotFound { .. } | CatalogError::NoSource { .. } => {
                            CatalogError::UnresolvedReference {
                                uri: pending.uri.to_string(),
                                location: format!(
                                    "\"{}\" in {}",
                                    pending.keyword,
                                    self.schema_at(cache_id, pending.owner).uri
                                ),
                            }
                        }
                        other => other,
                    })?;
                let _ = pending.slot.set(index);
            }
        }
    }

    /// Whether all references in the document containing `index` are bound.
    pub(crate) fn references_resolved(&self, cache_id: &str, index: SchemaIndex) -> bool {
        let cache = match self.caches.get(cache_id) {
            Some(cache) => cache,
            None => return false,
        };
        let document_uri = &cache.arena[index.0].document_uri;
        !cache.pending.iter().any(|p| {
            p.slot.get().is_none() && &cache.arena[p.owner.0].document_uri == document_uri
        })
    }

    /// Resolve a URI to a compiled schema, loading its document on a miss
    /// and applying any pointer or anchor fragment.
    fn resolve_uri(
        &mut self,
        cache_id: &str,
        uri: &Uri,
        metaschema_uri: Option<&Uri>,
    ) -> Result<SchemaIndex, CatalogError> {
        if let Some(index) = self.uri_index(cache_id, uri) {
            return Ok(index);
        }
        let base = uri.strip_fragment();
        if self.uri_index(cache_id, &base).is_none() {
            let document = self.load_json(&base)?;
            let mut compiler = Compiler::new(self, cache_id);
            compiler
                .compile_document(&document, Some(base.clone()), metaschema_uri.cloned())
                .map_err(|e| promote(e, cache_id))?;
        }
        let root = self
            .uri_index(cache_id, &base)
            .ok_or_else(|| CatalogError::SchemaNotFound {
                uri: base.to_string(),
            })?;

        match uri.fragment() {
            None | Some("") => Ok(root),
            Some(_) => self
                .uri_index(cache_id, uri)
                .ok_or_else(|| CatalogError::SchemaNotFound {
                    uri: uri.to_string(),
                }),
        }
    }

    /// URI index lookup, normalizing JSON Pointer fragments.
    fn uri_index(&self, cache_id: &str, uri: &Uri) -> Option<SchemaIndex> {
        let cache = self.caches.get(cache_id)?;
        if let Some(index) = cache.by_uri.get(uri) {
            return Some(*index);
        }
        match uri.fragment() {
            Some("") => cache.by_uri.get(&uri.strip_fragment()).copied(),
            Some(fragment) if fragment.starts_with('/') => {
                let pointer = JsonPointer::parse_uri_fragment(fragment).ok()?;
                let normalized = uri
                    .strip_fragment()
                    .with_fragment(Some(&pointer.to_uri_fragment()));
                cache.by_uri.get(&normalized).copied()
            }
            _ => None,
        }
    }

    // -- Cache internals (compiler support) ----------------------------------

    pub(crate) fn cache(&self, cache_id: &str) -> Option<&SchemaCache> {
        self.caches.get(cache_id)
    }

    fn cache_entry(&mut self, cache_id: &str) -> &mut SchemaCache {
        self.caches.entry(cache_id.to_string()).or_default()
    }

    pub(crate) fn arena_len(&mut self, cache_id: &str) -> usize {
        self.cache_entry(cache_id).arena.len()
    }

    pub(crate) fn push_schema(&mut self, cache_id: &str, schema: Schema) {
        self.cache_entry(cache_id).arena.push(schema);
    }

    pub(crate) fn schema_at(&self, cache_id: &str, index: SchemaIndex) -> &Schema {
        self.caches
            .get(cache_id)
            .and_then(|cache| cache.arena.get(index.0))
            .expect("schema index is valid for its cache")
    }

    pub(crate) fn register_uri(
        &mut self,
        cache_id: &str,
        uri: Uri,
        index: SchemaIndex,
        raw: &Value,
    ) -> Result<(), SchemaError> {
        let cache = self.cache_entry(cache_id);
        if let Some(&existing) = cache.by_uri.get(&uri) {
            if existing != index && &cache.arena[existing.0].raw != raw {
                return Err(SchemaError::DuplicateUri {
                    uri: uri.to_string(),
                });
            }
        }
        cache.by_uri.insert(uri, index);
        Ok(())
    }

    pub(crate) fn add_dynamic_anchor(
        &mut self,
        cache_id: &str,
        resource_root: SchemaIndex,
        name: &str,
        index: SchemaIndex,
    ) {
        let cache = self.cache_entry(cache_id);
        cache.arena[resource_root.0]
            .dynamic_anchors
            .entry(name.to_string())
            .or_insert(index);
    }

    pub(crate) fn set_recursive_anchor(&mut self, cache_id: &str, index: SchemaIndex) {
        self.cache_entry(cache_id).arena[index.0].recursive_anchor = true;
    }

    pub(crate) fn set_keywords(
        &mut self,
        cache_id: &str,
        index: SchemaIndex,
        keywords: Vec<CompiledKeyword>,
    ) {
        self.cache_entry(cache_id).arena[index.0].keywords = keywords;
    }

    pub(crate) fn push_pending(&mut self, cache_id: &str, pending: PendingRef) {
        self.cache_entry(cache_id).pending.push(pending);
    }
}

/// Lift compiler-level errors into the catalog taxonomy.
fn promote(error: SchemaError, cache_id: &str) -> CatalogError {
    match error {
        SchemaError::DuplicateUri { uri } => CatalogError::DuplicateId {
            uri,
            cache_id: cache_id.to_string(),
        },
        other => other.into(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EmbeddedSource;
    use serde_json::json;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    #[test]
    fn test_source_prefix_matching_longest_wins() {
        let mut catalog = Catalog::new();
        catalog
            .add_uri_source(
                Some(&uri("https://example.com/")),
                EmbeddedSource {
                    files: &[("a/x", r#"{"from": "short"}"#)],
                },
            )
            .unwrap();
        catalog
            .add_uri_source(
                Some(&uri("https://example.com/a/")),
                EmbeddedSource {
                    files: &[("x", r#"{"from": "long"}"#)],
                },
            )
            .unwrap();

        let loaded = catalog.load_json(&uri("https://example.com/a/x")).unwrap();
        assert_eq!(loaded, json!({"from": "long"}));
    }

    #[test]
    fn test_source_tie_broken_by_registration_order() {
        let mut catalog = Catalog::new();
        catalog
            .add_uri_source(
                Some(&uri("https://example.com/")),
                EmbeddedSource {
                    files: &[("x", r#"{"from": "first"}"#)],
                },
            )
            .unwrap();
        catalog
            .add_uri_source(
                Some(&uri("https://example.com/")),
                EmbeddedSource {
                    files: &[("x", r#"{"from": "second"}"#)],
                },
            )
            .unwrap();

        let loaded = catalog.load_json(&uri("https://example.com/x")).unwrap();
        assert_eq!(loaded, json!({"from": "second"}));
    }

    #[test]
    fn test_source_base_must_end_with_slash() {
        let mut catalog = Catalog::new();
        let result = catalog.add_uri_source(
            Some(&uri("https://example.com/a")),
            EmbeddedSource { files: &[] },
        );
        assert!(matches!(
            result,
            Err(CatalogError::InvalidSourceBase { .. })
        ));
    }

    #[test]
    fn test_no_source_for_unknown_uri() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.load_json(&uri("https://nowhere.invalid/x")),
            Err(CatalogError::NoSource { .. })
        ));
    }
}
