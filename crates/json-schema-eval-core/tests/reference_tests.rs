//! Reference resolution scenarios: deferred mutual recursion, anchors,
//! `$dynamicRef` retargeting, `$recursiveRef`, and source-backed loading.

use json_schema_eval_core::{
    Catalog, CompileOptions, Draft, JsonNode, LocalSource, Uri,
};
use serde_json::json;

fn catalog_2020() -> Catalog {
    Catalog::create(&[Draft::V2020_12]).unwrap()
}

fn uri(s: &str) -> Uri {
    Uri::parse(s).unwrap()
}

// ── S3: mutually recursive bundles ──────────────────────────────────────────

#[test]
fn mutually_recursive_bundles_resolve_at_fixpoint() {
    let mut catalog = catalog_2020();
    let options = || CompileOptions::default().for_draft(Draft::V2020_12).deferred();

    let bundle1 = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/bundle1",
                "type": "object",
                "properties": {
                    "next": {"$ref": "https://example.com/bundle2"}
                }
            }),
            options(),
        )
        .unwrap();
    assert!(!catalog.schema(&bundle1).unwrap().references_resolved());

    let bundle2 = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/bundle2",
                "type": "object",
                "properties": {
                    "next": {"$ref": "https://example.com/bundle1"}
                }
            }),
            options(),
        )
        .unwrap();

    catalog.resolve_references("default").unwrap();
    assert!(catalog.schema(&bundle1).unwrap().references_resolved());
    assert!(catalog.schema(&bundle2).unwrap().references_resolved());

    let schema = catalog.schema(&bundle1).unwrap();
    let instance = JsonNode::from_value(&json!({"next": {"next": {"next": {}}}}));
    assert!(schema.evaluate(&instance).unwrap().valid());

    let bad = JsonNode::from_value(&json!({"next": {"next": 42}}));
    assert!(!schema.evaluate(&bad).unwrap().valid());
}

#[test]
fn unresolved_reference_fails_resolution() {
    let mut catalog = catalog_2020();
    let result = catalog.compile(
        &json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$ref": "https://example.com/never-registered"
        }),
        CompileOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn deferred_reference_fails_evaluation_until_resolved() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/pending1",
                "$ref": "https://example.com/pending2"
            }),
            CompileOptions::default().deferred(),
        )
        .unwrap();

    let schema = catalog.schema(&key).unwrap();
    let instance = JsonNode::from_value(&json!(1));
    assert!(schema.evaluate(&instance).is_err());
}

// ── S4: recursive tree with $dynamicRef ─────────────────────────────────────

#[test]
fn dynamic_ref_retargets_to_outermost_anchor() {
    let mut catalog = catalog_2020();
    let tree = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/tree",
                "$dynamicAnchor": "node",
                "type": "object",
                "properties": {
                    "data": true,
                    "children": {
                        "type": "array",
                        "items": {"$dynamicRef": "#node"}
                    }
                }
            }),
            CompileOptions::default(),
        )
        .unwrap();
    let strict_tree = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/strict-tree",
                "$dynamicAnchor": "node",
                "$ref": "tree",
                "unevaluatedProperties": false
            }),
            CompileOptions::default(),
        )
        .unwrap();

    // A misspelled property: the lax tree accepts it, the strict one does not.
    let instance = JsonNode::from_value(&json!({"children": [{"daat": 1}]}));

    let tree_schema = catalog.schema(&tree).unwrap();
    assert!(tree_schema.evaluate(&instance).unwrap().valid());

    let strict_schema = catalog.schema(&strict_tree).unwrap();
    assert!(!strict_schema.evaluate(&instance).unwrap().valid());

    let well_formed = JsonNode::from_value(&json!({
        "data": "x",
        "children": [{"data": "y", "children": []}]
    }));
    assert!(strict_schema.evaluate(&well_formed).unwrap().valid());
}

#[test]
fn dynamic_ref_without_matching_scope_is_static() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/static-dyn",
                "properties": {
                    "value": {"$dynamicRef": "#leaf"}
                },
                "$defs": {
                    "leaf": {"$dynamicAnchor": "leaf", "type": "integer"}
                }
            }),
            CompileOptions::default(),
        )
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    assert!(schema
        .evaluate(&JsonNode::from_value(&json!({"value": 3})))
        .unwrap()
        .valid());
    assert!(!schema
        .evaluate(&JsonNode::from_value(&json!({"value": "x"})))
        .unwrap()
        .valid());
}

// ── $recursiveRef (2019-09) ─────────────────────────────────────────────────

#[test]
fn recursive_ref_extends_through_recursive_anchor() {
    let mut catalog = Catalog::create(&[Draft::V2019_09]).unwrap();
    catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "$id": "https://example.com/rtree",
                "$recursiveAnchor": true,
                "type": "object",
                "properties": {
                    "data": true,
                    "children": {
                        "type": "array",
                        "items": {"$recursiveRef": "#"}
                    }
                }
            }),
            CompileOptions::default(),
        )
        .unwrap();
    let strict = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "$id": "https://example.com/strict-rtree",
                "$recursiveAnchor": true,
                "$ref": "rtree",
                "unevaluatedProperties": false
            }),
            CompileOptions::default(),
        )
        .unwrap();

    let instance = JsonNode::from_value(&json!({"children": [{"daat": 1}]}));
    let strict_schema = catalog.schema(&strict).unwrap();
    assert!(!strict_schema.evaluate(&instance).unwrap().valid());

    let well_formed = JsonNode::from_value(&json!({"children": [{"data": 1}]}));
    assert!(strict_schema.evaluate(&well_formed).unwrap().valid());
}

// ── Anchors and fragments ───────────────────────────────────────────────────

#[test]
fn anchor_is_a_ref_target() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/anchored",
                "properties": {
                    "a": {"$ref": "#items-def"}
                },
                "$defs": {
                    "positive": {"$anchor": "items-def", "type": "integer", "minimum": 1}
                }
            }),
            CompileOptions::default(),
        )
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    assert!(schema
        .evaluate(&JsonNode::from_value(&json!({"a": 2})))
        .unwrap()
        .valid());
    assert!(!schema
        .evaluate(&JsonNode::from_value(&json!({"a": 0})))
        .unwrap()
        .valid());
}

#[test]
fn get_schema_applies_pointer_fragment() {
    let mut catalog = catalog_2020();
    catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/with-defs",
                "$defs": {
                    "name": {"type": "string"}
                }
            }),
            CompileOptions::default(),
        )
        .unwrap();

    let key = catalog
        .get_schema(&uri("https://example.com/with-defs#/$defs/name"), "default", None)
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    assert_eq!(
        schema.uri().as_str(),
        "https://example.com/with-defs#/$defs/name"
    );
    assert!(schema
        .evaluate(&JsonNode::from_value(&json!("text")))
        .unwrap()
        .valid());
}

// ── Sources ─────────────────────────────────────────────────────────────────

#[test]
fn get_schema_loads_documents_from_a_local_source() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("person.json"),
        serde_json::to_string(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://schemas.example.com/person",
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        }))
        .unwrap(),
    )
    .unwrap();

    let mut catalog = catalog_2020();
    catalog
        .add_uri_source(
            Some(&uri("https://schemas.example.com/")),
            LocalSource::with_suffix(dir.path(), ".json"),
        )
        .unwrap();

    let key = catalog
        .get_schema(&uri("https://schemas.example.com/person"), "default", None)
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    assert!(schema
        .evaluate(&JsonNode::from_value(&json!({"name": "ada"})))
        .unwrap()
        .valid());
    assert!(!schema
        .evaluate(&JsonNode::from_value(&json!({})))
        .unwrap()
        .valid());
}

#[test]
fn references_are_isolated_per_cache() {
    let mut catalog = catalog_2020();
    catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/target",
                "type": "integer"
            }),
            CompileOptions::default().with_cache_id("one"),
        )
        .unwrap();

    // The other cache cannot see it.
    let result = catalog.compile(
        &json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$ref": "https://example.com/target"
        }),
        CompileOptions::default().with_cache_id("two"),
    );
    assert!(result.is_err());
}

#[test]
fn metaschema_documents_are_addressable() {
    let mut catalog = catalog_2020();
    // The embedded metaschema is itself a loadable, evaluable schema.
    let key = catalog
        .get_schema(
            &uri("https://json-schema.org/draft/2020-12/schema"),
            "default",
            None,
        )
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    let valid_schema_doc = JsonNode::from_value(&json!({"type": "string"}));
    assert!(schema.evaluate(&valid_schema_doc).unwrap().valid());

    let invalid_schema_doc = JsonNode::from_value(&json!({"type": 12}));
    assert!(!schema.evaluate(&invalid_schema_doc).unwrap().valid());
}
