//! Output format shapes, determinism, and catalog invariants.

use json_schema_eval_core::{
    Catalog, CompileOptions, Draft, JsonNode, OutputFormat, Uri,
};
use serde_json::{json, Value};

fn catalog_2020() -> Catalog {
    Catalog::create(&[Draft::V2020_12]).unwrap()
}

fn demo_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://example.com/output-demo",
        "type": "object",
        "title": "demo",
        "properties": {
            "name": {"type": "string"},
            "count": {"type": "integer", "minimum": 0}
        },
        "required": ["name"]
    })
}

#[test]
fn flag_output_is_just_validity() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();
    let schema = catalog.schema(&key).unwrap();

    let ok = schema
        .evaluate(&JsonNode::from_value(&json!({"name": "x"})))
        .unwrap();
    assert_eq!(ok.output(OutputFormat::Flag), json!({"valid": true}));

    let bad = schema.evaluate(&JsonNode::from_value(&json!({}))).unwrap();
    assert_eq!(bad.output(OutputFormat::Flag), json!({"valid": false}));
}

#[test]
fn output_is_idempotent() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    let result = schema
        .evaluate(&JsonNode::from_value(&json!({"name": "x", "count": -1})))
        .unwrap();

    for format in [
        OutputFormat::Flag,
        OutputFormat::Basic,
        OutputFormat::Detailed,
        OutputFormat::Verbose,
    ] {
        assert_eq!(result.output(format), result.output(format));
    }
}

#[test]
fn evaluation_is_deterministic() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    let instance = JsonNode::from_value(&json!({"name": "x", "count": 3}));

    let first = schema.evaluate(&instance).unwrap();
    let second = schema.evaluate(&instance).unwrap();
    assert_eq!(
        first.output(OutputFormat::Verbose),
        second.output(OutputFormat::Verbose)
    );
}

#[test]
fn verbose_output_mirrors_the_evaluation_tree() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    let result = schema
        .evaluate(&JsonNode::from_value(&json!({"name": "x"})))
        .unwrap();

    let output = result.output(OutputFormat::Verbose);
    assert_eq!(output["valid"], json!(true));
    assert_eq!(output["keywordLocation"], json!(""));
    assert_eq!(output["instanceLocation"], json!(""));
    assert_eq!(
        output["absoluteKeywordLocation"],
        json!("https://example.com/output-demo")
    );
    let children = output["annotations"].as_array().unwrap();
    // One node per evaluated keyword, in evaluation order.
    let locations: Vec<&str> = children
        .iter()
        .map(|c| c["keywordLocation"].as_str().unwrap())
        .collect();
    assert!(locations.contains(&"/type"));
    assert!(locations.contains(&"/properties"));
    assert!(locations.contains(&"/required"));
    assert!(locations.contains(&"/title"));
}

#[test]
fn detailed_output_collapses_passing_interiors() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();
    let schema = catalog.schema(&key).unwrap();
    let result = schema
        .evaluate(&JsonNode::from_value(&json!({"name": 1, "count": -2})))
        .unwrap();
    assert!(!result.valid());

    let output = result.output(OutputFormat::Detailed);
    assert_eq!(output["valid"], json!(false));
    // Two independent assertion failures survive under one container.
    let errors = output["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    let locations: Vec<&str> = errors
        .iter()
        .map(|e| e["keywordLocation"].as_str().unwrap())
        .collect();
    assert!(locations.contains(&"/properties/name/type"));
    assert!(locations.contains(&"/properties/count/minimum"));
}

// ── Catalog invariants ──────────────────────────────────────────────────────

#[test]
fn compiled_schemas_are_reachable_by_canonical_uri() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();

    // The root, and every identified subschema, round-trip through get_schema.
    let root = catalog
        .get_schema(&Uri::parse("https://example.com/output-demo").unwrap(), "default", None)
        .unwrap();
    assert_eq!(root, key);

    let sub = catalog
        .get_schema(
            &Uri::parse("https://example.com/output-demo#/properties/name").unwrap(),
            "default",
            None,
        )
        .unwrap();
    let sub_schema = catalog.schema(&sub).unwrap();
    assert_eq!(
        sub_schema.uri().as_str(),
        "https://example.com/output-demo#/properties/name"
    );
}

#[test]
fn results_outlive_instance_borrowing_rules() {
    let mut catalog = catalog_2020();
    let key = catalog
        .compile(&demo_schema(), CompileOptions::default())
        .unwrap();
    let output = {
        let schema = catalog.schema(&key).unwrap();
        let instance = JsonNode::from_value(&json!({"name": "x"}));
        let result = schema.evaluate(&instance).unwrap();
        // The evaluation owns its tree: usable after instance and schema
        // handles are gone.
        result.output(OutputFormat::Basic)
    };
    assert_eq!(output["valid"], json!(true));
}
