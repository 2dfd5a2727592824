//! End-to-end evaluation scenarios: annotations, failing assertions,
//! format opt-in, and the boundary behaviors around boolean schemas,
//! decimal arithmetic, and unevaluated properties.

use json_schema_eval_core::{
    Catalog, CompileOptions, Draft, Evaluation, JsonNode, OutputFormat, Uri,
};
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn catalog_2020() -> Catalog {
    Catalog::create(&[Draft::V2020_12]).expect("default catalog builds")
}

fn evaluate(catalog: &mut Catalog, schema: Value, instance: Value) -> Evaluation {
    let key = catalog
        .compile(&schema, CompileOptions::default().for_draft(Draft::V2020_12))
        .expect("schema compiles");
    let schema = catalog.schema(&key).unwrap();
    schema
        .evaluate(&JsonNode::from_value(&instance))
        .expect("evaluation runs")
}

fn annotation_units(output: &Value) -> Vec<&Value> {
    output["annotations"].as_array().unwrap().iter().collect()
}

fn find_unit<'a>(
    units: &[&'a Value],
    keyword_location: &str,
    instance_location: &str,
) -> &'a Value {
    units
        .iter()
        .find(|u| {
            u["keywordLocation"] == json!(keyword_location)
                && u["instanceLocation"] == json!(instance_location)
        })
        .unwrap_or_else(|| {
            panic!("no unit at keywordLocation {keyword_location}, instanceLocation {instance_location}")
        })
}

// ── S1: basic annotation output ─────────────────────────────────────────────

#[test]
fn basic_output_collects_annotations() {
    let mut catalog = catalog_2020();
    let result = evaluate(
        &mut catalog,
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/demo",
            "type": "array",
            "items": {
                "anyOf": [
                    {"type": "string", "description": "s"},
                    {"type": "integer", "description": "i"}
                ]
            }
        }),
        json!([12, "m"]),
    );
    assert!(result.valid());

    let output = result.output(OutputFormat::Basic);
    assert_eq!(output["valid"], json!(true));
    let units = annotation_units(&output);
    assert_eq!(units.len(), 3, "unexpected annotations: {units:#?}");

    let items = find_unit(&units, "/items", "");
    assert_eq!(items["annotation"], json!(true));
    assert_eq!(
        items["absoluteKeywordLocation"],
        json!("https://example.com/demo#/items")
    );

    let first = find_unit(&units, "/items/anyOf/1/description", "/0");
    assert_eq!(first["annotation"], json!("i"));

    let second = find_unit(&units, "/items/anyOf/0/description", "/1");
    assert_eq!(second["annotation"], json!("s"));
}

// ── S2: failing minLength through $ref ──────────────────────────────────────

#[test]
fn detailed_output_single_error_through_ref() {
    let mut catalog = catalog_2020();
    let result = evaluate(
        &mut catalog,
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/greeting",
            "type": "object",
            "properties": {
                "greeting": {"$ref": "#/$defs/greetingDefinition"}
            },
            "$defs": {
                "greetingDefinition": {"type": "string", "minLength": 10}
            }
        }),
        json!({"greeting": "Hi"}),
    );
    assert!(!result.valid());

    let output = result.output(OutputFormat::Detailed);
    assert_eq!(output["valid"], json!(false));
    assert_eq!(
        output["keywordLocation"],
        json!("/properties/greeting/$ref/minLength")
    );
    assert_eq!(
        output["absoluteKeywordLocation"],
        json!("https://example.com/greeting#/$defs/greetingDefinition/minLength")
    );
    assert_eq!(output["instanceLocation"], json!("/greeting"));
    assert!(output["error"].as_str().unwrap().contains("too short"));
    assert!(output.get("errors").is_none(), "leaf error has no children");
}

#[test]
fn basic_output_filters_containment_errors() {
    let mut catalog = catalog_2020();
    let result = evaluate(
        &mut catalog,
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": {"n": {"type": "integer"}}
        }),
        json!({"n": "x"}),
    );
    assert!(!result.valid());

    let output = result.output(OutputFormat::Basic);
    let errors = output["errors"].as_array().unwrap();
    // Only the type assertion surfaces; the properties container does not.
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["keywordLocation"], json!("/properties/n/type"));
}

// ── S5: format opt-in ───────────────────────────────────────────────────────

#[test]
fn format_is_annotation_only_by_default() {
    let mut catalog = catalog_2020();
    let result = evaluate(
        &mut catalog,
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "string",
            "format": "ipv4"
        }),
        json!("not-an-ip"),
    );
    assert!(result.valid());

    let output = result.output(OutputFormat::Basic);
    let units = annotation_units(&output);
    assert_eq!(find_unit(&units, "/format", "")["annotation"], json!("ipv4"));
}

#[test]
fn enabled_format_asserts() {
    let mut catalog = catalog_2020();
    catalog.enable_formats(&["ipv4"]);
    let result = evaluate(
        &mut catalog,
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "string",
            "format": "ipv4"
        }),
        json!("not-an-ip"),
    );
    assert!(!result.valid());

    let output = result.output(OutputFormat::Basic);
    let errors = output["errors"].as_array().unwrap();
    assert!(errors
        .iter()
        .any(|e| e["error"].as_str().unwrap().contains("ipv4")));

    let ok = evaluate(
        &mut catalog,
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "string",
            "format": "ipv4"
        }),
        json!("127.0.0.1"),
    );
    assert!(ok.valid());
}

// ── Boundary behaviors ──────────────────────────────────────────────────────

#[test]
fn empty_schema_validates_everything() {
    let mut catalog = catalog_2020();
    for instance in [json!(null), json!(0), json!("x"), json!([1]), json!({"a": 1})] {
        let result = evaluate(&mut catalog, json!({}), instance);
        assert!(result.valid());
    }
}

#[test]
fn false_schema_invalidates_everything() {
    let mut catalog = catalog_2020();
    let result = evaluate(&mut catalog, json!(false), json!({"anything": true}));
    assert!(!result.valid());

    let output = result.output(OutputFormat::Basic);
    assert!(output["errors"].as_array().unwrap()[0]["error"]
        .as_str()
        .unwrap()
        .contains("boolean false schema"));
}

#[test]
fn false_schema_unreachable_behind_passing_any_of() {
    let mut catalog = catalog_2020();
    let result = evaluate(
        &mut catalog,
        json!({"anyOf": [false, {"type": "integer"}]}),
        json!(5),
    );
    assert!(result.valid());
}

#[test]
fn multiple_of_is_decimal_exact() {
    let mut catalog = catalog_2020();
    let instance: Value = serde_json::from_str("5.1").unwrap();
    let result = evaluate(&mut catalog, json!({"multipleOf": 0.1}), instance);
    assert!(result.valid());

    let not_multiple: Value = serde_json::from_str("5.15").unwrap();
    let result = evaluate(&mut catalog, json!({"multipleOf": 0.1}), not_multiple);
    assert!(!result.valid());
}

#[test]
fn unique_items_uses_json_equality() {
    let mut catalog = catalog_2020();
    // Different types are distinct.
    assert!(evaluate(&mut catalog, json!({"uniqueItems": true}), json!([1, true])).valid());
    // Mathematically equal numbers are not.
    let instance: Value = serde_json::from_str("[1, 1.0]").unwrap();
    assert!(!evaluate(&mut catalog, json!({"uniqueItems": true}), instance).valid());
}

#[test]
fn integer_type_accepts_integral_floats() {
    let mut catalog = catalog_2020();
    let one_point_zero: Value = serde_json::from_str("1.0").unwrap();
    assert!(evaluate(&mut catalog, json!({"type": "integer"}), one_point_zero).valid());
    assert!(!evaluate(&mut catalog, json!({"type": "integer"}), json!(1.5)).valid());
    assert!(!evaluate(&mut catalog, json!({"type": "integer"}), json!(true)).valid());
}

#[test]
fn unevaluated_properties_sees_through_ref() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://example.com/unevaluated",
        "$ref": "#/$defs/base",
        "unevaluatedProperties": false,
        "$defs": {
            "base": {"properties": {"a": {"type": "integer"}}}
        }
    });
    // "a" is evaluated by the referenced schema; "b" is not.
    assert!(evaluate(&mut catalog, schema.clone(), json!({"a": 1})).valid());
    assert!(!evaluate(&mut catalog, schema, json!({"a": 1, "b": 2})).valid());
}

#[test]
fn if_then_else_branch_selection() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "if": {"type": "string"},
        "then": {"minLength": 3},
        "else": {"minimum": 10}
    });
    assert!(evaluate(&mut catalog, schema.clone(), json!("abcd")).valid());
    assert!(!evaluate(&mut catalog, schema.clone(), json!("ab")).valid());
    assert!(evaluate(&mut catalog, schema.clone(), json!(12)).valid());
    assert!(!evaluate(&mut catalog, schema, json!(5)).valid());
}

#[test]
fn min_contains_zero_pardons_empty_match() {
    let mut catalog = catalog_2020();
    let schema = json!({"contains": {"type": "string"}, "minContains": 0});
    assert!(evaluate(&mut catalog, schema.clone(), json!([1, 2])).valid());
    assert!(evaluate(&mut catalog, schema, json!([])).valid());

    // Without minContains, an empty match still fails.
    assert!(!evaluate(&mut catalog, json!({"contains": {"type": "string"}}), json!([1, 2])).valid());
}

#[test]
fn max_contains_counts_matches() {
    let mut catalog = catalog_2020();
    let schema = json!({"contains": {"type": "string"}, "maxContains": 1});
    assert!(evaluate(&mut catalog, schema.clone(), json!(["a", 1])).valid());
    assert!(!evaluate(&mut catalog, schema, json!(["a", "b"])).valid());
}

#[test]
fn one_of_requires_exactly_one() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "oneOf": [
            {"type": "integer"},
            {"type": "number", "minimum": 3}
        ]
    });
    assert!(evaluate(&mut catalog, schema.clone(), json!(1)).valid());
    assert!(evaluate(&mut catalog, schema.clone(), json!(3.5)).valid());
    assert!(!evaluate(&mut catalog, schema.clone(), json!(5)).valid());
    assert!(!evaluate(&mut catalog, schema, json!("x")).valid());
}

#[test]
fn prefix_items_and_items_split_the_array() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "prefixItems": [{"type": "string"}],
        "items": {"type": "integer"}
    });
    assert!(evaluate(&mut catalog, schema.clone(), json!(["x", 1, 2])).valid());
    assert!(!evaluate(&mut catalog, schema.clone(), json!(["x", "y"])).valid());
    assert!(!evaluate(&mut catalog, schema, json!([1])).valid());
}

#[test]
fn dependent_keywords() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "dependentRequired": {"credit_card": ["billing_address"]},
        "dependentSchemas": {
            "credit_card": {"properties": {"billing_address": {"type": "string"}}}
        }
    });
    assert!(evaluate(&mut catalog, schema.clone(), json!({"name": "x"})).valid());
    assert!(!evaluate(&mut catalog, schema.clone(), json!({"credit_card": 1})).valid());
    assert!(evaluate(
        &mut catalog,
        schema,
        json!({"credit_card": 1, "billing_address": "street"})
    )
    .valid());
}

#[test]
fn pattern_properties_and_additional_properties() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "properties": {"known": {"type": "boolean"}},
        "patternProperties": {"^x-": {"type": "string"}},
        "additionalProperties": false
    });
    assert!(evaluate(
        &mut catalog,
        schema.clone(),
        json!({"known": true, "x-header": "v"})
    )
    .valid());
    assert!(!evaluate(&mut catalog, schema, json!({"other": 1})).valid());
}

#[test]
fn property_names_are_validated() {
    let mut catalog = catalog_2020();
    let schema = json!({"propertyNames": {"maxLength": 3}});
    assert!(evaluate(&mut catalog, schema.clone(), json!({"abc": 1})).valid());
    assert!(!evaluate(&mut catalog, schema, json!({"abcd": 1})).valid());
}

#[test]
fn validation_keyword_assortment() {
    let mut catalog = catalog_2020();
    let schema = json!({
        "type": "object",
        "required": ["name"],
        "minProperties": 1,
        "properties": {
            "name": {"type": "string", "minLength": 1, "pattern": "^[a-z]+$"},
            "count": {"type": "integer", "exclusiveMinimum": 0, "maximum": 100}
        }
    });
    assert!(evaluate(&mut catalog, schema.clone(), json!({"name": "abc", "count": 5})).valid());
    assert!(!evaluate(&mut catalog, schema.clone(), json!({})).valid());
    assert!(!evaluate(&mut catalog, schema.clone(), json!({"name": "ABC"})).valid());
    assert!(!evaluate(&mut catalog, schema, json!({"name": "abc", "count": 0})).valid());
}

// ── 2019-09 array keywords ──────────────────────────────────────────────────

#[test]
fn legacy_items_tuple_and_additional_items() {
    let mut catalog = Catalog::create(&[Draft::V2019_09]).unwrap();
    let key = catalog
        .compile(
            &json!({
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "items": [{"type": "string"}, {"type": "integer"}],
                "additionalItems": {"type": "boolean"}
            }),
            CompileOptions::default(),
        )
        .unwrap();
    let schema = catalog.schema(&key).unwrap();

    let ok = schema
        .evaluate(&JsonNode::from_value(&json!(["x", 1, true, false])))
        .unwrap();
    assert!(ok.valid());

    let bad = schema
        .evaluate(&JsonNode::from_value(&json!(["x", 1, "not-bool"])))
        .unwrap();
    assert!(!bad.valid());
}

// ── Compile-time failures ───────────────────────────────────────────────────

#[test]
fn missing_metaschema_is_an_error() {
    let mut catalog = catalog_2020();
    let result = catalog.compile(&json!({"type": "string"}), CompileOptions::default());
    assert!(result.is_err());
}

#[test]
fn subschema_id_with_pointer_fragment_is_rejected() {
    let mut catalog = catalog_2020();
    let result = catalog.compile(
        &json!({
            "$id": "https://example.com/root",
            "properties": {
                "bad": {"$id": "https://example.com/sub#/with/pointer"}
            }
        }),
        CompileOptions::default().for_draft(Draft::V2020_12),
    );
    assert!(result.is_err());
}

#[test]
fn schema_constructor_uri_registers_in_catalog() {
    let mut catalog = catalog_2020();
    let uri = Uri::parse("https://example.com/registered").unwrap();
    let key = catalog
        .compile(
            &json!({"type": "object"}),
            CompileOptions::default()
                .with_uri(uri.clone())
                .for_draft(Draft::V2020_12),
        )
        .unwrap();
    let found = catalog.get_schema(&uri, "default", None).unwrap();
    assert_eq!(found, key);
}
