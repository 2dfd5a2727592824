//! Output formatters: reductions of the result tree to the standard
//! `flag`, `basic`, `detailed`, and `verbose` shapes.
//!
//! Output units carry `keywordLocation` (the dynamic evaluation path),
//! `absoluteKeywordLocation`, and `instanceLocation`. `basic` flattens
//! leaf annotations or assertion errors; `detailed` condenses the
//! hierarchy, filtering containment errors and collapsing pass-through
//! interior nodes; `verbose` mirrors the whole dynamic evaluation path.
//! All formatters are pure functions of the result tree.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::evaluator::{ErrorKind, ResultNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Flag,
    Basic,
    Detailed,
    Verbose,
}

pub(crate) fn create_output(root: &ResultNode, format: OutputFormat) -> Value {
    match format {
        OutputFormat::Flag => json!({ "valid": root.valid() }),
        OutputFormat::Basic => basic(root),
        OutputFormat::Detailed => detailed(root),
        OutputFormat::Verbose => verbose(root),
    }
}

fn unit_header(node: &ResultNode) -> Map<String, Value> {
    let mut unit = Map::new();
    unit.insert("valid".to_string(), json!(node.valid()));
    unit.insert(
        "keywordLocation".to_string(),
        json!(node.evaluation_path().to_string()),
    );
    unit.insert(
        "absoluteKeywordLocation".to_string(),
        json!(node.absolute_keyword_location()),
    );
    unit.insert(
        "instanceLocation".to_string(),
        json!(node.instance_path().to_string()),
    );
    unit
}

// ---------------------------------------------------------------------------
// basic
// ---------------------------------------------------------------------------

fn basic(root: &ResultNode) -> Value {
    if root.valid() {
        let mut units = Vec::new();
        collect_annotation_units(root, &mut units);
        json!({ "valid": true, "annotations": units })
    } else {
        let mut units = Vec::new();
        collect_error_units(root, &mut units);
        json!({ "valid": false, "errors": units })
    }
}

fn collect_annotation_units(node: &ResultNode, units: &mut Vec<Value>) {
    if !node.passed() {
        return;
    }
    if let Some(annotation) = node.annotation() {
        let mut unit = unit_header(node);
        unit.insert("annotation".to_string(), annotation.clone());
        units.push(Value::Object(unit));
    }
    for child in node.children() {
        collect_annotation_units(child, units);
    }
}

fn collect_error_units(node: &ResultNode, units: &mut Vec<Value>) {
    if node.valid() {
        return;
    }
    if let Some(error) = node.error() {
        if error.kind == ErrorKind::Assertion {
            let mut unit = unit_header(node);
            unit.insert("error".to_string(), json!(error.message));
            units.push(Value::Object(unit));
        }
    }
    for child in node.children() {
        collect_error_units(child, units);
    }
}

// ---------------------------------------------------------------------------
// detailed
// ---------------------------------------------------------------------------

fn detailed(root: &ResultNode) -> Value {
    let overall_valid = root.valid();
    let mut outputs = detail_node(root, overall_valid);
    if outputs.len() == 1 {
        return outputs.remove(0);
    }
    let mut unit = unit_header(root);
    let key = if overall_valid { "annotations" } else { "errors" };
    unit.insert(key.to_string(), Value::Array(outputs));
    Value::Object(unit)
}

/// The node's contribution to the detailed output: empty if it is
/// irrelevant, a single unit, or its children's units hoisted through a
/// message-less interior node.
fn detail_node(node: &ResultNode, overall_valid: bool) -> Vec<Value> {
    let relevant = if overall_valid {
        node.passed()
    } else {
        !node.valid()
    };
    if !relevant {
        return Vec::new();
    }

    let mut nested = Vec::new();
    for child in node.children() {
        nested.extend(detail_node(child, overall_valid));
    }

    let own_message: Option<(&str, Value)> = if overall_valid {
        node.annotation()
            .map(|a| ("annotation", a.clone()))
    } else {
        node.error()
            .filter(|e| e.kind == ErrorKind::Assertion)
            .map(|e| ("error", json!(e.message)))
    };

    match (&own_message, nested.len()) {
        // Pass-through interior nodes collapse away.
        (None, 0) => Vec::new(),
        (None, 1) => nested,
        _ => {
            let mut unit = unit_header(node);
            if let Some((key, value)) = own_message {
                unit.insert(key.to_string(), value);
            }
            if !nested.is_empty() {
                let key = if overall_valid { "annotations" } else { "errors" };
                unit.insert(key.to_string(), Value::Array(nested));
            }
            vec![Value::Object(unit)]
        }
    }
}

// ---------------------------------------------------------------------------
// verbose
// ---------------------------------------------------------------------------

fn verbose(node: &ResultNode) -> Value {
    let valid = node.valid();
    let mut unit = unit_header(node);
    if valid {
        if let Some(annotation) = node.annotation() {
            unit.insert("annotation".to_string(), annotation.clone());
        }
    } else if let Some(error) = node.error() {
        unit.insert("error".to_string(), json!(error.message));
    }
    let children: Vec<Value> = node.children().iter().map(verbose).collect();
    if !children.is_empty() {
        let key = if valid { "annotations" } else { "errors" };
        unit.insert(key.to_string(), Value::Array(children));
    }
    Value::Object(unit)
}
