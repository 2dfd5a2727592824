//! RFC 6902 JSON Patch.
//!
//! Operates on raw `serde_json` values; the `test` operation uses JSON
//! equality (numbers by mathematical value), not host equality.

use serde_json::Value;

use crate::error::PatchError;
use crate::json::JsonNode;
use crate::pointer::{parse_array_index, JsonPointer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

#[derive(Debug, Clone)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: JsonPointer,
    pub from: Option<JsonPointer>,
    pub value: Option<Value>,
}

/// An ordered sequence of patch operations.
#[derive(Debug, Clone, Default)]
pub struct JsonPatch {
    operations: Vec<PatchOperation>,
}

impl JsonPatch {
    /// Parse a patch document (an array of operation objects).
    pub fn from_value(document: &Value) -> Result<Self, PatchError> {
        let raw_operations = document
            .as_array()
            .ok_or_else(|| PatchError::InvalidOperation {
                index: 0,
                reason: "a patch document must be an array".to_string(),
            })?;

        let mut operations = Vec::with_capacity(raw_operations.len());
        for (index, raw) in raw_operations.iter().enumerate() {
            let invalid = |reason: &str| PatchError::InvalidOperation {
                index,
                reason: reason.to_string(),
            };
            let op = match raw.get("op").and_then(Value::as_str) {
                Some("add") => PatchOp::Add,
                Some("remove") => PatchOp::Remove,
                Some("replace") => PatchOp::Replace,
                Some("move") => PatchOp::Move,
                Some("copy") => PatchOp::Copy,
                Some("test") => PatchOp::Test,
                Some(other) => return Err(invalid(&format!("unknown op '{other}'"))),
                None => return Err(invalid("missing 'op'")),
            };
            let path = raw
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("missing 'path'"))
                .and_then(|p| JsonPointer::parse(p).map_err(|_| invalid("malformed 'path'")))?;
            let from = match op {
                PatchOp::Move | PatchOp::Copy => Some(
                    raw.get("from")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("missing 'from'"))
                        .and_then(|p| {
                            JsonPointer::parse(p).map_err(|_| invalid("malformed 'from'"))
                        })?,
                ),
                _ => None,
            };
            let value = match op {
                PatchOp::Add | PatchOp::Replace | PatchOp::Test => Some(
                    raw.get("value")
                        .cloned()
                        .ok_or_else(|| invalid("missing 'value'"))?,
                ),
                _ => None,
            };
            operations.push(PatchOperation {
                op,
                path,
                from,
                value,
            });
        }
        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    /// Apply the patch to `document`, returning the patched copy.
    pub fn apply(&self, document: &Value) -> Result<Value, PatchError> {
        let mut current = document.clone();
        for operation in &self.operations {
            current = apply_operation(current, operation)?;
        }
        Ok(current)
    }
}

fn apply_operation(document: Value, operation: &PatchOperation) -> Result<Value, PatchError> {
    match operation.op {
        PatchOp::Add => {
            let value = operation.value.clone().expect("parsed add carries a value");
            add(document, &operation.path, value)
        }
        PatchOp::Remove => remove(document, &operation.path).map(|(doc, _)| doc),
        PatchOp::Replace => {
            let value = operation
                .value
                .clone()
                .expect("parsed replace carries a value");
            let (doc, _) = remove(document, &operation.path)?;
            add(doc, &operation.path, value)
        }
        PatchOp::Move => {
            let from = operation.from.as_ref().expect("parsed move carries 'from'");
            if operation.path.starts_with(from) && &operation.path != from {
                return Err(PatchError::InvalidOperation {
                    index: 0,
                    reason: "cannot move a value into its own child".to_string(),
                });
            }
            let (doc, removed) = remove(document, from)?;
            add(doc, &operation.path, removed)
        }
        PatchOp::Copy => {
            let from = operation.from.as_ref().expect("parsed copy carries 'from'");
            let value = from.evaluate_value(&document)?.clone();
            add(document, &operation.path, value)
        }
        PatchOp::Test => {
            let expected = operation.value.as_ref().expect("parsed test carries a value");
            let actual = operation.path.evaluate_value(&document)?;
            if JsonNode::from_value(actual) == JsonNode::from_value(expected) {
                Ok(document)
            } else {
                Err(PatchError::TestFailed {
                    path: operation.path.to_string(),
                })
            }
        }
    }
}

fn add(mut document: Value, path: &JsonPointer, value: Value) -> Result<Value, PatchError> {
    if path.is_empty() {
        return Ok(value);
    }
    let (parent, token) = parent_mut(&mut document, path)?;
    match parent {
        Value::Object(members) => {
            members.insert(token.to_string(), value);
        }
        Value::Array(items) => {
            if token == "-" {
                items.push(value);
            } else {
                let index = parse_array_index(token).ok_or_else(|| PatchError::Pointer(
                    crate::error::PointerError::Reference {
                        pointer: path.to_string(),
                        reason: format!("bad index '{token}'"),
                    },
                ))?;
                if index > items.len() {
                    return Err(PatchError::Pointer(crate::error::PointerError::Reference {
                        pointer: path.to_string(),
                        reason: format!("index {index} out of bounds"),
                    }));
                }
                items.insert(index, value);
            }
        }
        _ => {
            return Err(PatchError::Pointer(crate::error::PointerError::Reference {
                pointer: path.to_string(),
                reason: "cannot add below a leaf".to_string(),
            }))
        }
    }
    Ok(document)
}

fn remove(mut document: Value, path: &JsonPointer) -> Result<(Value, Value), PatchError> {
    if path.is_empty() {
        return Err(PatchError::Pointer(crate::error::PointerError::Reference {
            pointer: String::new(),
            reason: "cannot remove the document root".to_string(),
        }));
    }
    let (parent, token) = parent_mut(&mut document, path)?;
    let reference = |reason: String| {
        PatchError::Pointer(crate::error::PointerError::Reference {
            pointer: path.to_string(),
            reason,
        })
    };
    let removed = match parent {
        Value::Object(members) => members
            .shift_remove(token)
            .ok_or_else(|| reference(format!("no member '{token}'")))?,
        Value::Array(items) => {
            let index = parse_array_index(token)
                .ok_or_else(|| reference(format!("bad index '{token}'")))?;
            if index >= items.len() {
                return Err(reference(format!("index {index} out of bounds")));
            }
            items.remove(index)
        }
        _ => return Err(reference("cannot remove below a leaf".to_string())),
    };
    Ok((document, removed))
}

/// Navigate to the parent of the referenced location; returns the parent
/// value and the final (unescaped) token.
fn parent_mut<'a, 'p>(
    document: &'a mut Value,
    path: &'p JsonPointer,
) -> Result<(&'a mut Value, &'p str), PatchError> {
    let tokens = path.tokens();
    let (last, front) = tokens.split_last().expect("non-root path has a last token");
    let mut node = document;
    for token in front {
        node = match node {
            Value::Object(members) => {
                members
                    .get_mut(token)
                    .ok_or_else(|| PatchError::Pointer(crate::error::PointerError::Reference {
                        pointer: path.to_string(),
                        reason: format!("no member '{token}'"),
                    }))?
            }
            Value::Array(items) => {
                let index = parse_array_index(token).ok_or_else(|| {
                    PatchError::Pointer(crate::error::PointerError::Reference {
                        pointer: path.to_string(),
                        reason: format!("bad index '{token}'"),
                    })
                })?;
                items.get_mut(index).ok_or_else(|| {
                    PatchError::Pointer(crate::error::PointerError::Reference {
                        pointer: path.to_string(),
                        reason: format!("index {index} out of bounds"),
                    })
                })?
            }
            _ => {
                return Err(PatchError::Pointer(crate::error::PointerError::Reference {
                    pointer: path.to_string(),
                    reason: "cannot descend below a leaf".to_string(),
                }))
            }
        };
    }
    Ok((node, last))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(ops: Value) -> JsonPatch {
        JsonPatch::from_value(&ops).unwrap()
    }

    #[test]
    fn test_add_object_member() {
        let doc = json!({"a": 1});
        let patched = patch(json!([{"op": "add", "path": "/b", "value": 2}]))
            .apply(&doc)
            .unwrap();
        assert_eq!(patched, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_add_array_element_and_append() {
        let doc = json!({"a": [1, 3]});
        let patched = patch(json!([
            {"op": "add", "path": "/a/1", "value": 2},
            {"op": "add", "path": "/a/-", "value": 4}
        ]))
        .apply(&doc)
        .unwrap();
        assert_eq!(patched, json!({"a": [1, 2, 3, 4]}));
    }

    #[test]
    fn test_remove_and_replace() {
        let doc = json!({"a": 1, "b": 2});
        let patched = patch(json!([
            {"op": "remove", "path": "/a"},
            {"op": "replace", "path": "/b", "value": 3}
        ]))
        .apply(&doc)
        .unwrap();
        assert_eq!(patched, json!({"b": 3}));
    }

    #[test]
    fn test_move_and_copy() {
        let doc = json!({"a": {"x": 1}, "b": {}});
        let patched = patch(json!([
            {"op": "move", "from": "/a/x", "path": "/b/x"},
            {"op": "copy", "from": "/b/x", "path": "/c"}
        ]))
        .apply(&doc)
        .unwrap();
        assert_eq!(patched, json!({"a": {}, "b": {"x": 1}, "c": 1}));
    }

    #[test]
    fn test_move_into_own_child_rejected() {
        let doc = json!({"a": {"b": {}}});
        let result = patch(json!([{"op": "move", "from": "/a", "path": "/a/b/c"}])).apply(&doc);
        assert!(result.is_err());
    }

    #[test]
    fn test_escaped_pointer_tokens() {
        // RFC 6901 escaping: "~01" refers to the literal key "~1".
        let doc = json!({"/": 9, "~1": 10});
        let result = patch(json!([{"op": "test", "path": "/~01", "value": 10}])).apply(&doc);
        assert!(result.is_ok());
    }

    #[test]
    fn test_test_uses_json_equality() {
        let doc = json!({"n": 10});
        assert!(patch(json!([{"op": "test", "path": "/n", "value": 10.0}]))
            .apply(&doc)
            .is_ok());
        assert!(matches!(
            patch(json!([{"op": "test", "path": "/n", "value": "10"}])).apply(&doc),
            Err(PatchError::TestFailed { .. })
        ));
    }

    #[test]
    fn test_remove_missing_member_fails() {
        let doc = json!({"a": 1});
        assert!(patch(json!([{"op": "remove", "path": "/b"}])).apply(&doc).is_err());
    }
}
