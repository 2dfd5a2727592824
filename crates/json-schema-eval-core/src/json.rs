//! JSON value model adapter.
//!
//! Wraps a `serde_json` document into a tree of [`JsonNode`]s, each knowing
//! its [`JsonPointer`] path from the document root and its key within its
//! parent. Member order is preserved (serde_json's `preserve_order`), and
//! numbers keep their literal text so decimal comparisons stay exact.
//!
//! Equality between nodes is *JSON equality*: numbers compare by
//! mathematical value (`1 == 1.0`), `1 != true`, arrays element-wise,
//! objects key-wise regardless of member order.

use serde_json::Value;

use crate::number::Number;
use crate::pointer::JsonPointer;

/// The six JSON types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn name(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

/// A JSON value within a [`JsonNode`] tree.
#[derive(Debug, Clone)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number { value: Number, literal: String },
    String(String),
    Array(Vec<JsonNode>),
    Object(Vec<(String, JsonNode)>),
}

/// A node of a JSON document, carrying its path from the document root.
#[derive(Debug, Clone)]
pub struct JsonNode {
    pub value: JsonValue,
    pub path: JsonPointer,
}

impl JsonNode {
    /// Build a node tree from a raw `serde_json` value.
    pub fn from_value(value: &Value) -> Self {
        Self::build(value, JsonPointer::root())
    }

    /// Parse a node tree from JSON text.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    fn build(value: &Value, path: JsonPointer) -> Self {
        let value = match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number {
                value: Number::from_serde(n),
                literal: n.to_string(),
            },
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Self::build(item, path.child(i.to_string())))
                    .collect(),
            ),
            Value::Object(members) => JsonValue::Object(
                members
                    .iter()
                    .map(|(key, member)| {
                        (key.clone(), Self::build(member, path.child(key.as_str())))
                    })
                    .collect(),
            ),
        };
        Self { value, path }
    }

    /// A detached string node rooted at the given path (used for evaluating
    /// object property names as instances).
    pub(crate) fn detached_string(value: &str, path: JsonPointer) -> Self {
        Self {
            value: JsonValue::String(value.to_string()),
            path,
        }
    }

    pub fn json_type(&self) -> JsonType {
        match &self.value {
            JsonValue::Null => JsonType::Null,
            JsonValue::Bool(_) => JsonType::Boolean,
            JsonValue::Number { .. } => JsonType::Number,
            JsonValue::String(_) => JsonType::String,
            JsonValue::Array(_) => JsonType::Array,
            JsonValue::Object(_) => JsonType::Object,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.json_type().name()
    }

    /// The node's key within its parent (the last path token).
    pub fn key(&self) -> Option<&str> {
        self.path.last()
    }

    /// Whether the node is a mathematically integral number.
    pub fn is_integer(&self) -> bool {
        matches!(&self.value, JsonValue::Number { value, .. } if value.is_integer())
    }

    pub fn as_number(&self) -> Option<&Number> {
        match &self.value {
            JsonValue::Number { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonNode]> {
        match &self.value {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, JsonNode)]> {
        match &self.value {
            JsonValue::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Object member lookup by key.
    pub fn get(&self, key: &str) -> Option<&JsonNode> {
        self.as_object()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Reconstruct a raw `serde_json` value from this node.
    pub fn to_json(&self) -> Value {
        match &self.value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number { literal, .. } => serde_json::from_str::<serde_json::Number>(literal)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(JsonNode::to_json).collect()),
            JsonValue::Object(members) => Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for JsonNode {
    /// JSON equality, ignoring paths.
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (JsonValue::Null, JsonValue::Null) => true,
            (JsonValue::Bool(a), JsonValue::Bool(b)) => a == b,
            (JsonValue::Number { value: a, .. }, JsonValue::Number { value: b, .. }) => a == b,
            (JsonValue::String(a), JsonValue::String(b)) => a == b,
            (JsonValue::Array(a), JsonValue::Array(b)) => a == b,
            (JsonValue::Object(a), JsonValue::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            _ => false,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_and_keys() {
        let node = JsonNode::from_value(&json!({"a": [10, {"b": null}]}));
        let inner = node.get("a").unwrap().as_array().unwrap()[1].get("b").unwrap();
        assert_eq!(inner.path.to_string(), "/a/1/b");
        assert_eq!(inner.key(), Some("b"));
        assert_eq!(inner.json_type(), JsonType::Null);
    }

    #[test]
    fn test_path_evaluates_back_to_node() {
        let root = JsonNode::from_value(&json!({"x": {"y": [1, 2, 3]}}));
        let target = root.get("x").unwrap().get("y").unwrap().as_array().unwrap()[2].clone();
        let found = target.path.evaluate(&root).unwrap();
        assert_eq!(found, &target);
    }

    #[test]
    fn test_number_equality_is_mathematical() {
        let a = JsonNode::from_text("1").unwrap();
        let b = JsonNode::from_text("1.0").unwrap();
        let t = JsonNode::from_text("true").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, t);
    }

    #[test]
    fn test_object_equality_ignores_member_order() {
        let a = JsonNode::from_value(&json!({"x": 1, "y": 2}));
        let b = JsonNode::from_value(&json!({"y": 2, "x": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_array_equality_is_elementwise() {
        let a = JsonNode::from_value(&json!([1, true]));
        let b = JsonNode::from_value(&json!([1.0, true]));
        let c = JsonNode::from_value(&json!([true, 1]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_decimal_fidelity_through_text() {
        let node = JsonNode::from_text("5.1").unwrap();
        let expected = Number::from_literal("5.1").unwrap();
        assert_eq!(node.as_number().unwrap(), &expected);
        assert!(node.as_number().unwrap().is_multiple_of(&Number::from_literal("0.1").unwrap()));
    }

    #[test]
    fn test_integer_classification() {
        assert!(JsonNode::from_text("12").unwrap().is_integer());
        assert!(JsonNode::from_text("12.0").unwrap().is_integer());
        assert!(!JsonNode::from_text("12.5").unwrap().is_integer());
        assert!(!JsonNode::from_text("\"12\"").unwrap().is_integer());
    }

    #[test]
    fn test_to_json_roundtrip() {
        let raw = json!({"a": [1, 2.5], "b": "x", "c": null, "d": false});
        assert_eq!(JsonNode::from_value(&raw).to_json(), raw);
    }
}
