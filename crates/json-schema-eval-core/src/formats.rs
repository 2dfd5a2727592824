//! Format-validator registry types and the bundled validators.
//!
//! A validator receives the instance node and returns an error message on
//! failure. Registration alone never asserts: a format participates in
//! validation only after [`crate::catalog::Catalog::enable_formats`] names
//! it, and validators are bound into schemas at compile time.

use std::sync::Arc;

use crate::json::{JsonNode, JsonType};
use crate::pointer::{JsonPointer, RelativeJsonPointer};
use crate::uri::Uri;

/// Validation callable for one format attribute.
pub type FormatValidator = Arc<dyn Fn(&JsonNode) -> Result<(), String> + Send + Sync>;

/// A registered validator plus the instance types it applies to; other
/// types pass without assertion.
#[derive(Clone)]
pub struct FormatRegistration {
    pub(crate) validator: FormatValidator,
    pub(crate) instance_types: Vec<JsonType>,
}

fn string_format(
    check: impl Fn(&str) -> Result<(), String> + Send + Sync + 'static,
) -> FormatRegistration {
    FormatRegistration {
        validator: Arc::new(move |instance: &JsonNode| match instance.as_str() {
            Some(text) => check(text),
            None => Ok(()),
        }),
        instance_types: vec![JsonType::String],
    }
}

/// The validators shipped with the engine, all opt-in.
pub(crate) fn builtin_registrations() -> Vec<(&'static str, FormatRegistration)> {
    vec![
        (
            "ipv4",
            string_format(|text| {
                text.parse::<std::net::Ipv4Addr>()
                    .map(|_| ())
                    .map_err(|_| format!("'{text}' is not a dotted-quad IPv4 address"))
            }),
        ),
        (
            "ipv6",
            string_format(|text| {
                text.parse::<std::net::Ipv6Addr>()
                    .map(|_| ())
                    .map_err(|_| format!("'{text}' is not an IPv6 address"))
            }),
        ),
        (
            "uuid",
            string_format(|text| {
                uuid::Uuid::parse_str(text)
                    .map(|_| ())
                    .map_err(|_| format!("'{text}' is not a UUID"))
            }),
        ),
        (
            "regex",
            string_format(|text| {
                regex::Regex::new(text)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }),
        ),
        (
            "json-pointer",
            string_format(|text| {
                JsonPointer::parse(text)
                    .map(|_| ())
                    .map_err(|_| format!("'{text}' is not a JSON pointer"))
            }),
        ),
        (
            "relative-json-pointer",
            string_format(|text| {
                RelativeJsonPointer::parse(text)
                    .map(|_| ())
                    .map_err(|_| format!("'{text}' is not a relative JSON pointer"))
            }),
        ),
        (
            "uri",
            string_format(|text| {
                Uri::parse(text)
                    .map(|_| ())
                    .map_err(|_| format!("'{text}' is not an absolute URI"))
            }),
        ),
        (
            "uri-reference",
            string_format(|text| {
                match Uri::parse(text) {
                    Ok(_) => Ok(()),
                    // Relative references are fine; only syntax errors fail.
                    Err(crate::error::UriError::NotAbsolute { .. }) => Ok(()),
                    Err(_) => Err(format!("'{text}' is not a URI reference")),
                }
            }),
        ),
    ]
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonNode;
    use serde_json::json;

    fn check(name: &str, value: serde_json::Value) -> Result<(), String> {
        let registration = builtin_registrations()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| r)
            .unwrap();
        (registration.validator)(&JsonNode::from_value(&value))
    }

    #[test]
    fn test_ipv4() {
        assert!(check("ipv4", json!("127.0.0.1")).is_ok());
        assert!(check("ipv4", json!("not-an-ip")).is_err());
        assert!(check("ipv4", json!("256.0.0.1")).is_err());
        // Non-string instances pass without assertion.
        assert!(check("ipv4", json!(42)).is_ok());
    }

    #[test]
    fn test_uuid() {
        assert!(check("uuid", json!("123e4567-e89b-12d3-a456-426614174000")).is_ok());
        assert!(check("uuid", json!("123e4567")).is_err());
    }

    #[test]
    fn test_json_pointer() {
        assert!(check("json-pointer", json!("/a/b")).is_ok());
        assert!(check("json-pointer", json!("a/b")).is_err());
    }

    #[test]
    fn test_uri_reference() {
        assert!(check("uri-reference", json!("https://example.com/x")).is_ok());
        assert!(check("uri-reference", json!("relative/path#frag")).is_ok());
    }
}
