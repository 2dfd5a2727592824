//! RFC 6901 JSON Pointer and draft Relative JSON Pointer.
//!
//! A [`JsonPointer`] is an immutable sequence of *unescaped* reference
//! tokens (array indices are strings). Escaping (`~0`/`~1`) only exists in
//! the RFC 6901 string form; the URI-fragment form percent-encodes on top
//! of that.

use std::fmt;
use std::ops::Range;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

use crate::error::PointerError;
use crate::json::{JsonNode, JsonValue};

/// Characters percent-encoded in the URI-fragment form of a pointer.
const FRAGMENT_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'%')
    .add(b'^')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'[')
    .add(b']');

/// Escape a single reference token for the RFC 6901 string form.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single RFC 6901 reference token.
///
/// Assumes the token has already been validated (every `~` is followed by
/// `0` or `1`).
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn validate_escapes(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'~' {
            match bytes.get(i + 1) {
                Some(b'0') | Some(b'1') => i += 2,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// An RFC 6901 JSON Pointer: an ordered sequence of unescaped tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// The empty pointer, referencing a whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an RFC 6901 pointer string.
    pub fn parse(value: &str) -> Result<Self, PointerError> {
        if value.is_empty() {
            return Ok(Self::root());
        }
        if !value.starts_with('/') {
            return Err(PointerError::Malformed {
                value: value.to_string(),
            });
        }
        let mut tokens = Vec::new();
        for raw in value.split('/').skip(1) {
            if !validate_escapes(raw) {
                return Err(PointerError::Malformed {
                    value: value.to_string(),
                });
            }
            tokens.push(unescape_token(raw));
        }
        Ok(Self { tokens })
    }

    /// Build a pointer from unescaped tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the URI-fragment form: percent-decode, then RFC 6901.
    pub fn parse_uri_fragment(fragment: &str) -> Result<Self, PointerError> {
        let decoded = percent_decode_str(fragment)
            .decode_utf8()
            .map_err(|_| PointerError::Malformed {
                value: fragment.to_string(),
            })?;
        Self::parse(&decoded)
    }

    /// The URI-fragment form of this pointer (without a leading `#`).
    pub fn to_uri_fragment(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            out.push('/');
            let escaped = escape_token(token);
            out.push_str(&utf8_percent_encode(&escaped, FRAGMENT_ESCAPE).to_string());
        }
        out
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// The final token: the referenced value's key within its parent.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// A new pointer extending this one by a single unescaped token.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// Concatenate two pointers.
    pub fn join(&self, other: &JsonPointer) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        Self { tokens }
    }

    /// The pointer to the parent location, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(Self {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    /// Whether `prefix` is a prefix of this pointer.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.tokens.len() >= prefix.tokens.len()
            && self.tokens[..prefix.tokens.len()] == prefix.tokens[..]
    }

    /// A sub-pointer over the given token range.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            tokens: self.tokens[range].to_vec(),
        }
    }

    /// Evaluate this pointer against an instance tree.
    pub fn evaluate<'a>(&self, root: &'a JsonNode) -> Result<&'a JsonNode, PointerError> {
        let mut node = root;
        for token in &self.tokens {
            node = match &node.value {
                JsonValue::Object(members) => members
                    .iter()
                    .find(|(k, _)| k == token)
                    .map(|(_, v)| v)
                    .ok_or_else(|| self.reference_error(format!("no member '{token}'")))?,
                JsonValue::Array(items) => {
                    let index = parse_array_index(token)
                        .ok_or_else(|| self.reference_error(format!("bad index '{token}'")))?;
                    items
                        .get(index)
                        .ok_or_else(|| self.reference_error(format!("index {index} out of bounds")))?
                }
                _ => return Err(self.reference_error(format!("cannot index into a leaf with '{token}'"))),
            };
        }
        Ok(node)
    }

    /// Evaluate this pointer against a raw `serde_json` value.
    pub fn evaluate_value<'a>(&self, root: &'a Value) -> Result<&'a Value, PointerError> {
        let mut node = root;
        for token in &self.tokens {
            node = match node {
                Value::Object(map) => map
                    .get(token)
                    .ok_or_else(|| self.reference_error(format!("no member '{token}'")))?,
                Value::Array(items) => {
                    let index = parse_array_index(token)
                        .ok_or_else(|| self.reference_error(format!("bad index '{token}'")))?;
                    items
                        .get(index)
                        .ok_or_else(|| self.reference_error(format!("index {index} out of bounds")))?
                }
                _ => return Err(self.reference_error(format!("cannot index into a leaf with '{token}'"))),
            };
        }
        Ok(node)
    }

    fn reference_error(&self, reason: String) -> PointerError {
        PointerError::Reference {
            pointer: self.to_string(),
            reason,
        }
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape_token(token))?;
        }
        Ok(())
    }
}

/// Parse an RFC 6901 array-index token (no leading zeros, no `-`).
pub(crate) fn parse_array_index(token: &str) -> Option<usize> {
    if token == "0" {
        return Some(0);
    }
    if token.is_empty() || token.starts_with('0') || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

// ---------------------------------------------------------------------------
// Relative JSON Pointer
// ---------------------------------------------------------------------------

/// What a relative pointer's `#` form or pointer form landed on.
#[derive(Debug, PartialEq)]
pub enum RelativeLocation<'a> {
    /// The referenced node (pointer form).
    Node(&'a JsonNode),
    /// The referenced value's object key (`#` form on an object member).
    Name(String),
    /// The referenced value's array index (`#` form on an array element).
    Index(usize),
}

/// A draft Relative JSON Pointer: `N(+/-M)?(#|<pointer>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeJsonPointer {
    up: usize,
    over: i64,
    path: Option<JsonPointer>,
}

impl RelativeJsonPointer {
    pub fn parse(value: &str) -> Result<Self, PointerError> {
        let malformed = || PointerError::MalformedRelative {
            value: value.to_string(),
        };

        let digits_end = value.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits_end == 0 {
            return Err(malformed());
        }
        let up_str = &value[..digits_end];
        if up_str.len() > 1 && up_str.starts_with('0') {
            return Err(malformed());
        }
        let up = up_str.parse().map_err(|_| malformed())?;

        let mut rest = &value[digits_end..];
        let mut over = 0i64;
        if rest.starts_with('+') || rest.starts_with('-') {
            let sign = if rest.starts_with('-') { -1 } else { 1 };
            let digits = rest[1..].bytes().take_while(|b| b.is_ascii_digit()).count();
            let num = &rest[1..1 + digits];
            if num.is_empty() || num.starts_with('0') {
                return Err(malformed());
            }
            over = sign * num.parse::<i64>().map_err(|_| malformed())?;
            rest = &rest[1 + digits..];
        }

        let path = if rest == "#" {
            None
        } else {
            Some(JsonPointer::parse(rest).map_err(|_| malformed())?)
        };
        Ok(Self { up, over, path })
    }

    /// Evaluate from the location `from` within the document rooted at `root`.
    pub fn evaluate<'a>(
        &self,
        root: &'a JsonNode,
        from: &JsonPointer,
    ) -> Result<RelativeLocation<'a>, PointerError> {
        let reference = |reason: String| PointerError::Reference {
            pointer: self.to_string(),
            reason,
        };

        let mut location = from.clone();
        for _ in 0..self.up {
            location = location
                .parent()
                .ok_or_else(|| reference("cannot ascend past the document root".into()))?;
        }

        if self.over != 0 {
            let last = location
                .last()
                .ok_or_else(|| reference("index adjustment at the document root".into()))?;
            let index = parse_array_index(last)
                .ok_or_else(|| reference(format!("'{last}' is not an array index")))?;
            let adjusted = index as i64 + self.over;
            if adjusted < 0 {
                return Err(reference("adjusted index is negative".into()));
            }
            location = location
                .parent()
                .expect("non-root location has a parent")
                .child(adjusted.to_string());
        }

        match &self.path {
            Some(path) => {
                let node = location.join(path).evaluate(root)?;
                Ok(RelativeLocation::Node(node))
            }
            None => {
                // `#`: the key or index of the referenced value in its parent.
                let last = location
                    .last()
                    .ok_or_else(|| reference("'#' at the document root".into()))?;
                let parent = location.parent().expect("non-root location has a parent");
                match &parent.evaluate(root)?.value {
                    JsonValue::Array(_) => {
                        let index = parse_array_index(last)
                            .ok_or_else(|| reference(format!("'{last}' is not an array index")))?;
                        Ok(RelativeLocation::Index(index))
                    }
                    _ => Ok(RelativeLocation::Name(last.to_string())),
                }
            }
        }
    }
}

impl fmt::Display for RelativeJsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.up)?;
        if self.over != 0 {
            write!(f, "{:+}", self.over)?;
        }
        match &self.path {
            Some(path) => write!(f, "{path}"),
            None => write!(f, "#"),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
